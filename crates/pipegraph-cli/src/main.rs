//! Pipeline graph editing CLI.
//!
//! Provides the `pipegraph` binary, a scriptable front end over the same
//! engines the canvas uses. Endpoints are named structurally: `task.handle`
//! for task handles, or a bare graph input/output name.
//!
//! Exit codes: 0 = success, 1 = edit rejected or bad arguments,
//! 2 = validation failed, 3 = I/O or parse error.
//!
//! Logging goes to stderr and is filtered by `PIPEGRAPH_LOG` (default
//! `warn`).

mod files;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pipegraph_core::{
    ComponentReference, ComponentSpec, EntityKind, HandleKind, NodeDescriptor, Position,
    Positioned, VisualId,
};
use pipegraph_edit::{
    connect, disconnect, duplicate_nodes, flatten, replace_task_as, ConnectionRequest,
    DuplicateOptions, EditError, EditorConfig, IdentityManager, LinkPolicy,
};

use files::{emit, load_component, FileError, Format};

const LOG_ENV: &str = "PIPEGRAPH_LOG";

/// Pipeline graph editing tools.
#[derive(Parser)]
#[command(name = "pipegraph", about = "Pipeline graph editing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the flattened task hierarchy as JSON.
    Flatten {
        /// Component file (.yaml, .yml or .json).
        file: PathBuf,
    },

    /// Check references, required inputs and data-flow cycles.
    Validate {
        file: PathBuf,

        /// Print diagnostics as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Connect an input or task output to a task input or graph output.
    Connect {
        file: PathBuf,

        /// Source: `task.output` or a graph input name.
        #[arg(long)]
        from: String,

        /// Target: `task.input` or a graph output name.
        #[arg(long)]
        to: String,

        /// Write the result here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove the edge ending at a task input or graph output.
    Disconnect {
        file: PathBuf,

        /// Target: `task.input` or a graph output name.
        #[arg(long)]
        to: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Duplicate tasks and graph inputs.
    Duplicate {
        file: PathBuf,

        /// Task to duplicate (repeatable).
        #[arg(long = "task")]
        tasks: Vec<String>,

        /// Graph input to duplicate (repeatable).
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Which argument references the copies keep.
        #[arg(long, default_value_t = LinkPolicy::All)]
        connection: LinkPolicy,

        /// Drop point `x,y` for the center of the duplicated set.
        #[arg(long)]
        at: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Swap the component a task instantiates.
    Replace {
        file: PathBuf,

        /// Task to replace.
        #[arg(long)]
        task: String,

        /// Component file with the new implementation.
        #[arg(long = "with")]
        with: PathBuf,

        /// New task id (default: keep the current one).
        #[arg(long = "as")]
        rename: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Failures mapped onto exit codes.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("validation failed with {0} finding(s)")]
    Invalid(usize),
    #[error(transparent)]
    File(#[from] FileError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) | CliError::Edit(_) => 1,
            CliError::Invalid(_) => 2,
            CliError::File(_) => 3,
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let exit_code = match run(cli.command) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            err.exit_code()
        }
    };
    process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Flatten { file } => run_flatten(&file),
        Commands::Validate { file, json } => run_validate(&file, json),
        Commands::Connect {
            file,
            from,
            to,
            output,
        } => run_connect(&file, &from, &to, output.as_deref()),
        Commands::Disconnect { file, to, output } => run_disconnect(&file, &to, output.as_deref()),
        Commands::Duplicate {
            file,
            tasks,
            inputs,
            connection,
            at,
            output,
        } => run_duplicate(&file, &tasks, &inputs, connection, at.as_deref(), output.as_deref()),
        Commands::Replace {
            file,
            task,
            with,
            rename,
            output,
        } => run_replace(&file, &task, &with, rename.as_deref(), output.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_flatten(file: &Path) -> Result<(), CliError> {
    let spec = load_component(file)?;
    let index = flatten(&spec);
    let records: Vec<_> = index.iter().collect();
    emit(&Format::Json.render(&records)?, None)?;
    Ok(())
}

fn run_validate(file: &Path, json: bool) -> Result<(), CliError> {
    let spec = load_component(file)?;
    let diagnostics = pipegraph_check::validate_component(&spec);
    if json {
        emit(&Format::Json.render(&diagnostics)?, None)?;
    }
    if diagnostics.is_empty() {
        return Ok(());
    }
    if !json {
        for diagnostic in &diagnostics {
            eprintln!("  - {}", diagnostic);
        }
    }
    Err(CliError::Invalid(diagnostics.len()))
}

fn run_connect(file: &Path, from: &str, to: &str, output: Option<&Path>) -> Result<(), CliError> {
    let spec = load_component(file)?;
    let graph = spec.require_graph().map_err(EditError::from)?;
    let mut ids = IdentityManager::new();

    let (source, source_handle) = if spec.has_input(from) {
        (ids.get_id(from, EntityKind::Input), None)
    } else {
        let (task, handle) = split_endpoint(from)?;
        (
            ids.get_id(task, EntityKind::Task),
            Some(ids.get_handle_id(task, handle, HandleKind::Output)),
        )
    };
    let (target, target_handle) = target_ids(&mut ids, &spec, to)?;

    let request = ConnectionRequest {
        source,
        source_handle,
        target,
        target_handle,
    };
    let next = connect(&ids, graph, &request)?;
    write_spec(&spec.with_graph(next), file, output)
}

fn run_disconnect(file: &Path, to: &str, output: Option<&Path>) -> Result<(), CliError> {
    let spec = load_component(file)?;
    let graph = spec.require_graph().map_err(EditError::from)?;
    let mut ids = IdentityManager::new();
    let (target, target_handle) = target_ids(&mut ids, &spec, to)?;
    let next = disconnect(&ids, graph, &target, target_handle.as_ref())?;
    write_spec(&spec.with_graph(next), file, output)
}

fn run_duplicate(
    file: &Path,
    tasks: &[String],
    inputs: &[String],
    connection: LinkPolicy,
    at: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    if tasks.is_empty() && inputs.is_empty() {
        return Err(CliError::Usage(
            "nothing to duplicate: pass --task or --input".to_string(),
        ));
    }
    let position = at.map(parse_point).transpose()?;
    let spec = load_component(file)?;
    let graph = spec.require_graph().map_err(EditError::from)?;
    let mut ids = IdentityManager::new();

    let mut nodes = Vec::new();
    for task_id in tasks {
        let position = graph
            .task(task_id)
            .and_then(|task| task.position())
            .unwrap_or_default();
        nodes.push(NodeDescriptor::new(
            ids.get_id(task_id, EntityKind::Task),
            EntityKind::Task,
            position,
        ));
    }
    for name in inputs {
        let position = spec
            .input(name)
            .and_then(|input| input.position())
            .unwrap_or_default();
        nodes.push(NodeDescriptor::new(
            ids.get_id(name, EntityKind::Input),
            EntityKind::Input,
            position,
        ));
    }

    let options = DuplicateOptions {
        position,
        connection,
        ..Default::default()
    };
    let config = EditorConfig::from_env();
    let duplication = duplicate_nodes(&mut ids, &spec, &nodes, &options, &config)?;
    for skipped in &duplication.skipped {
        eprintln!("skipped: {}", describe(&ids, skipped));
    }
    for (old, new) in duplication.id_map.tasks.iter().chain(&duplication.id_map.inputs) {
        eprintln!("{} -> {}", old, new);
    }
    write_spec(&duplication.spec, file, output)
}

fn run_replace(
    file: &Path,
    task: &str,
    with: &Path,
    rename: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let spec = load_component(file)?;
    let replacement_spec: ComponentSpec = load_component(with)?;
    let graph = spec.require_graph().map_err(EditError::from)?;

    let replacement = replace_task_as(
        graph,
        task,
        ComponentReference::from_spec(replacement_spec),
        rename.unwrap_or(task),
    )?;
    if !replacement.lost_inputs.is_empty() {
        eprintln!("lost inputs: {}", replacement.lost_inputs.join(", "));
    }
    if !replacement.lost_outputs.is_empty() {
        eprintln!("lost outputs: {}", replacement.lost_outputs.join(", "));
    }
    write_spec(&spec.with_graph(replacement.graph), file, output)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Splits `task.handle` at the last dot.
fn split_endpoint(endpoint: &str) -> Result<(&str, &str), CliError> {
    match endpoint.rsplit_once('.') {
        Some((task, handle)) if !task.is_empty() && !handle.is_empty() => Ok((task, handle)),
        _ => Err(CliError::Usage(format!(
            "invalid endpoint '{}', expected task.handle or a graph input/output name",
            endpoint
        ))),
    }
}

/// Visual ids for a connection target: a graph output name or `task.input`.
fn target_ids(
    ids: &mut IdentityManager,
    spec: &ComponentSpec,
    to: &str,
) -> Result<(VisualId, Option<VisualId>), CliError> {
    if spec.has_output(to) {
        return Ok((ids.get_id(to, EntityKind::Output), None));
    }
    let (task, handle) = split_endpoint(to)?;
    Ok((
        ids.get_id(task, EntityKind::Task),
        Some(ids.get_handle_id(task, handle, HandleKind::Input)),
    ))
}

/// Parses `x,y`.
fn parse_point(raw: &str) -> Result<Position, CliError> {
    let invalid = || CliError::Usage(format!("invalid point '{}', expected x,y", raw));
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok(Position::new(x, y))
}

fn describe(ids: &IdentityManager, id: &VisualId) -> String {
    match ids.resolve(id).and_then(|r| r.as_entity()) {
        Some((name, kind)) => format!("{} '{}'", kind, name),
        None => id.to_string(),
    }
}

fn write_spec(spec: &ComponentSpec, input: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let format = Format::of(output.unwrap_or(input));
    emit(&format.render(spec)?, output)?;
    Ok(())
}
