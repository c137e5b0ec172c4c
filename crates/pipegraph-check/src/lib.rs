//! Structural validation for pipeline components.
//!
//! [`validate_component`] walks every graph level of a component and reports
//! ALL problems at once; it never stops at the first finding. The checks are
//! pure: they read the component and return [`Diagnostic`]s.
//!
//! Components that are not resolved inline (URL, digest or text references)
//! cannot be inspected, so argument and output checks against them are
//! skipped.

pub mod dataflow;
pub mod diagnostics;

pub use dataflow::{execution_order, find_cycles};
pub use diagnostics::Diagnostic;

use pipegraph_core::{ArgumentType, ComponentSpec, GraphSpec};

/// Location of the top-level graph.
pub const ROOT: &str = "root";

/// Runs every check over `spec`, recursing into subgraphs.
pub fn validate_component(spec: &ComponentSpec) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_placeholders(spec, ROOT, &mut diagnostics);
    if let Some(graph) = spec.graph_spec() {
        check_level(spec, graph, ROOT, &mut diagnostics);
    }
    diagnostics
}

/// `Ok(())` when [`validate_component`] finds nothing.
pub fn check_component(spec: &ComponentSpec) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate_component(spec);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn check_placeholders(component: &ComponentSpec, location: &str, out: &mut Vec<Diagnostic>) {
    for placeholder in component.unknown_placeholders() {
        out.push(Diagnostic::UnknownPlaceholder {
            location: location.to_string(),
            component: component.display_name().to_string(),
            placeholder: placeholder.to_string(),
        });
    }
}

/// Checks one graph level. `owner` is the component whose implementation
/// `graph` is; its inputs and outputs are the level's boundary.
fn check_level(owner: &ComponentSpec, graph: &GraphSpec, prefix: &str, out: &mut Vec<Diagnostic>) {
    for (task_id, task) in &graph.tasks {
        let location = format!("{}.{}", prefix, task_id);

        if let Some(component) = task.resolved_spec() {
            check_placeholders(component, &location, out);
            for input in task.arguments.keys() {
                if !component.has_input(input) {
                    out.push(Diagnostic::UndeclaredArgument {
                        location: location.clone(),
                        input: input.clone(),
                    });
                }
            }
            for input in &component.inputs {
                let required = !input.optional && input.default.is_none();
                if required && !task.arguments.contains_key(&input.name) {
                    out.push(Diagnostic::MissingArgument {
                        location: location.clone(),
                        input: input.name.clone(),
                    });
                }
            }
        }

        for (input, argument) in &task.arguments {
            match argument {
                ArgumentType::Literal(_) => {}
                ArgumentType::GraphInput(arg) => {
                    let name = &arg.graph_input.input_name;
                    if !owner.has_input(name) {
                        out.push(Diagnostic::UnknownGraphInput {
                            location: location.clone(),
                            input: input.clone(),
                            graph_input: name.clone(),
                        });
                    }
                }
                ArgumentType::TaskOutput(arg) => {
                    let upstream_id = &arg.task_output.task_id;
                    let output = &arg.task_output.output_name;
                    match graph.task(upstream_id) {
                        None => out.push(Diagnostic::UnknownUpstreamTask {
                            location: location.clone(),
                            input: input.clone(),
                            task_id: upstream_id.clone(),
                        }),
                        Some(upstream) => {
                            let declared = upstream
                                .resolved_spec()
                                .map_or(true, |spec| spec.has_output(output));
                            if !declared {
                                out.push(Diagnostic::UndeclaredUpstreamOutput {
                                    location: location.clone(),
                                    task_id: upstream_id.clone(),
                                    output: output.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }

        if let (Some(component), Some(nested)) = (task.resolved_spec(), task.subgraph()) {
            check_level(component, nested, &location, out);
        }
    }

    for (name, value) in &graph.output_values {
        if !owner.has_output(name) {
            out.push(Diagnostic::UndeclaredGraphOutput {
                location: prefix.to_string(),
                output: name.clone(),
            });
        }
        let upstream_id = &value.task_output.task_id;
        match graph.task(upstream_id) {
            None => out.push(Diagnostic::UnknownOutputTask {
                location: prefix.to_string(),
                output: name.clone(),
                task_id: upstream_id.clone(),
            }),
            Some(upstream) => {
                let output = &value.task_output.output_name;
                if upstream
                    .resolved_spec()
                    .is_some_and(|spec| !spec.has_output(output))
                {
                    out.push(Diagnostic::UndeclaredUpstreamOutput {
                        location: prefix.to_string(),
                        task_id: upstream_id.clone(),
                        output: output.clone(),
                    });
                }
            }
        }
    }

    for tasks in find_cycles(graph) {
        out.push(Diagnostic::Cycle {
            location: prefix.to_string(),
            tasks,
        });
    }
}
