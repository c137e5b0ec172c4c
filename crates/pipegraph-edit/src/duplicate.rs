//! Duplication of selected canvas nodes.
//!
//! Copies task and graph-input nodes under fresh collision-free names, shifts
//! them on the canvas, and rewires the copies' arguments according to a
//! [`LinkPolicy`]. Graph-output nodes cannot be duplicated; they are skipped
//! and reported in [`Duplication::skipped`].

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use pipegraph_core::{
    ArgumentType, ComponentSpec, EntityKind, GraphInputArgument, InputSpec, NodeDescriptor,
    Position, Positioned, TaskOutputArgument, TaskSpec, VisualId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EditorConfig;
use crate::error::EditError;
use crate::identity::IdentityManager;
use crate::naming::unique_name;

/// Which argument references survive on the duplicates.
///
/// An *internal* reference points at a node that is duplicated in the same
/// operation; an *external* one points at a node that stays behind.
///
/// | policy   | internal ref         | external ref          |
/// |----------|----------------------|-----------------------|
/// | none     | drop                 | drop                  |
/// | internal | rewrite to duplicate | drop                  |
/// | external | drop                 | keep pointing at orig |
/// | all      | rewrite to duplicate | keep pointing at orig |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPolicy {
    None,
    Internal,
    External,
    #[default]
    All,
}

impl LinkPolicy {
    fn keeps_internal(self) -> bool {
        matches!(self, LinkPolicy::Internal | LinkPolicy::All)
    }

    fn keeps_external(self) -> bool {
        matches!(self, LinkPolicy::External | LinkPolicy::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkPolicy::None => "none",
            LinkPolicy::Internal => "internal",
            LinkPolicy::External => "external",
            LinkPolicy::All => "all",
        }
    }
}

impl fmt::Display for LinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown link policy '{0}' (expected none, internal, external or all)")]
pub struct UnknownLinkPolicy(pub String);

impl FromStr for LinkPolicy {
    type Err = UnknownLinkPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(LinkPolicy::None),
            "internal" => Ok(LinkPolicy::Internal),
            "external" => Ok(LinkPolicy::External),
            "all" => Ok(LinkPolicy::All),
            other => Err(UnknownLinkPolicy(other.to_string())),
        }
    }
}

/// Options of a duplication gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateOptions {
    /// Select the duplicates (and deselect the originals).
    pub selected: bool,
    /// Drop point for the bounding-box center of the duplicated set. When
    /// absent, every copy is offset by [`EditorConfig::duplicate_offset`].
    pub position: Option<Position>,
    pub connection: LinkPolicy,
    /// Copy the run status badge onto the duplicates.
    pub preserve_status: bool,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        DuplicateOptions {
            selected: true,
            position: None,
            connection: LinkPolicy::All,
            preserve_status: false,
        }
    }
}

/// Old structural id -> new structural id, per id space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdMap {
    pub tasks: IndexMap<String, String>,
    pub inputs: IndexMap<String, String>,
}

impl IdMap {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.inputs.is_empty()
    }
}

/// Result of [`duplicate_nodes`].
#[derive(Debug, Clone, PartialEq)]
pub struct Duplication {
    pub spec: ComponentSpec,
    pub id_map: IdMap,
    /// Descriptors of the copies, in selection order.
    pub new_nodes: Vec<NodeDescriptor>,
    /// The descriptors passed in, deselected when the copies are selected.
    pub original_nodes: Vec<NodeDescriptor>,
    /// Nodes that could not be duplicated (graph outputs, stale ids).
    pub skipped: Vec<VisualId>,
}

/// A node accepted for duplication.
struct Pick<'a> {
    node: &'a NodeDescriptor,
    structural_id: String,
    kind: EntityKind,
}

/// Duplicates `nodes` within `spec`'s graph.
///
/// Fails only when `spec` is not graph-implemented. Nodes that cannot be
/// duplicated are skipped with a warning.
pub fn duplicate_nodes(
    ids: &mut IdentityManager,
    spec: &ComponentSpec,
    nodes: &[NodeDescriptor],
    options: &DuplicateOptions,
    config: &EditorConfig,
) -> Result<Duplication, EditError> {
    let graph = spec.require_graph()?;

    // Resolve the selection.
    let mut picks = Vec::new();
    let mut skipped = Vec::new();
    for node in nodes {
        let resolved = ids.resolve(&node.id).and_then(|r| r.as_entity());
        match resolved {
            Some((id, EntityKind::Task)) if graph.contains_task(id) => picks.push(Pick {
                node,
                structural_id: id.to_string(),
                kind: EntityKind::Task,
            }),
            Some((id, EntityKind::Input)) if spec.has_input(id) => picks.push(Pick {
                node,
                structural_id: id.to_string(),
                kind: EntityKind::Input,
            }),
            Some((_, EntityKind::Output)) => {
                tracing::warn!(node = %node.id, "graph outputs cannot be duplicated");
                skipped.push(node.id.clone());
            }
            _ => {
                tracing::warn!(node = %node.id, "skipping unresolved node");
                skipped.push(node.id.clone());
            }
        }
    }

    // Allocate names.
    let mut id_map = IdMap::default();
    for pick in &picks {
        match pick.kind {
            EntityKind::Task => {
                if id_map.tasks.contains_key(&pick.structural_id) {
                    continue;
                }
                let taken = |name: &str| {
                    graph.contains_task(name) || id_map.tasks.values().any(|n| n == name)
                };
                let name = unique_name(&pick.structural_id, taken);
                id_map.tasks.insert(pick.structural_id.clone(), name);
            }
            _ => {
                if id_map.inputs.contains_key(&pick.structural_id) {
                    continue;
                }
                let taken =
                    |name: &str| spec.has_input(name) || id_map.inputs.values().any(|n| n == name);
                let name = unique_name(&pick.structural_id, taken);
                id_map.inputs.insert(pick.structural_id.clone(), name);
            }
        }
    }

    let delta = match options.position {
        Some(target) => Position::bounding_center(picks.iter().map(|p| p.node.position))
            .map(|center| target - center)
            .unwrap_or_default(),
        None => config.duplicate_offset,
    };

    // Build the copies.
    let mut next_graph = graph.clone();
    let mut next_inputs = spec.inputs.clone();
    let mut new_nodes = Vec::new();
    let mut seen: Vec<(EntityKind, &str)> = Vec::new();
    for pick in &picks {
        if seen.contains(&(pick.kind, pick.structural_id.as_str())) {
            continue;
        }
        seen.push((pick.kind, pick.structural_id.as_str()));

        let position = pick.node.position + delta;
        let new_id = match pick.kind {
            EntityKind::Task => {
                let new_id = id_map.tasks[&pick.structural_id].clone();
                let original = &graph.tasks[&pick.structural_id];
                let mut copy = relink(original, spec, &id_map, options.connection);
                copy.set_position(position);
                next_graph.tasks.insert(new_id.clone(), copy);
                new_id
            }
            _ => {
                let new_id = id_map.inputs[&pick.structural_id].clone();
                let mut copy = match spec.input(&pick.structural_id) {
                    Some(input) => input.clone(),
                    None => InputSpec::new(&pick.structural_id),
                };
                copy.name = new_id.clone();
                copy.set_position(position);
                next_inputs.push(copy);
                new_id
            }
        };

        let visual_id = ids.get_id(&new_id, pick.kind);
        let mut descriptor = NodeDescriptor::new(visual_id, pick.kind, position);
        descriptor.selected = options.selected;
        if options.preserve_status {
            descriptor.status = pick.node.status.clone();
        }
        new_nodes.push(descriptor);
    }

    let original_nodes = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if options.selected {
                node.selected = false;
            }
            node
        })
        .collect();

    let mut next_spec = spec.with_graph(next_graph);
    next_spec.inputs = next_inputs;

    tracing::debug!(
        tasks = id_map.tasks.len(),
        inputs = id_map.inputs.len(),
        skipped = skipped.len(),
        policy = %options.connection,
        "duplicated nodes"
    );

    Ok(Duplication {
        spec: next_spec,
        id_map,
        new_nodes,
        original_nodes,
        skipped,
    })
}

/// Copy of `task` with its arguments filtered and rewritten per `policy`.
fn relink(task: &TaskSpec, spec: &ComponentSpec, id_map: &IdMap, policy: LinkPolicy) -> TaskSpec {
    let graph = spec.graph_spec();
    let mut copy = task.clone();
    copy.arguments = task
        .arguments
        .iter()
        .filter_map(|(input, argument)| {
            let kept = match argument {
                ArgumentType::Literal(_) => Some(argument.clone()),
                ArgumentType::GraphInput(arg) => {
                    let name = &arg.graph_input.input_name;
                    match id_map.inputs.get(name) {
                        Some(new_name) if policy.keeps_internal() => {
                            let mut moved: GraphInputArgument = arg.clone();
                            moved.graph_input.input_name = new_name.clone();
                            Some(ArgumentType::GraphInput(moved))
                        }
                        Some(_) => None,
                        None if spec.has_input(name) && policy.keeps_external() => {
                            Some(argument.clone())
                        }
                        None => None,
                    }
                }
                ArgumentType::TaskOutput(arg) => {
                    let task_id = &arg.task_output.task_id;
                    match id_map.tasks.get(task_id) {
                        Some(new_id) if policy.keeps_internal() => Some(ArgumentType::TaskOutput(
                            TaskOutputArgument::retarget(arg, new_id),
                        )),
                        Some(_) => None,
                        None if graph.is_some_and(|g| g.contains_task(task_id))
                            && policy.keeps_external() =>
                        {
                            Some(argument.clone())
                        }
                        None => None,
                    }
                }
            };
            kept.map(|argument| (input.clone(), argument))
        })
        .collect();
    copy
}
