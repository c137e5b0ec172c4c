//! Component replacement.
//!
//! Swaps the component a task instantiates while keeping as much wiring as
//! the new component allows. The result lists exactly what will be lost so
//! the caller can ask for confirmation before committing.

use std::cell::Cell;

use indexmap::{IndexMap, IndexSet};
use pipegraph_core::{ArgumentType, ComponentReference, GraphSpec, TaskSpec};

use crate::error::EditError;
use crate::naming::unique_name;
use crate::rename::rewrite_predicate;

/// Result of [`replace_task`].
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub graph: GraphSpec,
    /// Inputs the old task had (declared or bound) that the new component
    /// lacks. Their arguments were dropped.
    pub lost_inputs: Vec<String>,
    /// Outputs the old task had (declared or consumed) that the new component
    /// lacks. References to them were dropped.
    pub lost_outputs: Vec<String>,
    pub new_task_id: String,
    pub task: TaskSpec,
}

/// Result of [`upgrade_tasks`].
#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    pub graph: GraphSpec,
    /// Ids of the tasks that now instantiate the new component.
    pub replaced: Vec<String>,
    /// Task id -> inputs lost by that task, for tasks that lost any.
    pub lost_inputs: IndexMap<String, Vec<String>>,
}

/// Replaces the component of `task_id`, keeping its id.
pub fn replace_task(
    graph: &GraphSpec,
    task_id: &str,
    component_ref: ComponentReference,
) -> Result<Replacement, EditError> {
    replace_task_as(graph, task_id, component_ref, task_id)
}

/// Like [`replace_task`], but moves the task to `preferred_id`. The id is
/// suffixed when it collides with a sibling.
pub fn replace_task_as(
    graph: &GraphSpec,
    task_id: &str,
    component_ref: ComponentReference,
    preferred_id: &str,
) -> Result<Replacement, EditError> {
    let Some(old) = graph.task(task_id) else {
        let err = EditError::TaskNotFound {
            task_id: task_id.to_string(),
        };
        tracing::warn!(error = %err, "replacement rejected");
        return Err(err);
    };

    let new_task_id = if preferred_id == task_id {
        task_id.to_string()
    } else {
        unique_name(preferred_id, |name| {
            name != task_id && graph.contains_task(name)
        })
    };

    if !component_ref.is_resolved() {
        tracing::warn!(
            task = task_id,
            "replacement component is unresolved; treating every input and output as lost"
        );
    }

    // Inputs.
    let mut old_inputs: IndexSet<&str> = old.component_ref.input_names().into_iter().collect();
    old_inputs.extend(old.arguments.keys().map(String::as_str));
    let lost_inputs: Vec<String> = old_inputs
        .iter()
        .filter(|name| !component_ref.has_input(name))
        .map(|name| name.to_string())
        .collect();

    // Outputs: declared ones plus any a sibling or the graph still consumes.
    let mut old_outputs: IndexSet<&str> = old.component_ref.output_names().into_iter().collect();
    for task in graph.tasks.values() {
        let operands = task
            .is_enabled
            .as_ref()
            .map(|predicate| predicate.operands())
            .unwrap_or_default();
        for argument in task.arguments.values().chain(operands) {
            if let Some(output) = argument.as_task_output() {
                if output.task_id == task_id {
                    old_outputs.insert(&output.output_name);
                }
            }
        }
    }
    for value in graph.output_values.values() {
        if value.task_output.task_id == task_id {
            old_outputs.insert(&value.task_output.output_name);
        }
    }
    let lost_outputs: Vec<String> = old_outputs
        .iter()
        .filter(|name| !component_ref.has_output(name))
        .map(|name| name.to_string())
        .collect();

    let mut task = old.clone();
    task.arguments.retain(|name, _| component_ref.has_input(name));
    task.component_ref = component_ref;

    let mut tasks = IndexMap::with_capacity(graph.tasks.len());
    for (id, existing) in &graph.tasks {
        let (id, mut existing) = if id == task_id {
            (new_task_id.clone(), task.clone())
        } else {
            (id.clone(), existing.clone())
        };
        existing.arguments = existing
            .arguments
            .into_iter()
            .filter_map(|(input, argument)| match argument {
                ArgumentType::TaskOutput(arg) if arg.task_output.task_id == task_id => task
                    .component_ref
                    .has_output(&arg.task_output.output_name)
                    .then(|| (input, ArgumentType::TaskOutput(arg.retarget(&new_task_id)))),
                other => Some((input, other)),
            })
            .collect();
        retarget_gate(&mut existing, &id, task_id, &new_task_id, &task.component_ref);
        tasks.insert(id, existing);
    }
    let task = tasks.get(&new_task_id).cloned().unwrap_or(task);

    let output_values = graph
        .output_values
        .iter()
        .filter_map(|(name, value)| {
            if value.task_output.task_id != task_id {
                return Some((name.clone(), value.clone()));
            }
            task.component_ref
                .has_output(&value.task_output.output_name)
                .then(|| (name.clone(), value.retarget(&new_task_id)))
        })
        .collect();

    tracing::debug!(
        task = task_id,
        new_task_id = %new_task_id,
        lost_inputs = lost_inputs.len(),
        lost_outputs = lost_outputs.len(),
        "replaced task component"
    );

    Ok(Replacement {
        graph: GraphSpec {
            tasks,
            output_values,
        },
        lost_inputs,
        lost_outputs,
        new_task_id,
        task,
    })
}

/// Points `isEnabled` operands that read `task_id` at `new_task_id`. A
/// predicate reading an output `component_ref` lacks can no longer be
/// evaluated and is removed.
fn retarget_gate(
    gated: &mut TaskSpec,
    gated_id: &str,
    task_id: &str,
    new_task_id: &str,
    component_ref: &ComponentReference,
) {
    let Some(predicate) = gated.is_enabled.as_mut() else {
        return;
    };
    let unreadable = Cell::new(false);
    rewrite_predicate(predicate, &|operand: &mut ArgumentType| {
        if let ArgumentType::TaskOutput(arg) = operand {
            if arg.task_output.task_id == task_id {
                if component_ref.has_output(&arg.task_output.output_name) {
                    arg.task_output.task_id = new_task_id.to_string();
                } else {
                    unreadable.set(true);
                }
            }
        }
    });
    if unreadable.get() {
        tracing::warn!(task = gated_id, "dropping isEnabled predicate that reads a lost output");
        gated.is_enabled = None;
    }
}

/// Replaces every task instantiating `old` with `new`.
///
/// Tasks are matched with [`ComponentReference::same_component`]. Ids are
/// kept.
pub fn upgrade_tasks(
    graph: &GraphSpec,
    old: &ComponentReference,
    new: &ComponentReference,
) -> Result<Upgrade, EditError> {
    let targets: Vec<String> = graph
        .tasks
        .iter()
        .filter(|(_, task)| task.component_ref.same_component(old))
        .map(|(id, _)| id.clone())
        .collect();

    let mut current = graph.clone();
    let mut lost_inputs = IndexMap::new();
    for task_id in &targets {
        let replacement = replace_task(&current, task_id, new.clone())?;
        if !replacement.lost_inputs.is_empty() {
            lost_inputs.insert(task_id.clone(), replacement.lost_inputs);
        }
        current = replacement.graph;
    }

    Ok(Upgrade {
        graph: current,
        replaced: targets,
        lost_inputs,
    })
}
