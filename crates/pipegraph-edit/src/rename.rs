//! Renaming tasks and graph inputs.
//!
//! A structural rename must rewrite every reference to the old name; the
//! caller then re-keys the [`IdentityManager`](crate::IdentityManager) so the
//! canvas keeps the node's visual id.

use indexmap::IndexMap;
use pipegraph_core::{ArgumentType, ComponentSpec, GraphSpec, Predicate};

use crate::error::EditError;
use crate::naming::unique_name;

/// Applies `f` to every argument a task reads: its bound arguments and the
/// operands of its `isEnabled` predicate.
fn rewrite_arguments(graph: &mut GraphSpec, f: impl Fn(&mut ArgumentType)) {
    for task in graph.tasks.values_mut() {
        for argument in task.arguments.values_mut() {
            f(argument);
        }
        if let Some(predicate) = task.is_enabled.as_mut() {
            rewrite_predicate(predicate, &f);
        }
    }
}

pub(crate) fn rewrite_predicate(predicate: &mut Predicate, f: &impl Fn(&mut ArgumentType)) {
    match predicate {
        Predicate::And(items) | Predicate::Or(items) => {
            for item in items {
                rewrite_predicate(item, f);
            }
        }
        Predicate::Not(inner) => rewrite_predicate(inner, f),
        Predicate::Equal(ops)
        | Predicate::NotEqual(ops)
        | Predicate::Less(ops)
        | Predicate::LessOrEqual(ops)
        | Predicate::Greater(ops)
        | Predicate::GreaterOrEqual(ops) => {
            f(&mut ops.op1);
            f(&mut ops.op2);
        }
    }
}

/// Renames task `old` to `new` (suffixed on collision) and rewrites every
/// `taskOutput` reference. Returns the new graph and the id actually used.
pub fn rename_task(
    graph: &GraphSpec,
    old: &str,
    new: &str,
) -> Result<(GraphSpec, String), EditError> {
    if !graph.contains_task(old) {
        return Err(EditError::TaskNotFound {
            task_id: old.to_string(),
        });
    }
    if old == new {
        return Ok((graph.clone(), new.to_string()));
    }

    let new_id = unique_name(new, |name| name != old && graph.contains_task(name));
    let tasks: IndexMap<String, _> = graph
        .tasks
        .iter()
        .map(|(id, task)| {
            let id = if id == old { new_id.clone() } else { id.clone() };
            (id, task.clone())
        })
        .collect();
    let mut next = GraphSpec {
        tasks,
        output_values: graph.output_values.clone(),
    };

    rewrite_arguments(&mut next, |argument| {
        if let ArgumentType::TaskOutput(arg) = argument {
            if arg.task_output.task_id == old {
                arg.task_output.task_id = new_id.clone();
            }
        }
    });
    for value in next.output_values.values_mut() {
        if value.task_output.task_id == old {
            value.task_output.task_id = new_id.clone();
        }
    }

    tracing::debug!(old, new = %new_id, "renamed task");
    Ok((next, new_id))
}

/// Renames graph input `old` to `new` (suffixed on collision) and rewrites
/// every `graphInput` reference in the top-level graph.
pub fn rename_input(
    spec: &ComponentSpec,
    old: &str,
    new: &str,
) -> Result<(ComponentSpec, String), EditError> {
    if !spec.has_input(old) {
        return Err(EditError::InputNotFound {
            name: old.to_string(),
        });
    }
    if old == new {
        return Ok((spec.clone(), new.to_string()));
    }

    let new_name = unique_name(new, |name| name != old && spec.has_input(name));
    let mut next = match spec.graph_spec() {
        Some(graph) => {
            let mut graph = graph.clone();
            rewrite_arguments(&mut graph, |argument| {
                if let ArgumentType::GraphInput(arg) = argument {
                    if arg.graph_input.input_name == old {
                        arg.graph_input.input_name = new_name.clone();
                    }
                }
            });
            spec.with_graph(graph)
        }
        None => spec.clone(),
    };
    for input in next.inputs.iter_mut() {
        if input.name == old {
            input.name = new_name.clone();
        }
    }

    tracing::debug!(old, new = %new_name, "renamed graph input");
    Ok((next, new_name))
}
