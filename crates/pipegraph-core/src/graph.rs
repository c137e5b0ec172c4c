//! GraphSpec: one level of a pipeline graph.
//!
//! [`GraphSpec`] holds the tasks of a single graph level plus the mapping
//! from the enclosing component's outputs to task outputs. Its two write
//! primitives, [`with_task_argument`](GraphSpec::with_task_argument) and
//! [`with_output_value`](GraphSpec::with_output_value), never mutate `self`:
//! they return a new graph so callers can keep the old one as an undo
//! snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::task::{ArgumentType, TaskOutputArgument, TaskSpec};

/// Tasks of one graph level and the values exported as graph outputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSpec {
    /// Task id -> task. Ids are unique within this level.
    #[serde(default)]
    pub tasks: IndexMap<String, TaskSpec>,
    /// Graph output name -> producing task output.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output_values: IndexMap<String, TaskOutputArgument>,
}

impl GraphSpec {
    pub fn new() -> Self {
        GraphSpec::default()
    }

    /// Builder: inserts (or replaces) a task.
    pub fn with_task(mut self, task_id: impl Into<String>, task: TaskSpec) -> Self {
        self.tasks.insert(task_id.into(), task);
        self
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskSpec> {
        self.tasks.get(task_id)
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Write primitives
    // -----------------------------------------------------------------------

    /// Returns a copy with `task_id.arguments[input_name]` set to `argument`,
    /// or removed when `argument` is `None`.
    ///
    /// An unknown `task_id` yields an unchanged copy; removing a missing
    /// entry is a no-op. Argument order is preserved on removal.
    pub fn with_task_argument(
        &self,
        task_id: &str,
        input_name: &str,
        argument: Option<ArgumentType>,
    ) -> GraphSpec {
        let mut graph = self.clone();
        if let Some(task) = graph.tasks.get_mut(task_id) {
            match argument {
                Some(argument) => {
                    task.arguments.insert(input_name.to_string(), argument);
                }
                None => {
                    task.arguments.shift_remove(input_name);
                }
            }
        }
        graph
    }

    /// Returns a copy with `output_values[output_name]` set to `value`, or
    /// removed when `value` is `None`.
    pub fn with_output_value(
        &self,
        output_name: &str,
        value: Option<TaskOutputArgument>,
    ) -> GraphSpec {
        let mut graph = self.clone();
        match value {
            Some(value) => {
                graph.output_values.insert(output_name.to_string(), value);
            }
            None => {
                graph.output_values.shift_remove(output_name);
            }
        }
        graph
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `(consumer task, input name)` pairs whose argument reads an output of
    /// `task_id`.
    pub fn consumers_of(&self, task_id: &str) -> Vec<(&str, &str)> {
        self.tasks
            .iter()
            .flat_map(|(consumer, task)| {
                task.arguments.iter().filter_map(move |(input, arg)| {
                    arg.as_task_output()
                        .filter(|output| output.task_id == task_id)
                        .map(|_| (consumer.as_str(), input.as_str()))
                })
            })
            .collect()
    }
}
