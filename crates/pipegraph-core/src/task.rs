//! Tasks and their arguments.
//!
//! A [`TaskSpec`] instantiates a component inside a graph. Its `arguments`
//! map each input name to an [`ArgumentType`]: a literal, a reference to an
//! input of the enclosing component, or a reference to a sibling task's
//! output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::component::{Annotations, ComponentSpec, TypeSpec};
use crate::graph::GraphSpec;
use crate::reference::ComponentReference;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Payload of a graph-input reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInputRef {
    pub input_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
}

/// `{ graphInput: { inputName } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInputArgument {
    pub graph_input: GraphInputRef,
}

/// Payload of a task-output reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputRef {
    pub task_id: String,
    pub output_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
}

/// `{ taskOutput: { taskId, outputName } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputArgument {
    pub task_output: TaskOutputRef,
}

impl TaskOutputArgument {
    pub fn new(task_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        TaskOutputArgument {
            task_output: TaskOutputRef {
                task_id: task_id.into(),
                output_name: output_name.into(),
                type_spec: None,
            },
        }
    }

    /// Copy pointing at `task_id`, keeping output name and type.
    pub fn retarget(&self, task_id: &str) -> Self {
        let mut moved = self.clone();
        moved.task_output.task_id = task_id.to_string();
        moved
    }
}

/// The value bound to a task input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentType {
    Literal(String),
    GraphInput(GraphInputArgument),
    TaskOutput(TaskOutputArgument),
}

impl ArgumentType {
    pub fn literal(value: impl Into<String>) -> Self {
        ArgumentType::Literal(value.into())
    }

    pub fn graph_input(input_name: impl Into<String>) -> Self {
        ArgumentType::GraphInput(GraphInputArgument {
            graph_input: GraphInputRef {
                input_name: input_name.into(),
                type_spec: None,
            },
        })
    }

    pub fn task_output(task_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        ArgumentType::TaskOutput(TaskOutputArgument::new(task_id, output_name))
    }

    pub fn as_graph_input(&self) -> Option<&GraphInputRef> {
        match self {
            ArgumentType::GraphInput(arg) => Some(&arg.graph_input),
            _ => None,
        }
    }

    pub fn as_task_output(&self) -> Option<&TaskOutputRef> {
        match self {
            ArgumentType::TaskOutput(arg) => Some(&arg.task_output),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conditional execution
// ---------------------------------------------------------------------------

/// Operands of a comparison predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperands {
    pub op1: ArgumentType,
    pub op2: ArgumentType,
}

/// Boolean predicate tree deciding whether a task runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    #[serde(rename = "and")]
    And(Vec<Predicate>),
    #[serde(rename = "or")]
    Or(Vec<Predicate>),
    #[serde(rename = "not")]
    Not(Box<Predicate>),
    #[serde(rename = "==")]
    Equal(BinaryOperands),
    #[serde(rename = "!=")]
    NotEqual(BinaryOperands),
    #[serde(rename = "<")]
    Less(BinaryOperands),
    #[serde(rename = "<=")]
    LessOrEqual(BinaryOperands),
    #[serde(rename = ">")]
    Greater(BinaryOperands),
    #[serde(rename = ">=")]
    GreaterOrEqual(BinaryOperands),
}

impl Predicate {
    /// Every operand in the tree, depth first.
    pub fn operands(&self) -> Vec<&ArgumentType> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands<'a>(&'a self, out: &mut Vec<&'a ArgumentType>) {
        match self {
            Predicate::And(items) | Predicate::Or(items) => {
                for item in items {
                    item.collect_operands(out);
                }
            }
            Predicate::Not(inner) => inner.collect_operands(out),
            Predicate::Equal(ops)
            | Predicate::NotEqual(ops)
            | Predicate::Less(ops)
            | Predicate::LessOrEqual(ops)
            | Predicate::Greater(ops)
            | Predicate::GreaterOrEqual(ops) => {
                out.push(&ops.op1);
                out.push(&ops.op2);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryStrategy {
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingStrategy {
    /// ISO 8601 duration, e.g. `P30D`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cache_staleness: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<RetryStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_strategy: Option<CachingStrategy>,
}

// ---------------------------------------------------------------------------
// TaskSpec
// ---------------------------------------------------------------------------

/// An instantiation of a component within a graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub component_ref: ComponentReference,
    /// Input name -> bound value. Keys must be declared inputs of the
    /// resolved component.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, ArgumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_options: Option<ExecutionOptions>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: Annotations,
}

impl TaskSpec {
    pub fn new(component_ref: ComponentReference) -> Self {
        TaskSpec {
            component_ref,
            ..Default::default()
        }
    }

    /// Task instantiating an inline spec.
    pub fn from_spec(spec: ComponentSpec) -> Self {
        TaskSpec::new(ComponentReference::from_spec(spec))
    }

    /// Builder: binds `input_name`.
    pub fn with_argument(mut self, input_name: impl Into<String>, argument: ArgumentType) -> Self {
        self.arguments.insert(input_name.into(), argument);
        self
    }

    pub fn resolved_spec(&self) -> Option<&ComponentSpec> {
        self.component_ref.resolved()
    }

    /// The nested graph when this task is a subgraph.
    pub fn subgraph(&self) -> Option<&GraphSpec> {
        self.resolved_spec().and_then(ComponentSpec::graph_spec)
    }

    pub fn is_subgraph(&self) -> bool {
        self.subgraph().is_some()
    }

    /// Returns a copy whose nested graph (if any) is replaced by `graph`.
    /// Non-subgraph tasks are returned unchanged.
    pub fn with_subgraph(&self, graph: GraphSpec) -> TaskSpec {
        let mut task = self.clone();
        if let Some(spec) = task.component_ref.spec.as_mut() {
            if spec.is_graph() {
                **spec = spec.with_graph(graph);
            }
        }
        task
    }

    /// Task ids referenced by `taskOutput` arguments.
    pub fn upstream_tasks(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .values()
            .filter_map(|arg| arg.as_task_output())
            .map(|output| output.task_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InputSpec, OutputSpec};

    #[test]
    fn argument_variants_use_canonical_shapes() {
        let literal: ArgumentType = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(literal, ArgumentType::literal("42"));

        let input: ArgumentType =
            serde_json::from_str(r#"{"graphInput": {"inputName": "lr"}}"#).unwrap();
        assert_eq!(input.as_graph_input().unwrap().input_name, "lr");

        let output: ArgumentType =
            serde_json::from_str(r#"{"taskOutput": {"taskId": "t1", "outputName": "o1"}}"#)
                .unwrap();
        assert_eq!(output, ArgumentType::task_output("t1", "o1"));

        let json = serde_json::to_value(ArgumentType::task_output("t1", "o1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"taskOutput": {"taskId": "t1", "outputName": "o1"}})
        );
    }

    #[test]
    fn predicate_round_trips_operator_keys() {
        let json = r#"{"and": [
            {"==": {"op1": {"taskOutput": {"taskId": "check", "outputName": "ok"}}, "op2": "true"}},
            {"not": {"<": {"op1": {"graphInput": {"inputName": "n"}}, "op2": "3"}}}
        ]}"#;
        let predicate: Predicate = serde_json::from_str(json).unwrap();
        assert_eq!(predicate.operands().len(), 4);

        let value = serde_json::to_value(&predicate).unwrap();
        assert!(value.get("and").is_some());
        let back: Predicate = serde_json::from_value(value).unwrap();
        assert_eq!(back, predicate);
    }

    #[test]
    fn subgraph_detection_and_splicing() {
        let leaf = ComponentSpec::container("leaf", "img")
            .with_input(InputSpec::new("x"))
            .with_output(OutputSpec::new("y"));
        let leaf_task = TaskSpec::from_spec(leaf.clone());
        assert!(!leaf_task.is_subgraph());
        assert_eq!(leaf_task.with_subgraph(GraphSpec::default()), leaf_task);

        let inner = GraphSpec::default().with_task("a", TaskSpec::from_spec(leaf));
        let sub = TaskSpec::from_spec(ComponentSpec::graph("sub", inner));
        assert!(sub.is_subgraph());
        assert_eq!(sub.subgraph().unwrap().tasks.len(), 1);

        let emptied = sub.with_subgraph(GraphSpec::default());
        assert!(emptied.is_subgraph());
        assert!(emptied.subgraph().unwrap().tasks.is_empty());
    }

    #[test]
    fn upstream_tasks_lists_task_output_arguments() {
        let task = TaskSpec::from_spec(ComponentSpec::container("c", "img"))
            .with_argument("a", ArgumentType::task_output("t1", "o"))
            .with_argument("b", ArgumentType::graph_input("x"))
            .with_argument("c", ArgumentType::literal("1"))
            .with_argument("d", ArgumentType::task_output("t2", "o"));
        assert_eq!(task.upstream_tasks().collect::<Vec<_>>(), vec!["t1", "t2"]);
    }
}
