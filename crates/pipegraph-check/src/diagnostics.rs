//! Validation findings.
//!
//! Every [`Diagnostic`] carries the dotted location of the offending task or
//! graph level (`root.subgraph1.task2`, or `root` for the top-level graph),
//! so a finding can be mapped back onto the flattened hierarchy.

use serde::Serialize;

/// A structural problem found in a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A container command references an input or output its component
    /// does not declare.
    #[error("{location}: component '{component}' references unknown {placeholder}")]
    #[serde(rename_all = "camelCase")]
    UnknownPlaceholder {
        location: String,
        component: String,
        /// Rendered as `input 'x'` / `output 'y'`.
        placeholder: String,
    },

    /// An argument is bound to an input the task's component does not have.
    #[error("{location}: argument '{input}' is not an input of the component")]
    #[serde(rename_all = "camelCase")]
    UndeclaredArgument { location: String, input: String },

    /// A required input (no default, not optional) has no argument.
    #[error("{location}: required input '{input}' is not bound")]
    #[serde(rename_all = "camelCase")]
    MissingArgument { location: String, input: String },

    /// A `graphInput` argument names an input the enclosing component lacks.
    #[error("{location}: argument '{input}' reads unknown graph input '{graph_input}'")]
    #[serde(rename_all = "camelCase")]
    UnknownGraphInput {
        location: String,
        input: String,
        graph_input: String,
    },

    /// A `taskOutput` argument names a task that is not a sibling.
    #[error("{location}: argument '{input}' reads unknown task '{task_id}'")]
    #[serde(rename_all = "camelCase")]
    UnknownUpstreamTask {
        location: String,
        input: String,
        task_id: String,
    },

    /// A `taskOutput` reference names an output the upstream component does
    /// not declare.
    #[error("{location}: '{task_id}' has no output '{output}'")]
    #[serde(rename_all = "camelCase")]
    UndeclaredUpstreamOutput {
        location: String,
        task_id: String,
        output: String,
    },

    /// `outputValues` maps a name the enclosing component does not declare.
    #[error("{location}: output value '{output}' is not a declared graph output")]
    #[serde(rename_all = "camelCase")]
    UndeclaredGraphOutput { location: String, output: String },

    /// `outputValues` reads a task that does not exist at this level.
    #[error("{location}: graph output '{output}' reads unknown task '{task_id}'")]
    #[serde(rename_all = "camelCase")]
    UnknownOutputTask {
        location: String,
        output: String,
        task_id: String,
    },

    /// Sibling tasks feed each other in a loop.
    #[error("{location}: data-flow cycle between {}", .tasks.join(", "))]
    #[serde(rename_all = "camelCase")]
    Cycle { location: String, tasks: Vec<String> },
}

impl Diagnostic {
    /// Dotted location of the finding.
    pub fn location(&self) -> &str {
        match self {
            Diagnostic::UnknownPlaceholder { location, .. }
            | Diagnostic::UndeclaredArgument { location, .. }
            | Diagnostic::MissingArgument { location, .. }
            | Diagnostic::UnknownGraphInput { location, .. }
            | Diagnostic::UnknownUpstreamTask { location, .. }
            | Diagnostic::UndeclaredUpstreamOutput { location, .. }
            | Diagnostic::UndeclaredGraphOutput { location, .. }
            | Diagnostic::UnknownOutputTask { location, .. }
            | Diagnostic::Cycle { location, .. } => location,
        }
    }
}
