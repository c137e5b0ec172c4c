//! Edit error types.
//!
//! [`EditError`] is returned whenever a gesture cannot be applied. The
//! caller's snapshot is never touched, so the error doubles as the diagnostic
//! the UI surfaces to the user.

use std::fmt;

use pipegraph_core::{CoreError, EntityKind, HandleKind, VisualId};
use thiserror::Error;

/// Which end of a connection a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

/// Reasons an edit was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// A visual id that does not resolve to a task, input or output node.
    #[error("{endpoint} node {id} does not resolve to a graph entity")]
    UnresolvedNode { endpoint: Endpoint, id: VisualId },

    /// A handle id that is unknown, points at another node, or has the wrong
    /// direction.
    #[error("{endpoint} handle {id} is not a handle of '{parent}'")]
    UnresolvedHandle {
        endpoint: Endpoint,
        id: VisualId,
        parent: String,
    },

    /// The task's component does not declare the handle's input or output.
    #[error("'{task_id}' has no {kind} named '{name}'")]
    UndeclaredHandle {
        task_id: String,
        kind: HandleKind,
        name: String,
    },

    /// The connection pattern needs a handle on this endpoint.
    #[error("{endpoint} '{node}' requires a handle")]
    MissingHandle { endpoint: Endpoint, node: String },

    /// Both endpoints resolve to the same structural id.
    #[error("cannot connect '{id}' to itself")]
    SelfLoop { id: String },

    /// The `(source, target)` kind pair is not a supported connection.
    #[error("unsupported connection: {source_kind} -> {target_kind}")]
    UnsupportedConnection {
        source_kind: EntityKind,
        target_kind: EntityKind,
    },

    /// Disconnection was requested on a node that never receives edges.
    #[error("{kind} nodes cannot be the target of an edge")]
    NotATarget { kind: EntityKind },

    #[error("task not found: '{task_id}'")]
    TaskNotFound { task_id: String },

    #[error("input not found: '{name}'")]
    InputNotFound { name: String },

    #[error("parent not found: '{id}'")]
    ParentNotFound { id: String },

    #[error("'{id}' is not a subgraph")]
    NotASubgraph { id: String },

    #[error("name '{name}' is already used in '{scope}'")]
    NameCollision { name: String, scope: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
