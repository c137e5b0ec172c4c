//! Visual identifiers and entity kinds.
//!
//! Structural ids (task ids, input and output names) are plain strings that
//! users may rename at any time. [`VisualId`] is the opaque, rename-independent
//! identifier the canvas uses for nodes and handles.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable identifier of a canvas node or handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualId(String);

impl VisualId {
    /// Wraps an existing identifier (e.g. one echoed back by the canvas).
    pub fn new(id: impl Into<String>) -> Self {
        VisualId(id.into())
    }

    /// Allocates a fresh identifier. The prefix only aids debugging; callers
    /// must treat the value as opaque.
    pub fn fresh(prefix: &str) -> Self {
        VisualId(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VisualId {
    fn from(id: &str) -> Self {
        VisualId(id.to_string())
    }
}

/// The structural role of a canvas node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A task in the current graph level.
    Task,
    /// An input of the enclosing component (a graph input node).
    Input,
    /// An output of the enclosing component (a graph output node).
    Output,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Task, EntityKind::Input, EntityKind::Output];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Input => "input",
            EntityKind::Output => "output",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a named connection point on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    Input,
    Output,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Input => f.write_str("input"),
            HandleKind::Output => f.write_str("output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct() {
        let a = VisualId::fresh("task");
        let b = VisualId::fresh("task");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task_"));
    }

    #[test]
    fn visual_id_serializes_as_plain_string() {
        let id = VisualId::new("node-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"node-7\"");
        let back: VisualId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn entity_kind_display() {
        assert_eq!(EntityKind::Task.to_string(), "task");
        assert_eq!(EntityKind::Input.to_string(), "input");
        assert_eq!(EntityKind::Output.to_string(), "output");
        assert_eq!(HandleKind::Output.to_string(), "output");
    }
}
