//! Visual node descriptors exchanged with the canvas layer.

use serde::{Deserialize, Serialize};

use crate::id::{EntityKind, VisualId};
use crate::position::Position;

/// What the canvas knows about one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub id: VisualId,
    pub kind: EntityKind,
    pub position: Position,
    #[serde(default)]
    pub selected: bool,
    /// Run status badge shown on the node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NodeDescriptor {
    pub fn new(id: VisualId, kind: EntityKind, position: Position) -> Self {
        NodeDescriptor {
            id,
            kind,
            position,
            selected: false,
            status: None,
        }
    }

    /// Builder: marks the node as selected.
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}
