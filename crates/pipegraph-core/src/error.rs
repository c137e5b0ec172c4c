//! Core error types for pipegraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants. These cover
//! programmer-error preconditions only; user-driven edge cases are reported
//! by the editing layer.

use thiserror::Error;

use crate::component::PlaceholderRef;

/// Core errors produced by the pipegraph-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A graph operation was invoked on a container implementation.
    #[error("component '{name}' is not implemented as a graph")]
    NotAGraph { name: String },

    /// A command-line placeholder names an input or output the component
    /// does not declare.
    #[error("placeholder references undeclared {placeholder}")]
    UnknownPlaceholder { placeholder: PlaceholderRef },
}
