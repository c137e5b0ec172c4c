//! Structural editing engine for pipeline graphs.
//!
//! Every engine in this crate borrows an immutable snapshot of a spec and
//! returns a new snapshot (or an [`EditError`] describing why the gesture was
//! rejected). The [`IdentityManager`] is the only mutable state; it is owned by
//! the editing [`Session`] and passed explicitly to the engines that need to
//! resolve visual ids.
//!
//! # Modules
//!
//! - [`identity`]: visual id allocation and resolution
//! - [`hierarchy`]: flattening/reconstruction of nested subgraphs
//! - [`connect`]: canvas connections to arguments and output values
//! - [`duplicate`]: node duplication with link-preservation policies
//! - [`replace`]: component replacement and upgrade
//! - [`rename`]: reference-preserving renames
//! - [`history`]: bounded undo/redo over snapshots
//! - [`session`]: one open canvas session

pub mod config;
pub mod connect;
pub mod duplicate;
pub mod error;
pub mod hierarchy;
pub mod history;
pub mod identity;
pub mod naming;
pub mod rename;
pub mod replace;
pub mod session;

pub use config::EditorConfig;
pub use connect::{connect, disconnect, ConnectionRequest};
pub use duplicate::{
    duplicate_nodes, DuplicateOptions, Duplication, IdMap, LinkPolicy, UnknownLinkPolicy,
};
pub use error::{EditError, Endpoint};
pub use hierarchy::{flatten, reconstruct, reconstruct_component, FlatIndex, FlatTask, ROOT};
pub use history::History;
pub use identity::{IdentityManager, Resolved};
pub use naming::unique_name;
pub use rename::{rename_input, rename_task};
pub use replace::{replace_task, replace_task_as, upgrade_tasks, Replacement, Upgrade};
pub use session::Session;
