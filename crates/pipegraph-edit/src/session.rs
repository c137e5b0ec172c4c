//! One open editing session over a component.
//!
//! [`Session`] owns the current spec, its undo history, and the identity
//! table for the canvas. Every successful edit is committed as a new
//! snapshot and followed by [`IdentityManager::sync`]; a rejected edit
//! leaves all three untouched.

use pipegraph_core::{ComponentReference, ComponentSpec, EntityKind, NodeDescriptor, VisualId};

use crate::config::EditorConfig;
use crate::connect::{self, ConnectionRequest};
use crate::duplicate::{duplicate_nodes, DuplicateOptions, Duplication};
use crate::error::EditError;
use crate::history::History;
use crate::identity::IdentityManager;
use crate::rename;
use crate::replace::{replace_task, Replacement};

#[derive(Debug)]
pub struct Session {
    history: History<ComponentSpec>,
    ids: IdentityManager,
    config: EditorConfig,
}

impl Session {
    pub fn open(spec: ComponentSpec, config: EditorConfig) -> Self {
        let mut ids = IdentityManager::new();
        ids.sync(&spec);
        tracing::debug!(component = spec.display_name(), "session opened");
        Session {
            history: History::new(spec, config.history_limit),
            ids,
            config,
        }
    }

    pub fn spec(&self) -> &ComponentSpec {
        self.history.current()
    }

    pub fn ids(&self) -> &IdentityManager {
        &self.ids
    }

    /// Mutable access for allocating visual ids while rendering.
    pub fn ids_mut(&mut self) -> &mut IdentityManager {
        &mut self.ids
    }

    pub fn history(&self) -> &History<ComponentSpec> {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Records `spec` as the new current state.
    pub fn commit(&mut self, spec: ComponentSpec, description: impl Into<String>) {
        self.ids.sync(&spec);
        self.history.commit(spec, description);
    }

    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(spec) => {
                self.ids.sync(spec);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(spec) => {
                self.ids.sync(spec);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Engine shortcuts
    // -----------------------------------------------------------------------

    pub fn connect(&mut self, request: &ConnectionRequest) -> Result<(), EditError> {
        let spec = self.spec();
        let graph = connect::connect(&self.ids, spec.require_graph()?, request)?;
        let next = spec.with_graph(graph);
        self.commit(next, "connect");
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        target: &VisualId,
        target_handle: Option<&VisualId>,
    ) -> Result<(), EditError> {
        let spec = self.spec();
        let graph = connect::disconnect(&self.ids, spec.require_graph()?, target, target_handle)?;
        let next = spec.with_graph(graph);
        self.commit(next, "disconnect");
        Ok(())
    }

    pub fn duplicate(
        &mut self,
        nodes: &[NodeDescriptor],
        options: &DuplicateOptions,
    ) -> Result<Duplication, EditError> {
        let duplication = duplicate_nodes(
            &mut self.ids,
            self.history.current(),
            nodes,
            options,
            &self.config,
        )?;
        if !duplication.id_map.is_empty() {
            self.commit(duplication.spec.clone(), "duplicate");
        }
        Ok(duplication)
    }

    /// Swaps the component of `task_id`. The task keeps its visual id.
    pub fn replace(
        &mut self,
        task_id: &str,
        component_ref: ComponentReference,
    ) -> Result<Replacement, EditError> {
        let spec = self.spec();
        let replacement = replace_task(spec.require_graph()?, task_id, component_ref)?;
        let next = spec.with_graph(replacement.graph.clone());
        if replacement.new_task_id != task_id {
            self.ids
                .rename(task_id, &replacement.new_task_id, Some(EntityKind::Task));
        }
        self.commit(next, format!("replace {}", task_id));
        Ok(replacement)
    }

    /// Renames a task, keeping its visual id. Returns the id actually used.
    pub fn rename_task(&mut self, old: &str, new: &str) -> Result<String, EditError> {
        let spec = self.spec();
        let (graph, new_id) = rename::rename_task(spec.require_graph()?, old, new)?;
        let next = spec.with_graph(graph);
        self.ids.rename(old, &new_id, Some(EntityKind::Task));
        self.commit(next, format!("rename {} to {}", old, new_id));
        Ok(new_id)
    }

    /// Renames a graph input, keeping its visual id.
    pub fn rename_input(&mut self, old: &str, new: &str) -> Result<String, EditError> {
        let (next, new_name) = rename::rename_input(self.spec(), old, new)?;
        self.ids.rename(old, &new_name, Some(EntityKind::Input));
        self.commit(next, format!("rename input {} to {}", old, new_name));
        Ok(new_name)
    }

    /// Ends the session, forgetting every visual id. Returns the final spec.
    pub fn close(mut self) -> ComponentSpec {
        self.ids.clear();
        tracing::debug!("session closed");
        self.history.current().clone()
    }
}
