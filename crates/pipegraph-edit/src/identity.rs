//! Stable visual identity for structural entities.
//!
//! [`IdentityManager`] hands out a [`VisualId`] for every task, graph input,
//! graph output, and task handle, and keeps answering with the same id across
//! renames. It lives exactly as long as one canvas session: create it when
//! the session opens, call [`sync`](IdentityManager::sync) after every
//! committed mutation, and drop (or [`clear`](IdentityManager::clear)) it
//! when the session closes. It is never persisted with the component.
//!
//! Lookups on unknown ids return `None`/`false`; gestures can race with
//! structural changes, so nothing here panics on stale input.

use std::collections::{HashMap, HashSet};

use pipegraph_core::{ComponentSpec, EntityKind, HandleKind, VisualId};
use serde::Serialize;

/// What a visual id stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resolved {
    #[serde(rename_all = "camelCase")]
    Entity {
        structural_id: String,
        kind: EntityKind,
    },
    #[serde(rename_all = "camelCase")]
    Handle {
        parent_structural_id: String,
        handle_name: String,
        handle_kind: HandleKind,
    },
}

impl Resolved {
    /// `(structural_id, kind)` for entity ids.
    pub fn as_entity(&self) -> Option<(&str, EntityKind)> {
        match self {
            Resolved::Entity {
                structural_id,
                kind,
            } => Some((structural_id, *kind)),
            Resolved::Handle { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    kind: EntityKind,
    structural_id: String,
}

impl EntityKey {
    fn new(structural_id: &str, kind: EntityKind) -> Self {
        EntityKey {
            kind,
            structural_id: structural_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    parent: String,
    kind: HandleKind,
    name: String,
}

impl HandleKey {
    fn new(parent: &str, name: &str, kind: HandleKind) -> Self {
        HandleKey {
            parent: parent.to_string(),
            kind,
            name: name.to_string(),
        }
    }
}

/// Session-scoped map between structural ids and visual ids.
#[derive(Debug, Default, Clone)]
pub struct IdentityManager {
    entities: HashMap<EntityKey, VisualId>,
    handles: HashMap<HandleKey, VisualId>,
    reverse: HashMap<VisualId, Resolved>,
}

impl IdentityManager {
    pub fn new() -> Self {
        IdentityManager::default()
    }

    /// Visual id for `(structural_id, kind)`, allocated on first use.
    pub fn get_id(&mut self, structural_id: &str, kind: EntityKind) -> VisualId {
        let key = EntityKey::new(structural_id, kind);
        if let Some(id) = self.entities.get(&key) {
            return id.clone();
        }
        let id = VisualId::fresh(kind.as_str());
        self.reverse.insert(
            id.clone(),
            Resolved::Entity {
                structural_id: structural_id.to_string(),
                kind,
            },
        );
        self.entities.insert(key, id.clone());
        id
    }

    /// Visual id of a named handle on `parent_structural_id`, allocated on
    /// first use.
    pub fn get_handle_id(
        &mut self,
        parent_structural_id: &str,
        handle_name: &str,
        handle_kind: HandleKind,
    ) -> VisualId {
        let key = HandleKey::new(parent_structural_id, handle_name, handle_kind);
        if let Some(id) = self.handles.get(&key) {
            return id.clone();
        }
        let id = VisualId::fresh("handle");
        self.reverse.insert(
            id.clone(),
            Resolved::Handle {
                parent_structural_id: parent_structural_id.to_string(),
                handle_name: handle_name.to_string(),
                handle_kind,
            },
        );
        self.handles.insert(key, id.clone());
        id
    }

    /// Existing visual id without allocating.
    pub fn lookup(&self, structural_id: &str, kind: EntityKind) -> Option<&VisualId> {
        self.entities.get(&EntityKey::new(structural_id, kind))
    }

    /// Existing handle id without allocating.
    pub fn lookup_handle(
        &self,
        parent_structural_id: &str,
        handle_name: &str,
        handle_kind: HandleKind,
    ) -> Option<&VisualId> {
        self.handles
            .get(&HandleKey::new(parent_structural_id, handle_name, handle_kind))
    }

    pub fn resolve(&self, id: &VisualId) -> Option<&Resolved> {
        self.reverse.get(id)
    }

    /// Number of remembered entity and handle ids.
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Re-keys `old` to `new` so existing visual ids answer to the new name.
    ///
    /// With `kind == None` every kind that knows `old` is renamed. Renaming a
    /// task also moves its handles. A mapping previously held by `new` is
    /// discarded. Returns `false` when nothing was renamed.
    pub fn rename(&mut self, old: &str, new: &str, kind: Option<EntityKind>) -> bool {
        let kinds: Vec<EntityKind> = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut renamed = false;
        for kind in kinds {
            let Some(id) = self.entities.remove(&EntityKey::new(old, kind)) else {
                continue;
            };
            if old == new {
                self.entities.insert(EntityKey::new(old, kind), id);
                renamed = true;
                continue;
            }
            if let Some(displaced) = self.entities.insert(EntityKey::new(new, kind), id.clone()) {
                self.reverse.remove(&displaced);
                if kind == EntityKind::Task {
                    self.remove_handles_of(new);
                }
            }
            self.reverse.insert(
                id,
                Resolved::Entity {
                    structural_id: new.to_string(),
                    kind,
                },
            );
            if kind == EntityKind::Task {
                self.move_handles(old, new);
            }
            renamed = true;
        }
        renamed
    }

    /// Forgets an entity (and, for tasks, its handles). With `kind == None`
    /// every kind is removed. Returns `false` when nothing was known.
    pub fn remove(&mut self, structural_id: &str, kind: Option<EntityKind>) -> bool {
        let kinds: Vec<EntityKind> = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut removed = false;
        for kind in kinds {
            if let Some(id) = self.entities.remove(&EntityKey::new(structural_id, kind)) {
                self.reverse.remove(&id);
                removed = true;
            }
            if kind == EntityKind::Task {
                removed |= self.remove_handles_of(structural_id);
            }
        }
        removed
    }

    /// Drops every mapping whose entity or handle no longer exists in `spec`.
    /// Mappings still present keep their visual ids.
    ///
    /// Valid entities are the top-level tasks of `spec`'s graph and `spec`'s
    /// inputs and outputs. Valid task handles are the resolved component's
    /// declared inputs/outputs plus any names already wired by arguments or
    /// output values (so unresolved components keep their connected handles).
    pub fn sync(&mut self, spec: &ComponentSpec) {
        let mut entities: HashSet<EntityKey> = HashSet::new();
        let mut handles: HashSet<HandleKey> = HashSet::new();

        for input in &spec.inputs {
            entities.insert(EntityKey::new(&input.name, EntityKind::Input));
        }
        for output in &spec.outputs {
            entities.insert(EntityKey::new(&output.name, EntityKind::Output));
        }

        if let Some(graph) = spec.graph_spec() {
            for (task_id, task) in &graph.tasks {
                entities.insert(EntityKey::new(task_id, EntityKind::Task));
                for name in task.component_ref.input_names() {
                    handles.insert(HandleKey::new(task_id, name, HandleKind::Input));
                }
                for name in task.component_ref.output_names() {
                    handles.insert(HandleKey::new(task_id, name, HandleKind::Output));
                }
                for (input, argument) in &task.arguments {
                    handles.insert(HandleKey::new(task_id, input, HandleKind::Input));
                    if let Some(output) = argument.as_task_output() {
                        handles.insert(HandleKey::new(
                            &output.task_id,
                            &output.output_name,
                            HandleKind::Output,
                        ));
                    }
                }
            }
            for value in graph.output_values.values() {
                handles.insert(HandleKey::new(
                    &value.task_output.task_id,
                    &value.task_output.output_name,
                    HandleKind::Output,
                ));
            }
        }

        let before = self.reverse.len();
        let reverse = &mut self.reverse;
        self.entities.retain(|key, id| {
            let keep = entities.contains(key);
            if !keep {
                reverse.remove(id);
            }
            keep
        });
        self.handles.retain(|key, id| {
            let keep = handles.contains(key);
            if !keep {
                reverse.remove(id);
            }
            keep
        });
        tracing::debug!(
            pruned = before - self.reverse.len(),
            remaining = self.reverse.len(),
            "identity table synced"
        );
    }

    /// Forgets everything; used when a session closes.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.handles.clear();
        self.reverse.clear();
    }

    fn move_handles(&mut self, old_parent: &str, new_parent: &str) {
        let moved: Vec<HandleKey> = self
            .handles
            .keys()
            .filter(|key| key.parent == old_parent)
            .cloned()
            .collect();
        for key in moved {
            if let Some(id) = self.handles.remove(&key) {
                self.reverse.insert(
                    id.clone(),
                    Resolved::Handle {
                        parent_structural_id: new_parent.to_string(),
                        handle_name: key.name.clone(),
                        handle_kind: key.kind,
                    },
                );
                let displaced = self
                    .handles
                    .insert(HandleKey::new(new_parent, &key.name, key.kind), id);
                if let Some(displaced) = displaced {
                    self.reverse.remove(&displaced);
                }
            }
        }
    }

    fn remove_handles_of(&mut self, parent: &str) -> bool {
        let reverse = &mut self.reverse;
        let before = self.handles.len();
        self.handles.retain(|key, id| {
            let keep = key.parent != parent;
            if !keep {
                reverse.remove(id);
            }
            keep
        });
        before != self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::{
        ArgumentType, ComponentSpec, GraphSpec, InputSpec, OutputSpec, TaskSpec,
    };

    fn spec() -> ComponentSpec {
        let a = ComponentSpec::container("A", "image-a").with_output(OutputSpec::new("o1"));
        let b = ComponentSpec::container("B", "image-b").with_input(InputSpec::new("i1"));
        let graph = GraphSpec::new()
            .with_task("t1", TaskSpec::from_spec(a))
            .with_task("t2", TaskSpec::from_spec(b));
        ComponentSpec::graph("pipeline", graph)
            .with_input(InputSpec::new("lr"))
            .with_output(OutputSpec::new("model"))
    }

    #[test]
    fn get_id_is_memoized_per_kind() {
        let mut ids = IdentityManager::new();
        let first = ids.get_id("x", EntityKind::Task);
        assert_eq!(ids.get_id("x", EntityKind::Task), first);
        assert_ne!(ids.get_id("x", EntityKind::Input), first);
        assert_eq!(
            ids.resolve(&first),
            Some(&Resolved::Entity {
                structural_id: "x".into(),
                kind: EntityKind::Task
            })
        );
    }

    #[test]
    fn handles_are_namespaced_by_parent() {
        let mut ids = IdentityManager::new();
        let a = ids.get_handle_id("t1", "data", HandleKind::Input);
        let b = ids.get_handle_id("t2", "data", HandleKind::Input);
        let c = ids.get_handle_id("t1", "data", HandleKind::Output);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(ids.get_handle_id("t1", "data", HandleKind::Input), a);
        assert_eq!(
            ids.resolve(&b),
            Some(&Resolved::Handle {
                parent_structural_id: "t2".into(),
                handle_name: "data".into(),
                handle_kind: HandleKind::Input
            })
        );
    }

    #[test]
    fn unknown_ids_resolve_to_none() {
        let ids = IdentityManager::new();
        assert_eq!(ids.resolve(&VisualId::new("nope")), None);
        assert_eq!(ids.lookup("x", EntityKind::Task), None);
    }

    #[test]
    fn rename_keeps_visual_id_and_moves_handles() {
        let mut ids = IdentityManager::new();
        let node = ids.get_id("old", EntityKind::Task);
        let handle = ids.get_handle_id("old", "in", HandleKind::Input);

        assert!(ids.rename("old", "new", Some(EntityKind::Task)));
        assert_eq!(ids.get_id("new", EntityKind::Task), node);
        assert_eq!(ids.lookup("old", EntityKind::Task), None);
        assert_eq!(
            ids.resolve(&node).and_then(Resolved::as_entity),
            Some(("new", EntityKind::Task))
        );
        assert_eq!(ids.get_handle_id("new", "in", HandleKind::Input), handle);
        assert_eq!(ids.lookup_handle("old", "in", HandleKind::Input), None);
    }

    #[test]
    fn rename_without_kind_searches_all_kinds() {
        let mut ids = IdentityManager::new();
        let input = ids.get_id("x", EntityKind::Input);
        let output = ids.get_id("x", EntityKind::Output);
        assert!(ids.rename("x", "y", None));
        assert_eq!(ids.lookup("y", EntityKind::Input), Some(&input));
        assert_eq!(ids.lookup("y", EntityKind::Output), Some(&output));
        assert!(!ids.rename("missing", "z", None));
    }

    #[test]
    fn rename_onto_existing_name_discards_displaced_mapping() {
        let mut ids = IdentityManager::new();
        let a = ids.get_id("a", EntityKind::Task);
        let b = ids.get_id("b", EntityKind::Task);
        ids.get_handle_id("b", "in", HandleKind::Input);
        assert!(ids.rename("a", "b", Some(EntityKind::Task)));
        assert_eq!(ids.lookup("b", EntityKind::Task), Some(&a));
        assert_eq!(ids.resolve(&b), None);
        assert_eq!(ids.lookup_handle("b", "in", HandleKind::Input), None);
    }

    #[test]
    fn remove_drops_entity_and_handles() {
        let mut ids = IdentityManager::new();
        let node = ids.get_id("t", EntityKind::Task);
        let handle = ids.get_handle_id("t", "out", HandleKind::Output);
        assert!(ids.remove("t", None));
        assert_eq!(ids.resolve(&node), None);
        assert_eq!(ids.resolve(&handle), None);
        assert!(!ids.remove("t", Some(EntityKind::Task)));
        assert!(ids.is_empty());
    }

    #[test]
    fn sync_prunes_stale_and_keeps_live_ids() {
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let lr = ids.get_id("lr", EntityKind::Input);
        let model = ids.get_id("model", EntityKind::Output);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let gone = ids.get_id("deleted", EntityKind::Task);
        let bogus_handle = ids.get_handle_id("t1", "nope", HandleKind::Input);

        ids.sync(&spec());

        assert_eq!(ids.get_id("t1", EntityKind::Task), t1);
        assert_eq!(ids.get_id("lr", EntityKind::Input), lr);
        assert_eq!(ids.get_id("model", EntityKind::Output), model);
        assert_eq!(ids.get_handle_id("t1", "o1", HandleKind::Output), o1);
        assert_eq!(ids.resolve(&gone), None);
        assert_eq!(ids.resolve(&bogus_handle), None);
    }

    #[test]
    fn sync_keeps_wired_handles_of_unresolved_components() {
        let graph = GraphSpec::new().with_task(
            "remote",
            TaskSpec::new(pipegraph_core::ComponentReference::from_url("https://x/c.yaml"))
                .with_argument("data", ArgumentType::graph_input("lr")),
        );
        let spec = ComponentSpec::graph("p", graph).with_input(InputSpec::new("lr"));

        let mut ids = IdentityManager::new();
        let handle = ids.get_handle_id("remote", "data", HandleKind::Input);
        ids.sync(&spec);
        assert!(ids.resolve(&handle).is_some());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut ids = IdentityManager::new();
        ids.get_id("t", EntityKind::Task);
        ids.get_handle_id("t", "x", HandleKind::Input);
        assert_eq!(ids.len(), 2);
        ids.clear();
        assert!(ids.is_empty());
    }
}
