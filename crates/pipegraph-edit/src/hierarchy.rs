//! Flattening and reconstruction of nested subgraphs.
//!
//! [`flatten`] turns an arbitrarily nested component into a [`FlatIndex`]:
//! one [`FlatTask`] per task at every depth, keyed by a dotted path below the
//! synthetic [`ROOT`] (`root.subgraph1.task2`). The index answers "which
//! tasks are visible when navigating into X" without walking the tree, and
//! [`reconstruct`] rebuilds the canonical nested form from it.
//!
//! Task names are free strings, so `.` and `\` inside a segment are escaped
//! with a backslash: the top-level task `a.b` is `root.a\.b`, distinct from
//! task `b` nested in subgraph `a` (`root.a.b`).
//!
//! Round-trip law: `reconstruct(&flatten(spec))` equals `spec`'s graph, with
//! sibling order preserved at every level.
//!
//! Records store their `TaskSpec` with the nested tasks stripped; the nested
//! graph's `outputValues` stay in the record so reconstruction can restore
//! them. The index's own mutation helpers keep the law intact and never
//! partially apply a rejected change.

use std::collections::HashMap;

use indexmap::IndexMap;
use pipegraph_core::{ComponentSpec, CoreError, GraphSpec, TaskSpec};
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::EditError;

/// Name of the synthetic root path segment.
pub const ROOT: &str = "root";

/// Path segments below [`ROOT`].
pub type TaskPath = SmallVec<[String; 4]>;

/// Dotted id for `segments`, e.g. `root.a.b`. Distinct paths always give
/// distinct ids.
pub fn path_id(segments: &[String]) -> String {
    let mut id = String::from(ROOT);
    for segment in segments {
        id.push('.');
        for ch in segment.chars() {
            if ch == '.' || ch == '\\' {
                id.push('\\');
            }
            id.push(ch);
        }
    }
    id
}

/// One task of the flattened hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTask {
    /// Dotted path id.
    pub id: String,
    /// Path segments below the root; the last one is the local task name.
    pub path: TaskPath,
    /// `path.len() - 1`; top-level tasks have depth 0.
    pub depth: usize,
    /// Id of the enclosing subgraph task; `None` at depth 0.
    pub parent: Option<String>,
    pub is_subgraph: bool,
    /// The task with any nested tasks stripped.
    #[serde(skip)]
    pub task: TaskSpec,
}

impl FlatTask {
    /// Local task name within its graph level.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Path-addressable index over a nested component.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    tasks: IndexMap<String, FlatTask>,
    spec: ComponentSpec,
    /// Top-level graph with tasks stripped; `None` for container components.
    root: Option<GraphSpec>,
}

/// Strips nested tasks from subgraph tasks, keeping their output values.
fn strip(task: &TaskSpec) -> TaskSpec {
    match task.subgraph() {
        Some(graph) => task.with_subgraph(GraphSpec {
            tasks: IndexMap::new(),
            output_values: graph.output_values.clone(),
        }),
        None => task.clone(),
    }
}

fn visit(
    graph: &GraphSpec,
    prefix: &[String],
    parent: Option<&str>,
    out: &mut IndexMap<String, FlatTask>,
) {
    for (name, task) in &graph.tasks {
        let mut path: TaskPath = prefix.iter().cloned().collect();
        path.push(name.clone());
        let id = path_id(&path);
        let record = FlatTask {
            id: id.clone(),
            depth: path.len() - 1,
            parent: parent.map(str::to_string),
            is_subgraph: task.is_subgraph(),
            task: strip(task),
            path: path.clone(),
        };
        out.insert(id.clone(), record);
        if let Some(nested) = task.subgraph() {
            visit(nested, &path, Some(&id), out);
        }
    }
}

/// Flattens `spec` into a path-addressable index. Container components
/// produce an empty index.
pub fn flatten(spec: &ComponentSpec) -> FlatIndex {
    let mut tasks = IndexMap::new();
    let root = spec.graph_spec().map(|graph| {
        visit(graph, &[], None, &mut tasks);
        GraphSpec {
            tasks: IndexMap::new(),
            output_values: graph.output_values.clone(),
        }
    });
    tracing::debug!(tasks = tasks.len(), "flattened component");
    FlatIndex {
        tasks,
        spec: spec.clone(),
        root,
    }
}

/// Rebuilds the top-level nested graph.
///
/// Fails with [`CoreError::NotAGraph`] when the index was built from a
/// container component; callers are expected to check first.
pub fn reconstruct(index: &FlatIndex) -> Result<GraphSpec, CoreError> {
    let root = index.root.as_ref().ok_or_else(|| CoreError::NotAGraph {
        name: index.spec.display_name().to_string(),
    })?;

    let mut children: HashMap<Option<&str>, Vec<&FlatTask>> = HashMap::new();
    for record in index.tasks.values() {
        children
            .entry(record.parent.as_deref())
            .or_default()
            .push(record);
    }

    Ok(rebuild_level(&children, None, root.output_values.clone()))
}

fn rebuild_level(
    children: &HashMap<Option<&str>, Vec<&FlatTask>>,
    parent: Option<&str>,
    output_values: IndexMap<String, pipegraph_core::TaskOutputArgument>,
) -> GraphSpec {
    let mut graph = GraphSpec {
        tasks: IndexMap::new(),
        output_values,
    };
    for record in children.get(&parent).into_iter().flatten() {
        let task = match record.task.subgraph() {
            Some(stub) if record.is_subgraph => {
                let nested = rebuild_level(
                    children,
                    Some(record.id.as_str()),
                    stub.output_values.clone(),
                );
                record.task.with_subgraph(nested)
            }
            _ => record.task.clone(),
        };
        graph.tasks.insert(record.name().to_string(), task);
    }
    graph
}

/// Rebuilds the full component, splicing the reconstructed graph into the
/// original spec.
pub fn reconstruct_component(index: &FlatIndex) -> Result<ComponentSpec, CoreError> {
    let graph = reconstruct(index)?;
    Ok(index.spec.with_graph(graph))
}

impl FlatIndex {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&FlatTask> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatTask> {
        self.tasks.values()
    }

    /// The component the index was built from.
    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    /// Whether the indexed component is graph-implemented.
    pub fn is_graph(&self) -> bool {
        self.root.is_some()
    }

    /// Tasks visible when navigating into `parent` (`None` = top level).
    pub fn children(&self, parent: Option<&str>) -> Vec<&FlatTask> {
        self.tasks
            .values()
            .filter(|record| record.parent.as_deref() == parent)
            .collect()
    }

    /// Every task nested anywhere below `id`.
    pub fn descendants(&self, id: &str) -> Vec<&FlatTask> {
        let Some(ancestor) = self.tasks.get(id) else {
            return Vec::new();
        };
        self.tasks
            .values()
            .filter(|record| is_below(&record.path, &ancestor.path))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutation helpers (each returns a new index)
    // -----------------------------------------------------------------------

    /// Replaces the task at `id`. Descendants are re-derived from `task`'s
    /// nested graph, so turning a subgraph into a leaf drops them.
    pub fn update_task(&self, id: &str, task: TaskSpec) -> Result<FlatIndex, EditError> {
        let record = self.tasks.get(id).ok_or_else(|| EditError::TaskNotFound {
            task_id: id.to_string(),
        })?;
        let path = record.path.clone();
        let parent = record.parent.clone();

        let mut next = self.clone();
        next.remove_descendants(id);
        let updated = FlatTask {
            id: id.to_string(),
            depth: path.len() - 1,
            parent,
            is_subgraph: task.is_subgraph(),
            task: strip(&task),
            path: path.clone(),
        };
        next.tasks.insert(id.to_string(), updated);
        if let Some(nested) = task.subgraph() {
            visit(nested, &path, Some(id), &mut next.tasks);
        }
        Ok(next)
    }

    /// Adds `task` as `name` under `parent` (`None` = top level).
    ///
    /// Rejected when the index is not a graph, `parent` does not exist or is
    /// not a subgraph, or a sibling already uses `name`.
    pub fn add_task(
        &self,
        parent: Option<&str>,
        name: &str,
        task: TaskSpec,
    ) -> Result<FlatIndex, EditError> {
        if self.root.is_none() {
            return Err(CoreError::NotAGraph {
                name: self.spec.display_name().to_string(),
            }
            .into());
        }

        let mut path: TaskPath = match parent {
            Some(parent_id) => {
                let record = self
                    .tasks
                    .get(parent_id)
                    .ok_or_else(|| EditError::ParentNotFound {
                        id: parent_id.to_string(),
                    })?;
                if !record.is_subgraph {
                    return Err(EditError::NotASubgraph {
                        id: parent_id.to_string(),
                    });
                }
                record.path.clone()
            }
            None => TaskPath::new(),
        };
        path.push(name.to_string());

        let id = path_id(&path);
        if self.tasks.contains_key(&id) {
            return Err(EditError::NameCollision {
                name: name.to_string(),
                scope: parent.unwrap_or(ROOT).to_string(),
            });
        }

        let mut next = self.clone();
        next.tasks.insert(
            id.clone(),
            FlatTask {
                id: id.clone(),
                depth: path.len() - 1,
                parent: parent.map(str::to_string),
                is_subgraph: task.is_subgraph(),
                task: strip(&task),
                path: path.clone(),
            },
        );
        if let Some(nested) = task.subgraph() {
            visit(nested, &path, Some(&id), &mut next.tasks);
        }
        Ok(next)
    }

    /// Removes the task at `id` and, transitively, everything nested in it.
    /// Sibling arguments and output values that read the removed task are
    /// cleared so the level stays referentially intact.
    pub fn remove_task(&self, id: &str) -> Result<FlatIndex, EditError> {
        let record = self.tasks.get(id).ok_or_else(|| EditError::TaskNotFound {
            task_id: id.to_string(),
        })?;
        let name = record.name().to_string();
        let parent = record.parent.clone();

        let mut next = self.clone();
        next.remove_descendants(id);
        next.tasks.shift_remove(id);

        for sibling in next.tasks.values_mut() {
            if sibling.parent != parent {
                continue;
            }
            sibling.task.arguments.retain(|_, argument| {
                argument
                    .as_task_output()
                    .map_or(true, |output| output.task_id != name)
            });
        }

        match parent {
            Some(parent_id) => {
                if let Some(owner) = next.tasks.get_mut(&parent_id) {
                    if let Some(stub) = owner.task.subgraph() {
                        let mut stub = stub.clone();
                        stub.output_values
                            .retain(|_, value| value.task_output.task_id != name);
                        owner.task = owner.task.with_subgraph(stub);
                    }
                }
            }
            None => {
                if let Some(root) = next.root.as_mut() {
                    root.output_values
                        .retain(|_, value| value.task_output.task_id != name);
                }
            }
        }
        Ok(next)
    }

    fn remove_descendants(&mut self, id: &str) {
        let Some(ancestor) = self.tasks.get(id).map(|record| record.path.clone()) else {
            return;
        };
        self.tasks.retain(|_, record| !is_below(&record.path, &ancestor));
    }
}

/// Whether `path` lies strictly below `ancestor`, compared segment-wise.
fn is_below(path: &[String], ancestor: &[String]) -> bool {
    path.len() > ancestor.len() && path.starts_with(ancestor)
}

/// Reports path/depth/parent/subgraph inconsistencies in `index`.
///
/// A diagnostic aid for tests and tooling; an index produced by [`flatten`]
/// and the mutation helpers always validates cleanly.
pub fn validate(index: &FlatIndex) -> Vec<String> {
    let mut problems = Vec::new();
    for (key, record) in &index.tasks {
        if record.path.is_empty() {
            problems.push(format!("{}: empty path", key));
            continue;
        }
        let expected_id = path_id(&record.path);
        if *key != record.id || record.id != expected_id {
            problems.push(format!(
                "{}: id '{}' does not match path '{}'",
                key, record.id, expected_id
            ));
        }
        if record.depth != record.path.len() - 1 {
            problems.push(format!(
                "{}: depth {} but path has {} segments",
                key,
                record.depth,
                record.path.len()
            ));
        }
        let expected_parent = (record.path.len() > 1)
            .then(|| path_id(&record.path[..record.path.len() - 1]));
        if record.parent != expected_parent {
            problems.push(format!(
                "{}: parent {:?} but path implies {:?}",
                key, record.parent, expected_parent
            ));
        }
        if let Some(parent) = &record.parent {
            match index.tasks.get(parent) {
                None => problems.push(format!("{}: parent '{}' missing", key, parent)),
                Some(owner) if !owner.is_subgraph => {
                    problems.push(format!("{}: parent '{}' is not a subgraph", key, parent))
                }
                Some(_) => {}
            }
        }
        if record.is_subgraph != record.task.is_subgraph() {
            problems.push(format!(
                "{}: subgraph flag {} disagrees with its component",
                key, record.is_subgraph
            ));
        }
    }
    problems
}
