//! Connection and argument resolution.
//!
//! Turns canvas gestures (visual ids) into argument writes on a
//! [`GraphSpec`]. Three patterns are supported:
//!
//! | source | target | write                                                         |
//! |--------|--------|---------------------------------------------------------------|
//! | input  | task   | `target.arguments[target_handle] = graphInput(source)`         |
//! | task   | task   | `target.arguments[target_handle] = taskOutput(source, handle)` |
//! | task   | output | `outputValues[target] = taskOutput(source, source_handle)`     |
//!
//! Every write goes through [`GraphSpec::with_task_argument`] or
//! [`GraphSpec::with_output_value`]. A rejected gesture returns an
//! [`EditError`] and logs a warning; the caller keeps its graph.

use pipegraph_core::{
    ArgumentType, EntityKind, GraphSpec, HandleKind, TaskOutputArgument, VisualId,
};

use crate::error::{EditError, Endpoint};
use crate::identity::{IdentityManager, Resolved};

/// A proposed edge between two canvas nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRequest {
    pub source: VisualId,
    pub source_handle: Option<VisualId>,
    pub target: VisualId,
    pub target_handle: Option<VisualId>,
}

impl ConnectionRequest {
    pub fn new(source: VisualId, target: VisualId) -> Self {
        ConnectionRequest {
            source,
            source_handle: None,
            target,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: VisualId) -> Self {
        self.source_handle = Some(handle);
        self
    }

    pub fn with_target_handle(mut self, handle: VisualId) -> Self {
        self.target_handle = Some(handle);
        self
    }
}

/// Resolves a node id to `(structural_id, kind)`. Handle ids are not nodes.
fn resolve_node<'a>(
    ids: &'a IdentityManager,
    endpoint: Endpoint,
    id: &VisualId,
) -> Result<(&'a str, EntityKind), EditError> {
    ids.resolve(id)
        .and_then(Resolved::as_entity)
        .ok_or_else(|| EditError::UnresolvedNode {
            endpoint,
            id: id.clone(),
        })
}

/// Resolves a handle id to its name, checking it belongs to `parent` and
/// points in `direction`.
fn resolve_handle<'a>(
    ids: &'a IdentityManager,
    endpoint: Endpoint,
    parent: &str,
    direction: HandleKind,
    handle: Option<&VisualId>,
) -> Result<&'a str, EditError> {
    let Some(handle) = handle else {
        return Err(EditError::MissingHandle {
            endpoint,
            node: parent.to_string(),
        });
    };
    match ids.resolve(handle) {
        Some(Resolved::Handle {
            parent_structural_id,
            handle_name,
            handle_kind,
        }) if parent_structural_id == parent && *handle_kind == direction => {
            Ok(handle_name.as_str())
        }
        _ => Err(EditError::UnresolvedHandle {
            endpoint,
            id: handle.clone(),
            parent: parent.to_string(),
        }),
    }
}

fn require_task(graph: &GraphSpec, task_id: &str) -> Result<(), EditError> {
    if graph.contains_task(task_id) {
        Ok(())
    } else {
        Err(EditError::TaskNotFound {
            task_id: task_id.to_string(),
        })
    }
}

/// Rejects handle names the task's resolved component does not declare.
/// Components that are not resolved inline cannot be checked and pass.
fn require_declared(
    graph: &GraphSpec,
    task_id: &str,
    name: &str,
    kind: HandleKind,
) -> Result<(), EditError> {
    let Some(spec) = graph.task(task_id).and_then(|task| task.resolved_spec()) else {
        return Ok(());
    };
    let declared = match kind {
        HandleKind::Input => spec.has_input(name),
        HandleKind::Output => spec.has_output(name),
    };
    if declared {
        Ok(())
    } else {
        Err(EditError::UndeclaredHandle {
            task_id: task_id.to_string(),
            kind,
            name: name.to_string(),
        })
    }
}

fn try_connect(
    ids: &IdentityManager,
    graph: &GraphSpec,
    request: &ConnectionRequest,
) -> Result<GraphSpec, EditError> {
    let (source, source_kind) = resolve_node(ids, Endpoint::Source, &request.source)?;
    let (target, target_kind) = resolve_node(ids, Endpoint::Target, &request.target)?;

    if source == target {
        return Err(EditError::SelfLoop {
            id: source.to_string(),
        });
    }

    match (source_kind, target_kind) {
        (EntityKind::Input, EntityKind::Task) => {
            let input_name = resolve_handle(
                ids,
                Endpoint::Target,
                target,
                HandleKind::Input,
                request.target_handle.as_ref(),
            )?;
            require_task(graph, target)?;
            require_declared(graph, target, input_name, HandleKind::Input)?;
            Ok(graph.with_task_argument(
                target,
                input_name,
                Some(ArgumentType::graph_input(source)),
            ))
        }
        (EntityKind::Task, EntityKind::Task) => {
            let output_name = resolve_handle(
                ids,
                Endpoint::Source,
                source,
                HandleKind::Output,
                request.source_handle.as_ref(),
            )?;
            let input_name = resolve_handle(
                ids,
                Endpoint::Target,
                target,
                HandleKind::Input,
                request.target_handle.as_ref(),
            )?;
            require_task(graph, source)?;
            require_task(graph, target)?;
            require_declared(graph, source, output_name, HandleKind::Output)?;
            require_declared(graph, target, input_name, HandleKind::Input)?;
            Ok(graph.with_task_argument(
                target,
                input_name,
                Some(ArgumentType::task_output(source, output_name)),
            ))
        }
        (EntityKind::Task, EntityKind::Output) => {
            let output_name = resolve_handle(
                ids,
                Endpoint::Source,
                source,
                HandleKind::Output,
                request.source_handle.as_ref(),
            )?;
            require_task(graph, source)?;
            require_declared(graph, source, output_name, HandleKind::Output)?;
            Ok(graph.with_output_value(
                target,
                Some(TaskOutputArgument::new(source, output_name)),
            ))
        }
        (source_kind, target_kind) => Err(EditError::UnsupportedConnection {
            source_kind,
            target_kind,
        }),
    }
}

/// Applies a connection gesture, returning the rewired graph.
pub fn connect(
    ids: &IdentityManager,
    graph: &GraphSpec,
    request: &ConnectionRequest,
) -> Result<GraphSpec, EditError> {
    match try_connect(ids, graph, request) {
        Ok(next) => {
            tracing::debug!(source = %request.source, target = %request.target, "connected");
            Ok(next)
        }
        Err(err) => {
            tracing::warn!(error = %err, "connection rejected");
            Err(err)
        }
    }
}

fn try_disconnect(
    ids: &IdentityManager,
    graph: &GraphSpec,
    target: &VisualId,
    target_handle: Option<&VisualId>,
) -> Result<GraphSpec, EditError> {
    let (structural_id, kind) = resolve_node(ids, Endpoint::Target, target)?;
    match kind {
        EntityKind::Task => {
            let input_name = resolve_handle(
                ids,
                Endpoint::Target,
                structural_id,
                HandleKind::Input,
                target_handle,
            )?;
            Ok(graph.with_task_argument(structural_id, input_name, None))
        }
        EntityKind::Output => Ok(graph.with_output_value(structural_id, None)),
        EntityKind::Input => Err(EditError::NotATarget { kind }),
    }
}

/// Removes the edge ending at `target` (and `target_handle` for tasks).
/// Clearing an entry that is not set succeeds without changes.
pub fn disconnect(
    ids: &IdentityManager,
    graph: &GraphSpec,
    target: &VisualId,
    target_handle: Option<&VisualId>,
) -> Result<GraphSpec, EditError> {
    try_disconnect(ids, graph, target, target_handle).inspect_err(|err| {
        tracing::warn!(error = %err, "disconnect rejected");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::{ComponentReference, ComponentSpec, InputSpec, OutputSpec, TaskSpec};

    /// `t1: <image A, outputs [o1]>`, `t2: <image B, inputs [i1]>`, no wiring.
    fn two_tasks() -> GraphSpec {
        let a = ComponentSpec::container("A", "image-a").with_output(OutputSpec::new("o1"));
        let b = ComponentSpec::container("B", "image-b").with_input(InputSpec::new("i1"));
        GraphSpec::new()
            .with_task("t1", TaskSpec::from_spec(a))
            .with_task("t2", TaskSpec::from_spec(b))
    }

    #[test]
    fn task_to_task_then_disconnect() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let t2 = ids.get_id("t2", EntityKind::Task);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let i1 = ids.get_handle_id("t2", "i1", HandleKind::Input);

        let request = ConnectionRequest::new(t1, t2.clone())
            .with_source_handle(o1)
            .with_target_handle(i1.clone());
        let connected = connect(&ids, &graph, &request).unwrap();
        assert_eq!(
            connected.tasks["t2"].arguments["i1"],
            ArgumentType::task_output("t1", "o1")
        );
        assert!(graph.tasks["t2"].arguments.is_empty(), "input untouched");

        let cleared = disconnect(&ids, &connected, &t2, Some(&i1)).unwrap();
        assert!(cleared.tasks["t2"].arguments.is_empty());

        // Clearing again is a no-op.
        assert_eq!(disconnect(&ids, &cleared, &t2, Some(&i1)).unwrap(), cleared);
    }

    #[test]
    fn input_to_task_writes_graph_input() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let lr = ids.get_id("lr", EntityKind::Input);
        let t2 = ids.get_id("t2", EntityKind::Task);
        let i1 = ids.get_handle_id("t2", "i1", HandleKind::Input);

        let request = ConnectionRequest::new(lr, t2).with_target_handle(i1);
        let next = connect(&ids, &graph, &request).unwrap();
        assert_eq!(
            next.tasks["t2"].arguments["i1"],
            ArgumentType::graph_input("lr")
        );
    }

    #[test]
    fn task_to_output_writes_output_value_and_disconnects() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let model = ids.get_id("model", EntityKind::Output);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);

        let next = connect(
            &ids,
            &graph,
            &ConnectionRequest::new(t1, model.clone()).with_source_handle(o1),
        )
        .unwrap();
        assert_eq!(
            next.output_values["model"],
            TaskOutputArgument::new("t1", "o1")
        );

        let cleared = disconnect(&ids, &next, &model, None).unwrap();
        assert!(cleared.output_values.is_empty());
    }

    #[test]
    fn self_loop_is_rejected_for_any_handles() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let i1 = ids.get_handle_id("t1", "i1", HandleKind::Input);

        for (from, to) in [
            (None, None),
            (Some(o1.clone()), None),
            (None, Some(i1.clone())),
            (Some(o1.clone()), Some(i1.clone())),
        ] {
            let request = ConnectionRequest {
                source: t1.clone(),
                source_handle: from,
                target: t1.clone(),
                target_handle: to,
            };
            assert_eq!(
                connect(&ids, &graph, &request),
                Err(EditError::SelfLoop { id: "t1".into() })
            );
        }
    }

    #[test]
    fn unresolved_endpoints_are_rejected() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t2 = ids.get_id("t2", EntityKind::Task);
        let stale = VisualId::new("task_stale");

        let err = connect(&ids, &graph, &ConnectionRequest::new(stale.clone(), t2)).unwrap_err();
        assert_eq!(
            err,
            EditError::UnresolvedNode {
                endpoint: Endpoint::Source,
                id: stale
            }
        );

        // A handle id is not a node id.
        let handle = ids.get_handle_id("t2", "i1", HandleKind::Input);
        let t1 = ids.get_id("t1", EntityKind::Task);
        let err = connect(&ids, &graph, &ConnectionRequest::new(t1, handle)).unwrap_err();
        assert!(matches!(
            err,
            EditError::UnresolvedNode {
                endpoint: Endpoint::Target,
                ..
            }
        ));
    }

    #[test]
    fn handles_must_exist_and_belong_to_their_endpoint() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let t2 = ids.get_id("t2", EntityKind::Task);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let i1 = ids.get_handle_id("t2", "i1", HandleKind::Input);

        // Missing target handle.
        let err = connect(
            &ids,
            &graph,
            &ConnectionRequest::new(t1.clone(), t2.clone()).with_source_handle(o1.clone()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EditError::MissingHandle {
                endpoint: Endpoint::Target,
                node: "t2".into()
            }
        );

        // Source handle owned by the target task.
        let err = connect(
            &ids,
            &graph,
            &ConnectionRequest::new(t1.clone(), t2.clone())
                .with_source_handle(i1.clone())
                .with_target_handle(i1.clone()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EditError::UnresolvedHandle {
                endpoint: Endpoint::Source,
                ..
            }
        ));

        // Output handle used as a target handle.
        let foreign = ids.get_handle_id("t2", "o1", HandleKind::Output);
        let err = connect(
            &ids,
            &graph,
            &ConnectionRequest::new(t1, t2).with_source_handle(o1).with_target_handle(foreign),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EditError::UnresolvedHandle {
                endpoint: Endpoint::Target,
                ..
            }
        ));
    }

    #[test]
    fn unsupported_patterns_are_rejected() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let lr = ids.get_id("lr", EntityKind::Input);
        let model = ids.get_id("model", EntityKind::Output);
        let t1 = ids.get_id("t1", EntityKind::Task);

        assert_eq!(
            connect(&ids, &graph, &ConnectionRequest::new(lr.clone(), model.clone())),
            Err(EditError::UnsupportedConnection {
                source_kind: EntityKind::Input,
                target_kind: EntityKind::Output
            })
        );
        assert_eq!(
            connect(&ids, &graph, &ConnectionRequest::new(model, t1.clone())),
            Err(EditError::UnsupportedConnection {
                source_kind: EntityKind::Output,
                target_kind: EntityKind::Task
            })
        );
        assert_eq!(
            disconnect(&ids, &graph, &lr, None),
            Err(EditError::NotATarget {
                kind: EntityKind::Input
            })
        );
    }

    #[test]
    fn undeclared_handle_names_are_rejected() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let t2 = ids.get_id("t2", EntityKind::Task);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let typo = ids.get_handle_id("t2", "typo", HandleKind::Input);

        let request = ConnectionRequest::new(t1.clone(), t2)
            .with_source_handle(o1)
            .with_target_handle(typo);
        assert_eq!(
            connect(&ids, &graph, &request),
            Err(EditError::UndeclaredHandle {
                task_id: "t2".into(),
                kind: HandleKind::Input,
                name: "typo".into()
            })
        );

        let model = ids.get_id("model", EntityKind::Output);
        let missing = ids.get_handle_id("t1", "o9", HandleKind::Output);
        let request = ConnectionRequest::new(t1, model).with_source_handle(missing);
        assert!(matches!(
            connect(&ids, &graph, &request),
            Err(EditError::UndeclaredHandle {
                kind: HandleKind::Output,
                ..
            })
        ));
    }

    #[test]
    fn unresolved_components_accept_any_handle() {
        let remote = TaskSpec::new(ComponentReference::from_url("https://x/c.yaml"));
        let graph = two_tasks().with_task("remote", remote);
        let mut ids = IdentityManager::new();
        let t1 = ids.get_id("t1", EntityKind::Task);
        let target = ids.get_id("remote", EntityKind::Task);
        let o1 = ids.get_handle_id("t1", "o1", HandleKind::Output);
        let anything = ids.get_handle_id("remote", "anything", HandleKind::Input);

        let request = ConnectionRequest::new(t1, target)
            .with_source_handle(o1)
            .with_target_handle(anything);
        let next = connect(&ids, &graph, &request).unwrap();
        assert_eq!(
            next.tasks["remote"].arguments["anything"],
            ArgumentType::task_output("t1", "o1")
        );
    }

    #[test]
    fn stale_task_is_rejected() {
        let graph = two_tasks();
        let mut ids = IdentityManager::new();
        let lr = ids.get_id("lr", EntityKind::Input);
        let gone = ids.get_id("gone", EntityKind::Task);
        let handle = ids.get_handle_id("gone", "x", HandleKind::Input);

        assert_eq!(
            connect(&ids, &graph, &ConnectionRequest::new(lr, gone).with_target_handle(handle)),
            Err(EditError::TaskNotFound {
                task_id: "gone".into()
            })
        );
    }
}
