//! Property tests over generated nested pipelines.

use pipegraph_core::{
    ArgumentType, ComponentSpec, EntityKind, GraphSpec, InputSpec, OutputSpec, TaskOutputArgument,
    TaskSpec,
};
use pipegraph_edit::hierarchy::validate;
use pipegraph_edit::{
    connect, flatten, reconstruct, reconstruct_component, ConnectionRequest, IdentityManager,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A task shape; the flag asks for a dotted name.
#[derive(Debug, Clone)]
enum Shape {
    Leaf(bool),
    Sub(bool, Vec<Shape>),
}

impl Shape {
    fn dotted(&self) -> bool {
        match self {
            Shape::Leaf(dotted) | Shape::Sub(dotted, _) => *dotted,
        }
    }
}

fn shapes() -> impl Strategy<Value = Vec<Shape>> {
    let tree = any::<bool>()
        .prop_map(Shape::Leaf)
        .prop_recursive(3, 32, 4, |inner| {
            (any::<bool>(), prop::collection::vec(inner, 0..4))
                .prop_map(|(dotted, children)| Shape::Sub(dotted, children))
        });
    prop::collection::vec(tree, 0..6)
}

/// Task names of one level. A dotted name `t{i-1}.t0` spells the same dotted
/// path as task `t0` nested in the previous sibling.
fn names(shapes: &[Shape]) -> Vec<String> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| match i {
            0 => "t0".to_string(),
            _ if shape.dotted() => format!("t{}.t0", i - 1),
            _ => format!("t{}", i),
        })
        .collect()
}

fn leaf(name: &str) -> TaskSpec {
    TaskSpec::from_spec(
        ComponentSpec::container(name, "img")
            .with_input(InputSpec::new("in"))
            .with_output(OutputSpec::new("out")),
    )
}

/// Builds one graph level: one task per shape, each wired to its
/// predecessor, and the last task exported as `out`.
fn build(shapes: &[Shape]) -> GraphSpec {
    let names = names(shapes);
    let mut graph = GraphSpec::new();
    for (i, shape) in shapes.iter().enumerate() {
        let id = names[i].clone();
        let mut task = match shape {
            Shape::Leaf(_) => leaf(&id),
            Shape::Sub(_, children) => TaskSpec::from_spec(
                ComponentSpec::graph(id.clone(), build(children))
                    .with_input(InputSpec::new("in"))
                    .with_output(OutputSpec::new("out")),
            ),
        };
        if i > 0 {
            let upstream = ArgumentType::task_output(names[i - 1].as_str(), "out");
            task = task.with_argument("in", upstream);
        }
        graph = graph.with_task(id, task);
    }
    if let Some(last) = names.last() {
        graph
            .output_values
            .insert("out".into(), TaskOutputArgument::new(last.as_str(), "out"));
    }
    graph
}

fn count(shapes: &[Shape]) -> usize {
    shapes
        .iter()
        .map(|shape| match shape {
            Shape::Leaf(_) => 1,
            Shape::Sub(_, children) => 1 + count(children),
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn flatten_then_reconstruct_is_identity(shapes in shapes()) {
        let spec = ComponentSpec::graph("root", build(&shapes));
        let index = flatten(&spec);

        prop_assert_eq!(index.len(), count(&shapes));
        prop_assert!(validate(&index).is_empty());
        prop_assert_eq!(&reconstruct(&index).unwrap(), spec.graph_spec().unwrap());
        prop_assert_eq!(reconstruct_component(&index).unwrap(), spec);
    }

    #[test]
    fn removing_any_task_keeps_index_consistent(
        shapes in shapes(),
        pick in any::<prop::sample::Index>(),
    ) {
        let spec = ComponentSpec::graph("root", build(&shapes));
        let index = flatten(&spec);
        prop_assume!(!index.is_empty());

        let ids: Vec<String> = index.iter().map(|t| t.id.clone()).collect();
        let victim = &ids[pick.index(ids.len())];
        let next = index.remove_task(victim).unwrap();

        prop_assert!(!next.contains(victim));
        prop_assert!(next.descendants(victim).is_empty());
        prop_assert!(validate(&next).is_empty());
        let rebuilt = flatten(&spec.with_graph(reconstruct(&next).unwrap()));
        prop_assert_eq!(rebuilt.len(), next.len());
    }

    #[test]
    fn visual_ids_survive_renames(names in prop::collection::hash_set("[a-z]{1,6}", 1..8)) {
        let mut ids = IdentityManager::new();
        let names: Vec<String> = names.into_iter().collect();
        let allocated: Vec<_> = names.iter().map(|n| ids.get_id(n, EntityKind::Task)).collect();

        for (name, id) in names.iter().zip(&allocated) {
            prop_assert_eq!(&ids.get_id(name, EntityKind::Task), id);
        }

        for (name, id) in names.iter().zip(&allocated) {
            let renamed = format!("{}_renamed", name);
            prop_assert!(ids.rename(name, &renamed, Some(EntityKind::Task)));
            prop_assert_eq!(&ids.get_id(&renamed, EntityKind::Task), id);
            prop_assert_eq!(
                ids.resolve(id).and_then(|r| r.as_entity()),
                Some((renamed.as_str(), EntityKind::Task))
            );
        }
    }

    #[test]
    fn self_loops_never_change_the_graph(
        name in "[a-z]{1,6}",
        with_source in any::<bool>(),
        with_target in any::<bool>(),
    ) {
        let graph = GraphSpec::new().with_task(name.clone(), leaf(&name));
        let mut ids = IdentityManager::new();
        let node = ids.get_id(&name, EntityKind::Task);
        let request = ConnectionRequest {
            source: node.clone(),
            source_handle: with_source
                .then(|| ids.get_handle_id(&name, "out", pipegraph_core::HandleKind::Output)),
            target: node,
            target_handle: with_target
                .then(|| ids.get_handle_id(&name, "in", pipegraph_core::HandleKind::Input)),
        };
        prop_assert!(connect(&ids, &graph, &request).is_err());
    }
}
