//! Data-flow graph of one graph level.
//!
//! Tasks are nodes; an edge `a -> b` means `b` reads an output of `a`
//! (through an argument or an `isEnabled` operand). A valid pipeline level is
//! a DAG.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use pipegraph_core::{ArgumentType, GraphSpec};

/// Builds the sibling data-flow graph. References to unknown tasks are
/// ignored here; they are reported separately.
pub fn dataflow_graph(graph: &GraphSpec) -> DiGraphMap<&str, ()> {
    let mut flow = DiGraphMap::new();
    for task_id in graph.task_ids() {
        flow.add_node(task_id);
    }
    for (task_id, task) in &graph.tasks {
        let operands = task
            .is_enabled
            .as_ref()
            .map(|predicate| predicate.operands())
            .unwrap_or_default();
        for argument in task.arguments.values().chain(operands) {
            if let ArgumentType::TaskOutput(arg) = argument {
                if let Some((upstream, _)) = graph.tasks.get_key_value(&arg.task_output.task_id) {
                    flow.add_edge(upstream.as_str(), task_id.as_str(), ());
                }
            }
        }
    }
    flow
}

/// Groups of tasks that form data-flow cycles, each listed in declaration
/// order. Self-reading tasks form a group of one.
pub fn find_cycles(graph: &GraphSpec) -> Vec<Vec<String>> {
    let flow = dataflow_graph(graph);
    let order = |id: &str| graph.tasks.get_index_of(id).unwrap_or(usize::MAX);

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&flow)
        .into_iter()
        .filter(|scc| scc.len() > 1 || flow.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_by_key(|id| order(*id));
            scc.into_iter().map(str::to_string).collect()
        })
        .collect();
    cycles.sort_by_key(|scc| order(scc[0].as_str()));
    cycles
}

/// Task ids in an order where every task follows its upstream tasks, or
/// `None` when the level has a cycle.
pub fn execution_order(graph: &GraphSpec) -> Option<Vec<String>> {
    let flow = dataflow_graph(graph);
    toposort(&flow, None)
        .ok()
        .map(|order| order.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::{BinaryOperands, ComponentSpec, Predicate, TaskSpec};

    fn task() -> TaskSpec {
        TaskSpec::from_spec(ComponentSpec::container("c", "img"))
    }

    fn reads(upstream: &str) -> TaskSpec {
        task().with_argument("in", ArgumentType::task_output(upstream, "out"))
    }

    #[test]
    fn acyclic_level_has_no_cycles() {
        let graph = GraphSpec::new()
            .with_task("a", task())
            .with_task("b", reads("a"))
            .with_task("c", reads("b"));
        assert!(find_cycles(&graph).is_empty());
        assert_eq!(
            execution_order(&graph),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn detects_loops_and_self_reads() {
        let graph = GraphSpec::new()
            .with_task("a", reads("c"))
            .with_task("b", reads("a"))
            .with_task("c", reads("b"))
            .with_task("d", reads("d"))
            .with_task("e", reads("missing"));
        assert_eq!(
            find_cycles(&graph),
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string()],
            ]
        );
        assert_eq!(execution_order(&graph), None);
    }

    #[test]
    fn predicate_operands_are_edges() {
        let mut gated = task();
        gated.is_enabled = Some(Predicate::Equal(BinaryOperands {
            op1: ArgumentType::task_output("b", "flag"),
            op2: ArgumentType::literal("true"),
        }));
        let graph = GraphSpec::new().with_task("a", gated).with_task("b", reads("a"));
        assert_eq!(find_cycles(&graph).len(), 1);
    }
}
