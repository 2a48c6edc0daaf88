//! Merged task graph for structural analysis.
//!
//! The graph has one node per distinct task id and two kinds of edges:
//! decomposition edges from a parent to each child, and dependency edges
//! from a task to each dependency id that resolves within the same tree.
//! Both kinds share one adjacency relation, so a pair of tasks is joined by
//! at most one edge.

use crate::core::task::NodeMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why an edge exists in the merged graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Parent to child containment.
    Decomposition,
    /// Task to a task it depends on.
    Dependency,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Decomposition => write!(f, "decomposition"),
            EdgeKind::Dependency => write!(f, "dependency"),
        }
    }
}

/// Directed graph over task ids, rebuilt for every evaluation.
pub struct TaskGraph<'a> {
    graph: DiGraph<&'a str, EdgeKind>,
}

impl<'a> TaskGraph<'a> {
    /// Build the merged graph from an id-keyed node view.
    ///
    /// Node indices follow the traversal order of `nodes`. Dependencies on
    /// ids outside the tree are dropped.
    pub fn build(nodes: &NodeMap<'a>) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::with_capacity(nodes.len());

        for id in nodes.ids() {
            index.insert(id, graph.add_node(id));
        }

        for (id, node) in nodes.iter() {
            let from = index[id];
            for child in &node.children {
                if let Some(&to) = index.get(child.id.as_str()) {
                    if graph.find_edge(from, to).is_none() {
                        graph.add_edge(from, to, EdgeKind::Decomposition);
                    }
                }
            }
            for dep in node.dependency_ids() {
                if let Some(&to) = index.get(dep.as_str()) {
                    if graph.find_edge(from, to).is_none() {
                        graph.add_edge(from, to, EdgeKind::Dependency);
                    }
                }
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every edge as `(source id, target id, kind)`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&'a str, &'a str, EdgeKind)> + '_ {
        self.graph.raw_edges().iter().map(move |edge| {
            (
                self.graph[edge.source()],
                self.graph[edge.target()],
                edge.weight,
            )
        })
    }

    /// Whether any directed cycle exists, self-loops included.
    ///
    /// Depth-first search with a visited set and an on-stack set. Roots are
    /// tried in node order; the search stops at the first back edge.
    pub fn has_cycle(&self) -> bool {
        let n = self.graph.node_count();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];

        for root in self.graph.node_indices() {
            if visited[root.index()] {
                continue;
            }

            // Each frame holds a node and its not-yet-explored successors.
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
            visited[root.index()] = true;
            on_stack[root.index()] = true;
            stack.push((root, self.successors(root)));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = (frame.0, frame.1.pop());
                match next {
                    Some(next) => {
                        if on_stack[next.index()] {
                            return true;
                        }
                        if !visited[next.index()] {
                            visited[next.index()] = true;
                            on_stack[next.index()] = true;
                            let successors = self.successors(next);
                            stack.push((next, successors));
                        }
                    }
                    None => {
                        on_stack[node.index()] = false;
                        stack.pop();
                    }
                }
            }
        }

        false
    }

    /// Successors sorted so that popping from the back yields node order.
    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        out.sort_by_key(|idx| std::cmp::Reverse(idx.index()));
        out
    }
}

impl std::fmt::Debug for TaskGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
