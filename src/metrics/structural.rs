//! Structural metrics: acyclicity, hierarchy consistency, hierarchy balance.
//!
//! All three are total over any finite tree and never call out.

use super::{EvaluationResult, MetricDetails};
use crate::core::{collect_all_nodes, collect_depths, TaskGraph, TaskNode};

/// Child-count variance at or above which balance scores 0.
pub const BALANCE_MAX_VARIANCE: f64 = 5.0;

/// 1.0 when the merged graph has no directed cycle, 0.0 otherwise.
pub fn acyclicity(root: &TaskNode) -> EvaluationResult {
    let nodes = collect_all_nodes(root);
    let has_cycle = TaskGraph::build(&nodes).has_cycle();
    let score = if has_cycle { 0.0 } else { 1.0 };
    EvaluationResult::new(score, MetricDetails::Acyclicity { has_cycle })
}

/// Share of merged-graph edges that point strictly deeper into the tree.
///
/// Decomposition edges always qualify; a dependency on a sibling or on an
/// ancestor does not. A graph without edges scores 1.0.
pub fn hierarchy_consistency(root: &TaskNode) -> EvaluationResult {
    let nodes = collect_all_nodes(root);
    let depths = collect_depths(root);
    let graph = TaskGraph::build(&nodes);

    let mut total_edges = 0usize;
    let mut consistent_edges = 0usize;
    for (from, to, _) in graph.edges() {
        total_edges += 1;
        if depths[to] > depths[from] {
            consistent_edges += 1;
        }
    }

    let score = if total_edges == 0 {
        1.0
    } else {
        consistent_edges as f64 / total_edges as f64
    };

    EvaluationResult::new(
        score,
        MetricDetails::Hierarchy {
            consistent_edges,
            total_edges,
        },
    )
}

/// How evenly parent tasks split their work.
///
/// Uses the population variance of child counts over non-leaf nodes,
/// clamped at [`BALANCE_MAX_VARIANCE`]. Fewer than two parents score 1.0.
pub fn hierarchy_balance(root: &TaskNode) -> EvaluationResult {
    let nodes = collect_all_nodes(root);
    let child_counts: Vec<usize> = nodes
        .nodes()
        .map(|node| node.children.len())
        .filter(|&count| count > 0)
        .collect();

    let variance = if child_counts.len() < 2 {
        0.0
    } else {
        population_variance(&child_counts)
    };
    let score = 1.0 - (variance / BALANCE_MAX_VARIANCE).min(1.0);

    EvaluationResult::new(
        score,
        MetricDetails::Balance {
            variance,
            child_counts,
        },
    )
}

fn population_variance(values: &[usize]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}
