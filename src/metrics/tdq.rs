//! Composite Task Decomposition Quality score.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    acyclicity, executability, granularity, hierarchy_balance, hierarchy_consistency,
    redundancy, EvaluationConfig, EvaluationResult,
};
use crate::core::TaskNode;
use crate::error::Result;
use crate::llm::{ChatClient, EmbeddingClient};
use crate::tlog_debug;

/// Warning cutoffs. A metric strictly below its cutoff produces an issue.
pub const HIERARCHY_CUTOFF: f64 = 0.7;
pub const BALANCE_CUTOFF: f64 = 0.5;
pub const GRANULARITY_CUTOFF: f64 = 0.6;
pub const REDUNDANCY_CUTOFF: f64 = 0.8;
pub const EXECUTABILITY_CUTOFF: f64 = 0.6;

/// Relative weight of each metric in the composite score.
///
/// The defaults sum to 0.9, which is therefore the best composite score
/// reachable without custom weights. Sums are never normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdqWeights {
    pub acyclicity: f64,
    pub hierarchy: f64,
    pub balance: f64,
    pub granularity: f64,
    pub redundancy: f64,
    pub executability: f64,
}

impl Default for TdqWeights {
    fn default() -> Self {
        Self {
            acyclicity: 0.10,
            hierarchy: 0.15,
            balance: 0.10,
            granularity: 0.20,
            redundancy: 0.10,
            executability: 0.25,
        }
    }
}

impl TdqWeights {
    /// Weights in fixed metric order: A, H, B, G, R, E.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.acyclicity,
            self.hierarchy,
            self.balance,
            self.granularity,
            self.redundancy,
            self.executability,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// The six metric results of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub acyclicity: EvaluationResult,
    pub hierarchy: EvaluationResult,
    pub balance: EvaluationResult,
    pub granularity: EvaluationResult,
    pub redundancy: EvaluationResult,
    pub executability: EvaluationResult,
}

impl MetricSet {
    /// Scores in fixed metric order: A, H, B, G, R, E.
    pub fn scores(&self) -> [f64; 6] {
        [
            self.acyclicity.score,
            self.hierarchy.score,
            self.balance.score,
            self.granularity.score,
            self.redundancy.score,
            self.executability.score,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdqResult {
    pub score: f64,
    pub metrics: MetricSet,
    pub weights: TdqWeights,
    pub issues: Vec<String>,
}

/// Combine metric results into a composite score and issue list.
///
/// Pure: the same inputs always give a bit-identical score.
pub fn aggregate(metrics: MetricSet, weights: &TdqWeights) -> TdqResult {
    let score: f64 = metrics
        .scores()
        .iter()
        .zip(weights.as_array())
        .map(|(score, weight)| weight * score)
        .sum();
    let issues = issues(&metrics);
    TdqResult {
        score,
        metrics,
        weights: *weights,
        issues,
    }
}

/// Human-readable findings. They never influence the score.
pub fn issues(metrics: &MetricSet) -> Vec<String> {
    let mut issues = Vec::new();

    if metrics.acyclicity.score == 0.0 {
        issues.push("MUST FIX: cyclic dependency detected between tasks".to_string());
    }

    let warnings = [
        (
            metrics.hierarchy.score,
            HIERARCHY_CUTOFF,
            "Hierarchy inconsistency",
            "dependencies point at same-level or higher-level tasks",
        ),
        (
            metrics.balance.score,
            BALANCE_CUTOFF,
            "Unbalanced hierarchy",
            "parent tasks have very different numbers of subtasks",
        ),
        (
            metrics.granularity.score,
            GRANULARITY_CUTOFF,
            "Poor granularity",
            "leaf tasks are too large or too small",
        ),
        (
            metrics.redundancy.score,
            REDUNDANCY_CUTOFF,
            "Redundant tasks",
            "some tasks overlap in meaning",
        ),
        (
            metrics.executability.score,
            EXECUTABILITY_CUTOFF,
            "Low executability",
            "leaf tasks are not concrete enough to start",
        ),
    ];

    for (score, cutoff, label, hint) in warnings {
        if score < cutoff {
            issues.push(format!("{} (score {:.2}): {}", label, score, hint));
        }
    }

    issues
}

/// Runs all six metrics over a tree and aggregates them.
#[derive(Clone)]
pub struct TdqEvaluator {
    chat: Arc<dyn ChatClient>,
    embedder: Arc<dyn EmbeddingClient>,
    config: EvaluationConfig,
}

impl TdqEvaluator {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        embedder: Arc<dyn EmbeddingClient>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            chat,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate a tree. Structural metrics run first, then redundancy,
    /// granularity and executability.
    ///
    /// # Errors
    ///
    /// Fails on the first collaborator error or embedding dimension mismatch.
    pub async fn evaluate(&self, tree: &TaskNode) -> Result<TdqResult> {
        let acyclicity = acyclicity(tree);
        let hierarchy = hierarchy_consistency(tree);
        let balance = hierarchy_balance(tree);
        tlog_debug!(
            "structural: acyclicity={:.3} hierarchy={:.3} balance={:.3}",
            acyclicity.score,
            hierarchy.score,
            balance.score
        );

        let redundancy = redundancy(tree, self.embedder.as_ref(), &self.config).await?;
        let granularity = granularity(tree, self.chat.as_ref(), &self.config).await?;
        let executability = executability(tree, self.chat.as_ref(), &self.config).await?;

        let result = aggregate(
            MetricSet {
                acyclicity,
                hierarchy,
                balance,
                granularity,
                redundancy,
                executability,
            },
            &self.config.weights,
        );
        tlog_debug!(
            "tdq score={:.3} issues={}",
            result.score,
            result.issues.len()
        );
        Ok(result)
    }
}

impl std::fmt::Debug for TdqEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdqEvaluator")
            .field("config", &self.config)
            .finish()
    }
}
