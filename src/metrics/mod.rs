//! Decomposition quality metrics.
//!
//! Three structural metrics are pure functions of the tree. Three semantic
//! metrics consult the chat and embedding collaborators. The aggregator in
//! [`tdq`] combines all six into one composite score.

pub mod semantic;
pub mod structural;
pub mod tdq;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::Result;

pub use semantic::{cosine_similarity, executability, granularity, redundancy};
pub use structural::{acyclicity, hierarchy_balance, hierarchy_consistency};
pub use tdq::{aggregate, MetricSet, TdqEvaluator, TdqResult, TdqWeights};

/// Score of a single metric together with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Always within `[0, 1]`.
    pub score: f64,
    pub details: MetricDetails,
}

impl EvaluationResult {
    pub fn new(score: f64, details: MetricDetails) -> Self {
        Self { score, details }
    }
}

/// Metric-specific diagnostics. Reported, never used for control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "metric")]
pub enum MetricDetails {
    Acyclicity {
        has_cycle: bool,
    },
    Hierarchy {
        consistent_edges: usize,
        total_edges: usize,
    },
    Balance {
        variance: f64,
        child_counts: Vec<usize>,
    },
    Redundancy {
        redundant_pairs: usize,
        total_pairs: usize,
        /// First few redundant pairs in index order.
        examples: Vec<RedundantPair>,
    },
    Granularity {
        leaves: Vec<LeafEstimate>,
    },
    Executability {
        leaves: Vec<LeafRating>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedundantPair {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

/// Judged effort for one leaf. `hours` is `None` when the response did not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafEstimate {
    pub id: String,
    pub hours: Option<f64>,
    pub score: f64,
}

/// Judged actionability for one leaf. `rating` is `None` when the response
/// did not parse or was out of range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafRating {
    pub id: String,
    pub rating: Option<u8>,
    pub score: f64,
}

/// Ideal effort window for a leaf task, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortRange {
    pub min_hours: f64,
    pub max_hours: f64,
    /// Decay rate of the score outside the window.
    pub alpha: f64,
}

impl Default for EffortRange {
    fn default() -> Self {
        Self {
            min_hours: 1.0,
            max_hours: 8.0,
            alpha: 1.0,
        }
    }
}

impl EffortRange {
    pub fn midpoint(&self) -> f64 {
        (self.min_hours + self.max_hours) / 2.0
    }

    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.min_hours && hours <= self.max_hours
    }
}

/// Default cosine similarity above which two tasks count as redundant.
pub const DEFAULT_REDUNDANCY_THRESHOLD: f64 = 0.8;

/// Tunables for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub weights: TdqWeights,
    pub redundancy_threshold: f64,
    pub effort: EffortRange,
    /// Maximum collaborator calls in flight. Results keep traversal order.
    pub concurrency: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            weights: TdqWeights::default(),
            redundancy_threshold: DEFAULT_REDUNDANCY_THRESHOLD,
            effort: EffortRange::default(),
            concurrency: 1,
        }
    }
}

/// Drive collaborator calls with bounded concurrency, keeping input order.
///
/// The first failure is returned and the remaining calls are dropped.
pub(crate) async fn in_order<I, Fut, T>(calls: I, concurrency: usize) -> Result<Vec<T>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T>>,
{
    stream::iter(calls)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}
