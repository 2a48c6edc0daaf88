//! Generate-evaluate-refine loop.
//!
//! The `Optimizer` produces an initial tree from a free-text request, scores
//! it with the [`TdqEvaluator`], and asks for refinements until the score
//! reaches the target or the iteration budget runs out.
//!
//! ```text
//! Generating -> Evaluating -> Done
//!                  ^    |
//!                  |    v
//!                 Refining
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::TaskGenerator;
use crate::core::TaskNode;
use crate::error::{Error, Result};
use crate::llm::prompts::RefinementFeedback;
use crate::metrics::{TdqEvaluator, TdqResult};
use crate::{tlog, tlog_error};

/// Default stopping score. The default weights cap the composite score at
/// 0.9, so this leaves room for one moderately weak metric.
pub const DEFAULT_TARGET_SCORE: f64 = 0.8;
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Unique identifier for one optimization run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters of the UUID.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Stop as soon as the composite score reaches this value.
    pub target_score: f64,
    /// Maximum number of evaluations, the first one included.
    pub max_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_score: DEFAULT_TARGET_SCORE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Externally visible state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Generating,
    Evaluating,
    Refining,
    Done,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Generating => write!(f, "generating"),
            LoopState::Evaluating => write!(f, "evaluating"),
            LoopState::Refining => write!(f, "refining"),
            LoopState::Done => write!(f, "done"),
        }
    }
}

/// Progress notifications, delivered best effort.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    Transition {
        from: LoopState,
        to: LoopState,
    },
    Evaluated {
        iteration: usize,
        score: f64,
        issues: usize,
    },
    Completed {
        iterations: usize,
        score: f64,
    },
}

/// One evaluation of the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based.
    pub iteration: usize,
    pub score: f64,
    pub issues: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub run_id: RunId,
    pub tree: TaskNode,
    pub result: TdqResult,
    pub iterations: usize,
    pub history: Vec<HistoryEntry>,
}

/// Loop state together with the values it owns.
enum Stage {
    Generating,
    Evaluating(TaskNode),
    Refining(TaskNode, TdqResult),
    Done(TaskNode, TdqResult),
}

impl Stage {
    fn state(&self) -> LoopState {
        match self {
            Stage::Generating => LoopState::Generating,
            Stage::Evaluating(_) => LoopState::Evaluating,
            Stage::Refining(..) => LoopState::Refining,
            Stage::Done(..) => LoopState::Done,
        }
    }
}

#[derive(Debug)]
pub struct Optimizer {
    generator: TaskGenerator,
    evaluator: TdqEvaluator,
    config: OptimizerConfig,
    event_tx: Option<mpsc::Sender<LoopEvent>>,
}

impl Optimizer {
    pub fn new(generator: TaskGenerator, evaluator: TdqEvaluator, config: OptimizerConfig) -> Self {
        Self {
            generator,
            evaluator,
            config,
            event_tx: None,
        }
    }

    /// Send progress events to `event_tx`. A full channel drops events.
    pub fn with_events(mut self, event_tx: mpsc::Sender<LoopEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run the loop to completion.
    pub async fn optimize(&self, request: &str) -> Result<OptimizationResult> {
        let mut history = Vec::new();
        self.optimize_into(request, &mut history).await
    }

    /// Run the loop, appending each evaluation to `history` as it happens.
    ///
    /// If a collaborator call fails the run stops with that error and
    /// `history` keeps every evaluation recorded so far. Nothing is retried.
    pub async fn optimize_into(
        &self,
        request: &str,
        history: &mut Vec<HistoryEntry>,
    ) -> Result<OptimizationResult> {
        let run_id = RunId::new();
        let max_iterations = self.config.max_iterations.max(1);
        let mut iteration = 1usize;
        let mut stage = Stage::Generating;

        tlog!(
            "run {}: start target={} max_iterations={}",
            run_id.short(),
            self.config.target_score,
            max_iterations
        );

        loop {
            let from = stage.state();
            stage = match stage {
                Stage::Generating => {
                    let tree = self
                        .generator
                        .generate(request)
                        .await
                        .map_err(|e| abort(run_id, from, history.as_slice(), e))?;
                    Stage::Evaluating(tree)
                }
                Stage::Evaluating(tree) => {
                    let result = self
                        .evaluator
                        .evaluate(&tree)
                        .await
                        .map_err(|e| abort(run_id, from, history.as_slice(), e))?;

                    history.push(HistoryEntry {
                        iteration,
                        score: result.score,
                        issues: result.issues.clone(),
                        evaluated_at: Utc::now(),
                    });
                    tlog!(
                        "run {}: iteration {} score={:.3} issues={}",
                        run_id.short(),
                        iteration,
                        result.score,
                        result.issues.len()
                    );
                    self.emit(LoopEvent::Evaluated {
                        iteration,
                        score: result.score,
                        issues: result.issues.len(),
                    });

                    if result.score >= self.config.target_score || iteration >= max_iterations {
                        Stage::Done(tree, result)
                    } else {
                        Stage::Refining(tree, result)
                    }
                }
                Stage::Refining(tree, result) => {
                    let feedback = RefinementFeedback {
                        granularity: result.metrics.granularity.score,
                        executability: result.metrics.executability.score,
                        redundancy: result.metrics.redundancy.score,
                    };
                    let refined = self
                        .generator
                        .refine(&tree, &result.issues, &feedback)
                        .await
                        .map_err(|e| abort(run_id, from, history.as_slice(), e))?;
                    iteration += 1;
                    Stage::Evaluating(refined)
                }
                Stage::Done(tree, result) => {
                    tlog!(
                        "run {}: done after {} iteration(s), score={:.3}",
                        run_id.short(),
                        iteration,
                        result.score
                    );
                    self.emit(LoopEvent::Completed {
                        iterations: iteration,
                        score: result.score,
                    });
                    return Ok(OptimizationResult {
                        run_id,
                        tree,
                        result,
                        iterations: iteration,
                        history: history.clone(),
                    });
                }
            };

            self.emit(LoopEvent::Transition {
                from,
                to: stage.state(),
            });
        }
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(event);
        }
    }
}

fn abort(run_id: RunId, state: LoopState, history: &[HistoryEntry], err: Error) -> Error {
    tlog_error!(
        "run {}: aborted while {}: {} (history: {})",
        run_id.short(),
        state,
        err,
        history
            .iter()
            .map(|h| format!("#{}={:.3}", h.iteration, h.score))
            .collect::<Vec<_>>()
            .join(", ")
    );
    err
}
