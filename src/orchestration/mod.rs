//! Orchestration of tree generation and the optimization loop.
//!
//! The `TaskGenerator` turns chat replies into task trees, and the
//! `Optimizer` drives generate-evaluate-refine toward a target score.

mod generator;
mod optimizer;

pub use generator::TaskGenerator;
pub use optimizer::{
    HistoryEntry, LoopEvent, LoopState, OptimizationResult, Optimizer, OptimizerConfig, RunId,
    DEFAULT_MAX_ITERATIONS, DEFAULT_TARGET_SCORE,
};
