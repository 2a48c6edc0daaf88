pub mod config;
pub mod core;
pub mod error;
pub mod llm;
pub mod log;
pub mod metrics;
pub mod orchestration;

pub use config::Config;
pub use core::TaskNode;
pub use error::{Error, Result};
pub use metrics::{EvaluationConfig, EvaluationResult, TdqEvaluator, TdqResult, TdqWeights};
pub use orchestration::{OptimizationResult, Optimizer, TaskGenerator};
