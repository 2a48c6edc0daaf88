//! Integration test suite for tdq.
//!
//! These tests drive the evaluator and the optimization loop end to end
//! against scripted chat and embedding collaborators.
//!
//! # Test Categories
//!
//! - `evaluation`: Full six-metric evaluation of task trees
//! - `optimization`: Generate-evaluate-refine loop behavior
//!
//! # CI Compatibility
//!
//! No test makes a network call.

mod fixtures;

mod evaluation;
mod optimization;
