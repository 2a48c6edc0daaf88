//! Generate-evaluate-refine loop tests.

use std::sync::Arc;
use tokio::sync::mpsc;

use tdq::metrics::{EvaluationConfig, TdqEvaluator};
use tdq::orchestration::{LoopEvent, LoopState, Optimizer, OptimizerConfig, TaskGenerator};
use tdq::Error;

use crate::fixtures::{GroupEmbedder, ScriptedChat, BALANCED_TREE, VAGUE_TREE};

/// Between the scores of the two fixture trees under `vague_judge`:
/// VAGUE_TREE scores about 0.675, BALANCED_TREE about 0.779.
const TARGET: f64 = 0.75;

/// Judges "Do stuff" as oversized and barely actionable.
fn vague_judge() -> ScriptedChat {
    ScriptedChat::new()
        .effort("Do stuff", "40")
        .rating("Do stuff", "1")
}

fn optimizer(chat: Arc<ScriptedChat>, target_score: f64, max_iterations: usize) -> Optimizer {
    Optimizer::new(
        TaskGenerator::new(chat.clone()),
        TdqEvaluator::new(chat, Arc::new(GroupEmbedder::new()), EvaluationConfig::default()),
        OptimizerConfig {
            target_score,
            max_iterations,
        },
    )
}

#[tokio::test]
async fn test_stops_when_first_tree_meets_target() {
    let chat = Arc::new(ScriptedChat::new().plan(BALANCED_TREE));
    let outcome = optimizer(chat.clone(), TARGET, 5)
        .optimize("Launch a blog")
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.tree.id, "root");
    assert_eq!(outcome.history[0].score, outcome.result.score);
    assert_eq!(chat.planner_calls(), 1);
    assert!(chat.planner_prompts.lock().unwrap()[0].contains("Launch a blog"));
}

#[tokio::test]
async fn test_refines_until_target_reached() {
    let chat = Arc::new(
        vague_judge()
            .plan(VAGUE_TREE)
            .plan(&format!("Here is the revised tree:\n```json\n{}\n```", BALANCED_TREE)),
    );
    let outcome = optimizer(chat.clone(), TARGET, 5)
        .optimize("Launch a blog")
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.history.len(), 2);
    assert_eq!(outcome.history[0].iteration, 1);
    assert_eq!(outcome.history[1].iteration, 2);
    assert!((outcome.history[0].score - 0.675).abs() < 1e-3);
    assert!(outcome.result.score >= TARGET);
    assert_eq!(outcome.tree.children.len(), 2);
    assert_eq!(outcome.tree.children[0].id, "setup");

    let prompts = chat.planner_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Poor granularity (score 0.50)"));
    assert!(prompts[1].contains("Low executability (score 0.50)"));
    assert!(prompts[1].contains("executability: 0.50"));
    assert!(prompts[1].contains("\"Do stuff\""));
}

#[tokio::test]
async fn test_stops_at_iteration_cap() {
    let chat = Arc::new(
        vague_judge()
            .plan(VAGUE_TREE)
            .plan(VAGUE_TREE)
            .plan(VAGUE_TREE)
            .plan(BALANCED_TREE),
    );
    let outcome = optimizer(chat.clone(), TARGET, 3)
        .optimize("Launch a blog")
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.result.score < TARGET);
    assert_eq!(outcome.tree.children[0].id, "stuff");
    assert_eq!(chat.planner_calls(), 3);
}

#[tokio::test]
async fn test_zero_iteration_budget_still_evaluates_once() {
    let chat = Arc::new(vague_judge().plan(VAGUE_TREE));
    let outcome = optimizer(chat.clone(), TARGET, 0)
        .optimize("Launch a blog")
        .await
        .unwrap();
    assert_eq!(outcome.iterations, 1);
    assert_eq!(chat.planner_calls(), 1);
}

#[tokio::test]
async fn test_refinement_failure_keeps_history() {
    let chat = Arc::new(
        vague_judge()
            .plan(VAGUE_TREE)
            .plan_failure("rate limited"),
    );
    let mut history = Vec::new();
    let err = optimizer(chat, TARGET, 5)
        .optimize_into("Launch a blog", &mut history)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider(ref msg) if msg == "rate limited"));
    assert_eq!(history.len(), 1);
    assert!((history[0].score - 0.675).abs() < 1e-3);
}

#[tokio::test]
async fn test_malformed_generation_is_reported_with_raw_text() {
    let chat = Arc::new(ScriptedChat::new().plan("I cannot help with that."));
    let mut history = Vec::new();
    let err = optimizer(chat, TARGET, 5)
        .optimize_into("Launch a blog", &mut history)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse { .. }));
    assert_eq!(err.raw_response(), Some("I cannot help with that."));
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_progress_events() {
    let chat = Arc::new(
        vague_judge()
            .plan(VAGUE_TREE)
            .plan(BALANCED_TREE),
    );
    let (tx, mut rx) = mpsc::channel(64);
    let optimizer = optimizer(chat, TARGET, 5).with_events(tx);
    optimizer.optimize("Launch a blog").await.unwrap();
    drop(optimizer);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let transitions: Vec<(LoopState, LoopState)> = events
        .iter()
        .filter_map(|e| match e {
            LoopEvent::Transition { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (LoopState::Generating, LoopState::Evaluating),
            (LoopState::Evaluating, LoopState::Refining),
            (LoopState::Refining, LoopState::Evaluating),
            (LoopState::Evaluating, LoopState::Done),
        ]
    );

    let evaluated = events
        .iter()
        .filter(|e| matches!(e, LoopEvent::Evaluated { .. }))
        .count();
    assert_eq!(evaluated, 2);
    assert!(matches!(
        events.last(),
        Some(LoopEvent::Completed { iterations: 2, .. })
    ));
}
