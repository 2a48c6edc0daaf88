//! End-to-end evaluation of task trees.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tdq::metrics::{EvaluationConfig, MetricDetails, TdqEvaluator};
use tdq::Error;

use crate::fixtures::{tree, GroupEmbedder, ScriptedChat, BALANCED_TREE, CYCLIC_TREE, VAGUE_TREE};

fn evaluator(chat: ScriptedChat, embedder: GroupEmbedder) -> TdqEvaluator {
    TdqEvaluator::new(Arc::new(chat), Arc::new(embedder), EvaluationConfig::default())
}

#[tokio::test]
async fn test_well_formed_tree_scores_high() {
    let evaluator = evaluator(ScriptedChat::new(), GroupEmbedder::new());
    let result = evaluator.evaluate(&tree(BALANCED_TREE)).await.unwrap();

    assert_eq!(result.metrics.acyclicity.score, 1.0);
    assert!((result.metrics.hierarchy.score - 6.0 / 7.0).abs() < 1e-12);
    assert_eq!(result.metrics.balance.score, 1.0);
    assert_eq!(result.metrics.redundancy.score, 1.0);
    assert_eq!(result.metrics.granularity.score, 1.0);
    assert_eq!(result.metrics.executability.score, 1.0);

    let expected = 0.10 + 0.15 * (6.0 / 7.0) + 0.10 + 0.20 + 0.10 + 0.25;
    assert!((result.score - expected).abs() < 1e-9);
    assert!(result.issues.is_empty());
}

#[tokio::test]
async fn test_cycle_is_reported_first() {
    let evaluator = evaluator(ScriptedChat::new(), GroupEmbedder::new());
    let result = evaluator.evaluate(&tree(CYCLIC_TREE)).await.unwrap();

    assert_eq!(result.metrics.acyclicity.score, 0.0);
    assert_eq!(result.metrics.hierarchy.score, 0.5);
    assert_eq!(result.issues.len(), 2);
    assert!(result.issues[0].starts_with("MUST FIX"));
    assert!(result.issues[1].starts_with("Hierarchy inconsistency (score 0.50)"));
    assert!((result.score - 0.725).abs() < 1e-9);
}

#[tokio::test]
async fn test_unparseable_judgments_score_neutrally() {
    let chat = ScriptedChat::new()
        .default_effort("about four hours")
        .default_rating("very actionable");
    let evaluator = evaluator(chat, GroupEmbedder::new());
    let result = evaluator.evaluate(&tree(VAGUE_TREE)).await.unwrap();

    assert_eq!(result.metrics.granularity.score, 0.5);
    assert_eq!(result.metrics.executability.score, 0.5);
    match &result.metrics.executability.details {
        MetricDetails::Executability { leaves } => {
            assert!(leaves.iter().all(|leaf| leaf.rating.is_none()));
        }
        other => panic!("unexpected details: {:?}", other),
    }
    assert!((result.score - 0.675).abs() < 1e-9);
    assert_eq!(result.issues.len(), 2);
    assert!(result.issues[0].starts_with("Poor granularity"));
    assert!(result.issues[1].starts_with("Low executability"));
}

#[tokio::test]
async fn test_vague_leaf_lowers_executability() {
    let chat = ScriptedChat::new().rating("Do stuff", "1");
    let evaluator = evaluator(chat, GroupEmbedder::new());
    let result = evaluator.evaluate(&tree(VAGUE_TREE)).await.unwrap();

    assert_eq!(result.metrics.executability.score, 0.5);
    assert!((result.score - 0.775).abs() < 1e-9);
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].starts_with("Low executability (score 0.50)"));
}

#[tokio::test]
async fn test_near_duplicate_tasks_are_reported() {
    let embedder = GroupEmbedder::new().same(&["Draft first post", "Edit first post"]);
    let evaluator = evaluator(ScriptedChat::new(), embedder);
    let result = evaluator.evaluate(&tree(BALANCED_TREE)).await.unwrap();

    // 7 nodes, 21 pairs, one of them redundant
    assert!((result.metrics.redundancy.score - 20.0 / 21.0).abs() < 1e-12);
    match &result.metrics.redundancy.details {
        MetricDetails::Redundancy {
            redundant_pairs,
            total_pairs,
            examples,
        } => {
            assert_eq!(*redundant_pairs, 1);
            assert_eq!(*total_pairs, 21);
            assert_eq!(examples[0].first, "draft");
            assert_eq!(examples[0].second, "edit");
        }
        other => panic!("unexpected details: {:?}", other),
    }
}

#[tokio::test]
async fn test_judgment_failure_aborts_evaluation() {
    let evaluator = evaluator(ScriptedChat::new().failing_judgments(), GroupEmbedder::new());
    let err = evaluator.evaluate(&tree(BALANCED_TREE)).await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
}

#[tokio::test]
async fn test_concurrent_judgments_keep_leaf_order() {
    let chat = Arc::new(
        ScriptedChat::new()
            .effort("Register domain", "2")
            .effort("Deploy static site", "12")
            .effort("Draft first post", "0.5")
            .effort("Edit first post", "3"),
    );
    let embedder = Arc::new(GroupEmbedder::new());
    let config = EvaluationConfig {
        concurrency: 4,
        ..EvaluationConfig::default()
    };
    let evaluator = TdqEvaluator::new(chat.clone(), embedder.clone(), config);
    let result = evaluator.evaluate(&tree(BALANCED_TREE)).await.unwrap();

    match &result.metrics.granularity.details {
        MetricDetails::Granularity { leaves } => {
            let ids: Vec<&str> = leaves.iter().map(|leaf| leaf.id.as_str()).collect();
            assert_eq!(ids, vec!["domain", "deploy", "draft", "edit"]);
            let hours: Vec<Option<f64>> = leaves.iter().map(|leaf| leaf.hours).collect();
            assert_eq!(hours, vec![Some(2.0), Some(12.0), Some(0.5), Some(3.0)]);
        }
        other => panic!("unexpected details: {:?}", other),
    }

    // One estimate and one rating per leaf; one embedding per node.
    assert_eq!(chat.judgment_calls.load(Ordering::SeqCst), 8);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_single_node_tree_reaches_weight_total() {
    let evaluator = evaluator(ScriptedChat::new(), GroupEmbedder::new());
    let result = evaluator
        .evaluate(&tree(r#"{"id": "only", "title": "Water the plants"}"#))
        .await
        .unwrap();
    // Every metric is 1.0, so the score is the default weight total.
    assert!((result.score - 0.9).abs() < 1e-9);
    assert!(result.issues.is_empty());
}
