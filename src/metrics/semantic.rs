//! Semantic metrics: redundancy, granularity, executability.
//!
//! Each makes one collaborator call per node (redundancy) or per leaf
//! (granularity, executability), in traversal order. A judgment that does
//! not parse is scored neutrally instead of failing the evaluation.

use super::{
    in_order, EffortRange, EvaluationConfig, EvaluationResult, LeafEstimate, LeafRating,
    MetricDetails, RedundantPair,
};
use crate::core::{collect_all_nodes, collect_leaves, TaskNode};
use crate::error::{Error, Result};
use crate::llm::{prompts, ChatClient, EmbeddingClient};
use crate::{tlog_debug, tlog_warn};

/// Number of redundant pairs kept in the diagnostics.
pub const MAX_REPORTED_PAIRS: usize = 5;

/// Score given to a leaf whose effort estimate could not be parsed.
pub const FALLBACK_GRANULARITY: f64 = 0.5;

/// Rating assumed when an executability judgment is unusable.
pub const FALLBACK_RATING: u8 = 3;

/// Cosine similarity of two embeddings.
///
/// A zero vector has similarity 0 with everything.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Share of task pairs that are not semantic near-duplicates.
pub async fn redundancy(
    root: &TaskNode,
    embedder: &dyn EmbeddingClient,
    config: &EvaluationConfig,
) -> Result<EvaluationResult> {
    let nodes = collect_all_nodes(root);
    if nodes.len() < 2 {
        return Ok(EvaluationResult::new(
            1.0,
            MetricDetails::Redundancy {
                redundant_pairs: 0,
                total_pairs: 0,
                examples: Vec::new(),
            },
        ));
    }

    let ids: Vec<&str> = nodes.ids().collect();
    let texts: Vec<String> = nodes.nodes().map(TaskNode::text).collect();
    let vectors = in_order(texts.iter().map(|text| embedder.embed(text)), config.concurrency).await?;

    let mut total_pairs = 0usize;
    let mut redundant_pairs = 0usize;
    let mut examples = Vec::new();
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total_pairs += 1;
            let similarity = cosine_similarity(&vectors[i], &vectors[j])?;
            if similarity > config.redundancy_threshold {
                redundant_pairs += 1;
                if examples.len() < MAX_REPORTED_PAIRS {
                    examples.push(RedundantPair {
                        first: ids[i].to_string(),
                        second: ids[j].to_string(),
                        similarity,
                    });
                }
            }
        }
    }

    let score = 1.0 - redundant_pairs as f64 / total_pairs as f64;
    tlog_debug!(
        "redundancy: {}/{} pairs above {} -> {:.3}",
        redundant_pairs,
        total_pairs,
        config.redundancy_threshold,
        score
    );

    Ok(EvaluationResult::new(
        score,
        MetricDetails::Redundancy {
            redundant_pairs,
            total_pairs,
            examples,
        },
    ))
}

/// Parse an hours estimate. Negative or non-finite values are rejected.
pub fn parse_effort(response: &str) -> Option<f64> {
    response
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|hours| hours.is_finite() && *hours >= 0.0)
}

/// Score one estimate against the ideal range.
///
/// Inside the range scores 1.0; outside, the score decays exponentially
/// with the relative distance from the range midpoint.
pub fn effort_score(hours: f64, range: &EffortRange) -> f64 {
    if range.contains(hours) {
        return 1.0;
    }
    let mid = range.midpoint();
    (-range.alpha * (hours - mid).abs() / mid).exp()
}

/// Mean per-leaf fit of judged effort to the ideal range.
pub async fn granularity(
    root: &TaskNode,
    judge: &dyn ChatClient,
    config: &EvaluationConfig,
) -> Result<EvaluationResult> {
    let nodes = collect_all_nodes(root);
    let leaves = collect_leaves(&nodes);
    if leaves.is_empty() {
        return Ok(EvaluationResult::new(
            1.0,
            MetricDetails::Granularity { leaves: Vec::new() },
        ));
    }

    let requests: Vec<_> = leaves.iter().map(|leaf| prompts::effort_estimate(leaf)).collect();
    let responses = in_order(
        requests.iter().map(|messages| judge.complete(messages)),
        config.concurrency,
    )
    .await?;

    let judged: Vec<LeafEstimate> = leaves
        .iter()
        .zip(&responses)
        .map(|(leaf, response)| match parse_effort(response) {
            Some(hours) => LeafEstimate {
                id: leaf.id.clone(),
                hours: Some(hours),
                score: effort_score(hours, &config.effort),
            },
            None => {
                tlog_warn!(
                    "granularity: unparseable estimate for '{}': {:?}",
                    leaf.id,
                    response
                );
                LeafEstimate {
                    id: leaf.id.clone(),
                    hours: None,
                    score: FALLBACK_GRANULARITY,
                }
            }
        })
        .collect();

    let score = mean(judged.iter().map(|leaf| leaf.score));
    tlog_debug!("granularity: {} leaves -> {:.3}", judged.len(), score);
    Ok(EvaluationResult::new(
        score,
        MetricDetails::Granularity { leaves: judged },
    ))
}

/// Parse a 1-5 rating. Anything else is rejected.
pub fn parse_rating(response: &str) -> Option<u8> {
    response
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|rating| (1..=5).contains(rating))
}

/// Mean per-leaf actionability, each rating mapped onto `[0, 1]`.
pub async fn executability(
    root: &TaskNode,
    judge: &dyn ChatClient,
    config: &EvaluationConfig,
) -> Result<EvaluationResult> {
    let nodes = collect_all_nodes(root);
    let leaves = collect_leaves(&nodes);
    if leaves.is_empty() {
        return Ok(EvaluationResult::new(
            1.0,
            MetricDetails::Executability { leaves: Vec::new() },
        ));
    }

    let requests: Vec<_> = leaves
        .iter()
        .map(|leaf| prompts::executability_rating(leaf))
        .collect();
    let responses = in_order(
        requests.iter().map(|messages| judge.complete(messages)),
        config.concurrency,
    )
    .await?;

    let judged: Vec<LeafRating> = leaves
        .iter()
        .zip(&responses)
        .map(|(leaf, response)| {
            let rating = parse_rating(response);
            if rating.is_none() {
                tlog_warn!(
                    "executability: unusable rating for '{}': {:?}",
                    leaf.id,
                    response
                );
            }
            let effective = rating.unwrap_or(FALLBACK_RATING);
            LeafRating {
                id: leaf.id.clone(),
                rating,
                score: (effective as f64 - 1.0) / 4.0,
            }
        })
        .collect();

    let score = mean(judged.iter().map(|leaf| leaf.score));
    tlog_debug!("executability: {} leaves -> {:.3}", judged.len(), score);
    Ok(EvaluationResult::new(
        score,
        MetricDetails::Executability { leaves: judged },
    ))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}
