//! Prompt construction for generation, refinement and judgment calls.

use super::ChatMessage;
use crate::core::TaskNode;

const TREE_SCHEMA: &str = r#"{
  "id": "unique-string",
  "title": "short imperative title",
  "description": "optional detail",
  "priority": "low | medium | high | critical",
  "effort_estimate": 4.0,
  "dependencies": ["id-of-task-that-must-come-first"],
  "children": [ ...nested tasks of the same shape... ]
}"#;

const PLANNER_SYSTEM: &str = "You are a project planner who breaks work into a \
hierarchical task tree. Every id is unique across the tree. Leaf tasks are concrete, \
directly actionable, and take between 1 and 8 hours. Dependencies only reference ids \
that exist in the tree and never form cycles. Reply with JSON only.";

/// Semantic sub-scores passed back to the planner during refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinementFeedback {
    pub granularity: f64,
    pub executability: f64,
    pub redundancy: f64,
}

/// Initial tree generation from a free-text request.
pub fn generate_tree(request: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PLANNER_SYSTEM),
        ChatMessage::user(format!(
            "Decompose the following request into a task tree.\n\n\
             Request:\n{}\n\n\
             Respond with a single JSON object of this shape:\n{}",
            request.trim(),
            TREE_SCHEMA
        )),
    ]
}

/// Revision of an existing tree given the evaluation's findings.
pub fn refine_tree(
    tree: &TaskNode,
    issues: &[String],
    feedback: &RefinementFeedback,
) -> Vec<ChatMessage> {
    let tree_json = serde_json::to_string_pretty(tree).unwrap_or_default();
    let issue_list = if issues.is_empty() {
        "- none reported".to_string()
    } else {
        issues
            .iter()
            .map(|issue| format!("- {}", issue))
            .collect::<Vec<_>>()
            .join("\n")
    };

    vec![
        ChatMessage::system(PLANNER_SYSTEM),
        ChatMessage::user(format!(
            "Improve this task tree.\n\n\
             Current tree:\n{}\n\n\
             Issues found:\n{}\n\n\
             Scores (0 to 1, higher is better):\n\
             - granularity: {:.2}\n\
             - executability: {:.2}\n\
             - redundancy: {:.2}\n\n\
             Fix the issues, merge overlapping tasks, split or merge leaves so each \
             takes 1 to 8 hours, and make every leaf concrete. Respond with the complete \
             revised tree as a single JSON object of this shape:\n{}",
            tree_json,
            issue_list,
            feedback.granularity,
            feedback.executability,
            feedback.redundancy,
            TREE_SCHEMA
        )),
    ]
}

/// Break a single task into direct subtasks.
pub fn decompose_task(node: &TaskNode) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PLANNER_SYSTEM),
        ChatMessage::user(format!(
            "Break this task into 2 to 7 direct subtasks.\n\n{}\n\n\
             Respond with a JSON array of subtask objects of this shape:\n{}",
            describe(node),
            TREE_SCHEMA
        )),
    ]
}

/// Ask for an hours estimate; the reply must be a bare number.
pub fn effort_estimate(node: &TaskNode) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You estimate software and project tasks. Reply with a single number of \
             hours and nothing else.",
        ),
        ChatMessage::user(format!(
            "How many hours would one experienced person need for this task?\n\n{}",
            describe(node)
        )),
    ]
}

/// Ask for a 1-5 actionability rating; the reply must be a bare integer.
pub fn executability_rating(node: &TaskNode) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You judge whether tasks can be started immediately without further \
             planning. Reply with a single integer from 1 to 5 and nothing else.",
        ),
        ChatMessage::user(format!(
            "Rate how directly actionable this task is.\n\
             1 = vague goal, needs more breakdown\n\
             3 = mostly clear, some decisions left open\n\
             5 = concrete action anyone could start now\n\n{}",
            describe(node)
        )),
    ]
}

fn describe(node: &TaskNode) -> String {
    match &node.description {
        Some(desc) => format!("Task: {}\nDetails: {}", node.title, desc),
        None => format!("Task: {}", node.title),
    }
}
