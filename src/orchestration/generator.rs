//! Tree generation, refinement and single-task decomposition.
//!
//! Every call goes through the chat collaborator once and parses the reply
//! into task nodes. A reply that cannot be parsed is a hard error carrying
//! the raw text.

use serde::Deserialize;
use std::sync::Arc;

use crate::core::TaskNode;
use crate::error::{Error, Result};
use crate::llm::prompts::{self, RefinementFeedback};
use crate::llm::{parse_payload, ChatClient};
use crate::{tlog_debug, tlog_trace};

/// Decomposition replies may be a bare array or wrap it in `subtasks`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubtaskPayload {
    List(Vec<TaskNode>),
    Wrapped { subtasks: Vec<TaskNode> },
}

#[derive(Clone)]
pub struct TaskGenerator {
    chat: Arc<dyn ChatClient>,
}

impl TaskGenerator {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    /// Produce an initial tree from a free-text request.
    pub async fn generate(&self, request: &str) -> Result<TaskNode> {
        tlog_debug!("generate: request of {} chars", request.len());
        let raw = self.chat.complete(&prompts::generate_tree(request)).await?;
        tlog_trace!("generate raw response: {}", raw);
        let tree: TaskNode = parse_payload(&raw)?;
        tlog_debug!("generate: tree with {} nodes", tree.subtree_size());
        Ok(tree)
    }

    /// Produce a revised tree. The input tree is left untouched.
    pub async fn refine(
        &self,
        tree: &TaskNode,
        issues: &[String],
        feedback: &RefinementFeedback,
    ) -> Result<TaskNode> {
        tlog_debug!(
            "refine: {} nodes, {} issues, feedback={:?}",
            tree.subtree_size(),
            issues.len(),
            feedback
        );
        let raw = self
            .chat
            .complete(&prompts::refine_tree(tree, issues, feedback))
            .await?;
        tlog_trace!("refine raw response: {}", raw);
        let refined: TaskNode = parse_payload(&raw)?;
        tlog_debug!("refine: tree with {} nodes", refined.subtree_size());
        Ok(refined)
    }

    /// Break one task into its direct subtasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] unless the reply holds a JSON
    /// array of task objects (optionally under a `subtasks` key) with at
    /// least one entry.
    pub async fn decompose(&self, node: &TaskNode) -> Result<Vec<TaskNode>> {
        let raw = self.chat.complete(&prompts::decompose_task(node)).await?;
        tlog_trace!("decompose raw response: {}", raw);
        let subtasks = match parse_payload::<SubtaskPayload>(&raw)? {
            SubtaskPayload::List(list) => list,
            SubtaskPayload::Wrapped { subtasks } => subtasks,
        };
        if subtasks.is_empty() {
            return Err(Error::malformed("decomposition returned no subtasks", &raw));
        }
        tlog_debug!("decompose '{}': {} subtasks", node.id, subtasks.len());
        Ok(subtasks)
    }
}

impl std::fmt::Debug for TaskGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGenerator").finish_non_exhaustive()
    }
}
