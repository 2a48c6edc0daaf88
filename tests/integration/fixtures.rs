//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A scripted chat collaborator (planner replies and per-task judgments)
//! - A deterministic embedding collaborator
//! - Sample task trees

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tdq::core::TaskNode;
use tdq::llm::{ChatClient, ChatMessage, EmbeddingClient};
use tdq::{Error, Result};

const EMBEDDING_DIM: usize = 32;

/// Chat collaborator that answers planner prompts from a queue and
/// judgment prompts from per-title tables.
pub struct ScriptedChat {
    plans: Mutex<VecDeque<Result<String>>>,
    efforts: HashMap<String, String>,
    ratings: HashMap<String, String>,
    default_effort: String,
    default_rating: String,
    fail_judgments: bool,
    /// User content of every planner prompt, in call order.
    pub planner_prompts: Mutex<Vec<String>>,
    pub judgment_calls: AtomicUsize,
}

impl ScriptedChat {
    /// Every leaf is judged at 4 hours and rated 5.
    pub fn new() -> Self {
        Self {
            plans: Mutex::new(VecDeque::new()),
            efforts: HashMap::new(),
            ratings: HashMap::new(),
            default_effort: "4".to_string(),
            default_rating: "5".to_string(),
            fail_judgments: false,
            planner_prompts: Mutex::new(Vec::new()),
            judgment_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a reply for the next generate or refine call.
    pub fn plan(self, reply: &str) -> Self {
        self.plans.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    /// Queue a provider failure for the next generate or refine call.
    pub fn plan_failure(self, message: &str) -> Self {
        self.plans
            .lock()
            .unwrap()
            .push_back(Err(Error::Provider(message.to_string())));
        self
    }

    pub fn effort(mut self, title: &str, reply: &str) -> Self {
        self.efforts.insert(title.to_string(), reply.to_string());
        self
    }

    pub fn rating(mut self, title: &str, reply: &str) -> Self {
        self.ratings.insert(title.to_string(), reply.to_string());
        self
    }

    pub fn default_effort(mut self, reply: &str) -> Self {
        self.default_effort = reply.to_string();
        self
    }

    pub fn default_rating(mut self, reply: &str) -> Self {
        self.default_rating = reply.to_string();
        self
    }

    pub fn failing_judgments(mut self) -> Self {
        self.fail_judgments = true;
        self
    }

    pub fn planner_calls(&self) -> usize {
        self.planner_prompts.lock().unwrap().len()
    }
}

fn task_title(messages: &[ChatMessage]) -> String {
    messages
        .last()
        .and_then(|m| m.content.lines().find_map(|l| l.strip_prefix("Task: ")))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let is_effort = system.starts_with("You estimate");
        let is_rating = system.starts_with("You judge");

        if is_effort || is_rating {
            self.judgment_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_judgments {
                return Err(Error::Provider("judge unavailable".to_string()));
            }
            let title = task_title(messages);
            let (table, default) = if is_effort {
                (&self.efforts, &self.default_effort)
            } else {
                (&self.ratings, &self.default_rating)
            };
            return Ok(table.get(&title).unwrap_or(default).clone());
        }

        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.planner_prompts.lock().unwrap().push(prompt);
        self.plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Provider("no scripted plan left".to_string())))
    }
}

/// Embedding collaborator giving every distinct text its own basis vector,
/// so unrelated tasks have similarity 0. Texts put in the same group share
/// a vector and have similarity 1.
pub struct GroupEmbedder {
    groups: HashMap<String, String>,
    assigned: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl GroupEmbedder {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            assigned: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn same(mut self, texts: &[&str]) -> Self {
        if let Some(first) = texts.first() {
            for text in texts {
                self.groups.insert(text.to_string(), first.to_string());
            }
        }
        self
    }
}

#[async_trait]
impl EmbeddingClient for GroupEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = self.groups.get(text).cloned().unwrap_or_else(|| text.to_string());
        let mut assigned = self.assigned.lock().unwrap();
        let slot = match assigned.iter().position(|k| *k == key) {
            Some(slot) => slot,
            None => {
                assigned.push(key);
                assigned.len() - 1
            }
        };
        let mut vector = vec![0.0; EMBEDDING_DIM];
        vector[slot % EMBEDDING_DIM] = 1.0;
        Ok(vector)
    }
}

/// Root with two parents of two leaves each. No dependencies.
pub const BALANCED_TREE: &str = r#"{
  "id": "root",
  "title": "Launch blog",
  "children": [
    {
      "id": "setup",
      "title": "Set up hosting",
      "children": [
        {"id": "domain", "title": "Register domain"},
        {"id": "deploy", "title": "Deploy static site", "dependencies": ["domain"]}
      ]
    },
    {
      "id": "content",
      "title": "Write content",
      "children": [
        {"id": "draft", "title": "Draft first post"},
        {"id": "edit", "title": "Edit first post"}
      ]
    }
  ]
}"#;

/// Two leaves, one of them vague.
pub const VAGUE_TREE: &str = r#"{
  "id": "root",
  "title": "Launch blog",
  "children": [
    {"id": "stuff", "title": "Do stuff"},
    {"id": "draft", "title": "Draft first post"}
  ]
}"#;

/// Siblings depending on each other.
pub const CYCLIC_TREE: &str = r#"{
  "id": "root",
  "title": "Release",
  "children": [
    {"id": "a", "title": "Build artifacts", "dependencies": ["b"]},
    {"id": "b", "title": "Sign artifacts", "dependencies": ["a"]}
  ]
}"#;

pub fn tree(json: &str) -> TaskNode {
    serde_json::from_str(json).expect("fixture tree must parse")
}
