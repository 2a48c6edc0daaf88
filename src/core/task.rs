//! Task tree data model.
//!
//! A decomposition is a tree of [`TaskNode`]s. Children are owned by their
//! parent; dependencies refer to other nodes of the same tree by id. The
//! traversal helpers here build the id-keyed indices every metric reads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// A node in the task decomposition tree.
///
/// `id` must be unique across the whole tree. This is not checked here;
/// see [`collect_all_nodes`] for what happens when it is violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Estimated effort in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_estimate: Option<f64>,
    #[serde(default)]
    pub children: Vec<TaskNode>,
    /// Ids of nodes that must conceptually precede this one. Ids that do not
    /// resolve within the tree are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl TaskNode {
    /// Create a leaf node with no optional fields set.
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            priority: None,
            effort_estimate: None,
            children: Vec::new(),
            dependencies: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_effort(mut self, hours: f64) -> Self {
        self.effort_estimate = Some(hours);
        self
    }

    pub fn with_children(mut self, children: Vec<TaskNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_dependencies(mut self, ids: &[&str]) -> Self {
        self.dependencies = Some(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Dependency ids, empty when none are declared.
    pub fn dependency_ids(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or(&[])
    }

    /// Title followed by the description, trimmed. Used as embedding input.
    pub fn text(&self) -> String {
        match &self.description {
            Some(desc) => format!("{} {}", self.title, desc).trim().to_string(),
            None => self.title.trim().to_string(),
        }
    }

    /// Total number of nodes in this subtree, duplicates included.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(TaskNode::subtree_size).sum::<usize>()
    }
}

/// Id-keyed view of every node in a tree, in pre-order.
///
/// Insertion order is the order in which each id was first seen. When an
/// id occurs more than once, the later node replaces the earlier one at the
/// earlier position, so lookups always see the last node with that id.
#[derive(Debug, Clone, Default)]
pub struct NodeMap<'a> {
    entries: Vec<(&'a str, &'a TaskNode)>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> NodeMap<'a> {
    fn insert(&mut self, node: &'a TaskNode) {
        match self.positions.get(node.id.as_str()) {
            Some(&pos) => self.entries[pos].1 = node,
            None => {
                self.positions.insert(node.id.as_str(), self.entries.len());
                self.entries.push((node.id.as_str(), node));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a TaskNode> {
        self.positions.get(id).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &'a TaskNode> + '_ {
        self.entries.iter().map(|(_, node)| *node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a TaskNode)> + '_ {
        self.entries.iter().copied()
    }
}

/// Collect every node of the tree keyed by id, in pre-order.
pub fn collect_all_nodes(root: &TaskNode) -> NodeMap<'_> {
    fn visit<'a>(node: &'a TaskNode, map: &mut NodeMap<'a>) {
        map.insert(node);
        for child in &node.children {
            visit(child, map);
        }
    }

    let mut map = NodeMap::default();
    visit(root, &mut map);
    map
}

/// Depth of every node id; the root is at depth 0.
///
/// Duplicate ids keep the depth of the last occurrence in pre-order.
pub fn collect_depths(root: &TaskNode) -> HashMap<&str, usize> {
    fn visit<'a>(node: &'a TaskNode, depth: usize, depths: &mut HashMap<&'a str, usize>) {
        depths.insert(node.id.as_str(), depth);
        for child in &node.children {
            visit(child, depth + 1, depths);
        }
    }

    let mut depths = HashMap::new();
    visit(root, 0, &mut depths);
    depths
}

/// Leaf nodes of the id-keyed view, in traversal order.
pub fn collect_leaves<'a>(nodes: &NodeMap<'a>) -> Vec<&'a TaskNode> {
    nodes.nodes().filter(|node| node.is_leaf()).collect()
}
