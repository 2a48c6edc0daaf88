//! Task tree model and the merged graph derived from it.

pub mod dag;
pub mod task;

pub use dag::{EdgeKind, TaskGraph};
pub use task::{collect_all_nodes, collect_depths, collect_leaves, NodeMap, Priority, TaskNode};
