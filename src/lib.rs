//! Ordered task lists and nested items held as a tree, with baseline
//! diffing for pushing local edits back to an external task source.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod tree;

pub use model::{Config, Entity, TaskItem, TaskList, TaskStatus};
pub use ops::compare::{TreeComparator, TreeDiff};
pub use ops::sync::{FetchSource, PushSink, SyncError, SyncReport, SyncSession};
pub use ops::task_tree::{TaskTree, TaskTreeError};
pub use tree::{NodeId, Tree, TreeError};
