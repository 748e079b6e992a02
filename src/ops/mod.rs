pub mod check;
pub mod compare;
pub mod sync;
pub mod task_tree;
