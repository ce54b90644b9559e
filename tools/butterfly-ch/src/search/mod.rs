//! Reusable scratch space for bounded local searches
//!
//! Both structures are cleared by resetting a length counter. A witness
//! calculator owns one of each and reuses them for every search it runs.

mod binary_heap;
mod path_tree;

pub use binary_heap::BinaryHeap;
pub use path_tree::{PathEntry, PathTree, NO_PREDECESSOR};
