//! Vertex ordering and shortcut insertion
//!
//! [`VertexInfo`] holds the working set of one candidate vertex and computes
//! its shortcuts and priority; [`HierarchyBuilder`] drives the contraction
//! loop over the whole graph.

mod hierarchy;
mod vertex_info;

pub use hierarchy::{contract, ContractionState, HierarchyBuilder, HierarchyStats};
pub use vertex_info::{VertexInfo, WitnessSummary};
