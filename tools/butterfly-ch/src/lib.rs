//! Contraction Hierarchy preprocessing for butterfly-osm
//!
//! Takes a weighted directed graph (weights come from an external cost
//! profile), orders its vertices and inserts the shortcuts an upward
//! bidirectional query needs. The graph is mutated in place: on return every
//! vertex has a level and the shortcuts sit next to the original edges.
//!
//! ```no_run
//! use butterfly_ch::{contract, ContractionConfig, EdgeListFile, Hierarchy, HierarchyFile};
//!
//! # fn main() -> butterfly_ch::Result<()> {
//! let mut graph = EdgeListFile::read("graph.json")?.to_graph::<f32>()?;
//! let stats = contract(&mut graph, ContractionConfig::default())?;
//! println!("{} shortcuts", stats.n_shortcuts);
//! HierarchyFile::write("graph.ch.json", &Hierarchy::from_graph(&graph)?)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contraction;
pub mod dir;
pub mod error;
pub mod graph;
pub mod search;
pub mod validate;
pub mod weight;
pub mod witness;

pub use config::{ContractionConfig, PriorityParams};
pub use contraction::{contract, ContractionState, HierarchyBuilder, HierarchyStats, VertexInfo};
pub use dir::{Dir, Shortcut, WeightAndDir};
pub use error::{ContractError, Result};
pub use graph::io::{EdgeList, EdgeListFile, EdgeRecord, Hierarchy, HierarchyFile, WitnessGraphFile};
pub use graph::{DirectedGraph, Edge, EdgeUpdate, OriginalEdge, VertexId};
pub use validate::{validate_hierarchy, ValidationResult};
pub use weight::Weight;
pub use witness::{DykstraWitnessCalculator, NeighbourWitnessCalculator, Witness, WitnessGraph};
