//! Witness searches: decide which candidate shortcuts are dominated
//!
//! A witness is a path between two neighbours of the vertex being contracted
//! that does not pass through it and is at least as short as the shortcut
//! that would replace the two-edge path through it.
//!
//! * [`DykstraWitnessCalculator`] runs one bounded search per source for the
//!   vertex currently being contracted.
//! * [`NeighbourWitnessCalculator`] precomputes witnesses between vertices two
//!   hops apart and stores them in the shared [`WitnessGraph`], so that many
//!   candidates are dropped before the per-vertex search runs.
//!
//! Both calculators search forward and backward at once: every label carries
//! a [`Dir`](crate::dir::Dir) mask and a direction is settled independently of
//! the other. Exhausting a hop or settle bound is never an error; whatever is
//! left unresolved is kept as a real shortcut.

mod bounded;
mod dykstra;
mod neighbour;
mod witness_graph;

pub use bounded::WitnessSearchStats;
pub use dykstra::{DykstraWitnessCalculator, WitnessTarget};
pub use neighbour::NeighbourWitnessCalculator;
pub use witness_graph::{Witness, WitnessGraph, WitnessRecord};
