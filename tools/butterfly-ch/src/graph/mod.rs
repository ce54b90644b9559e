//! Directed weighted graph used (and mutated) by the contraction
//!
//! Every relation between two vertices is stored at both endpoints: at `v1`
//! as `v1 -> v2` with mask `dir`, at `v2` as `v2 -> v1` with `dir.reverse()`.
//! Forward and backward weights of a relation therefore live together and a
//! lookup from either side sees the same data.
//!
//! The contraction only ever adds edges (or replaces parallel edges by a
//! strictly better one); contracted vertices keep their edges so the upward
//! search of the query engine can still use them.

mod original_edge;
pub mod io;

pub use original_edge::OriginalEdge;

use crate::dir::{pack_weight_and_dir, Dir, Shortcut, WeightAndDir};
use crate::error::{ContractError, Result};
use crate::weight::Weight;

pub type VertexId = u32;

/// Level value of a vertex that has not been contracted yet
pub const NO_LEVEL: u32 = u32::MAX;

/// One incident edge as seen from the vertex whose list it is stored in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<W> {
    pub neighbour: VertexId,
    pub weight: W,
    pub dir: Dir,
    /// Contracted vertex this shortcut bypasses; `None` for original edges
    pub via: Option<VertexId>,
}

impl<W: Weight> Edge<W> {
    #[inline]
    pub fn weight_and_dir(&self) -> WeightAndDir<W> {
        WeightAndDir::new(self.weight, self.dir)
    }

    /// Storage word of this edge (see [`crate::dir`] for the layout)
    pub fn packed(&self) -> Result<u32> {
        pack_weight_and_dir(self.weight_and_dir())
    }

    #[inline]
    pub fn is_shortcut(&self) -> bool {
        self.via.is_some()
    }
}

/// Edge counts produced by an insert-or-update, fed into the priority formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeUpdate {
    pub added: u32,
    pub removed: u32,
}

impl EdgeUpdate {
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Iterator over the edges incident to one vertex
#[derive(Debug, Clone)]
pub struct EdgeEnumerator<'a, W> {
    iter: std::slice::Iter<'a, Edge<W>>,
}

impl<'a, W: Copy> Iterator for EdgeEnumerator<'a, W> {
    type Item = Edge<W>;

    #[inline]
    fn next(&mut self) -> Option<Edge<W>> {
        self.iter.next().copied()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, W: Copy> ExactSizeIterator for EdgeEnumerator<'a, W> {}

/// Replacement computed for the parallel edges between two vertices
#[derive(Debug)]
struct UpdatePlan<W> {
    update: EdgeUpdate,
    entries: [Option<Edge<W>>; 2],
}

/// Adjacency-list graph with per-vertex contraction levels
#[derive(Debug, Clone)]
pub struct DirectedGraph<W> {
    adjacency: Vec<Vec<Edge<W>>>,
    levels: Vec<u32>,
    edge_count: usize,
}

impl<W: Weight> DirectedGraph<W> {
    pub fn new(vertex_count: u32) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertex_count as usize],
            levels: vec![NO_LEVEL; vertex_count as usize],
            edge_count: 0,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.adjacency.len() as u32
    }

    /// Number of stored relations (a mirrored pair counts once)
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of stored relations that are shortcuts
    pub fn shortcut_count(&self) -> usize {
        self.relations().filter(|(_, e)| e.is_shortcut()).count()
    }

    #[inline]
    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        (vertex as usize) < self.adjacency.len()
    }

    /// Insert a raw edge; parallel edges are kept as they are
    ///
    /// Panics if either vertex is out of range; loaders validate ids first.
    pub fn add_edge(&mut self, vertex1: VertexId, vertex2: VertexId, weight: W, dir: Dir) {
        self.push_relation(
            vertex1,
            Edge {
                neighbour: vertex2,
                weight,
                dir,
                via: None,
            },
        );
    }

    fn push_relation(&mut self, vertex1: VertexId, edge: Edge<W>) {
        let vertex2 = edge.neighbour;
        self.adjacency[vertex1 as usize].push(edge);
        if vertex1 != vertex2 {
            self.adjacency[vertex2 as usize].push(Edge {
                neighbour: vertex1,
                dir: edge.dir.reverse(),
                ..edge
            });
        }
        self.edge_count += 1;
    }

    /// All edges incident to `vertex`
    #[inline]
    pub fn edges(&self, vertex: VertexId) -> EdgeEnumerator<'_, W> {
        EdgeEnumerator {
            iter: self.adjacency[vertex as usize].iter(),
        }
    }

    #[inline]
    pub fn degree(&self, vertex: VertexId) -> usize {
        self.adjacency[vertex as usize].len()
    }

    /// Every relation exactly once, from its lower endpoint
    pub fn relations(&self) -> impl Iterator<Item = (VertexId, Edge<W>)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(v, edges)| {
            let v = v as VertexId;
            edges
                .iter()
                .filter(move |e| v <= e.neighbour)
                .map(move |e| (v, *e))
        })
    }

    #[inline]
    pub fn level(&self, vertex: VertexId) -> Option<u32> {
        match self.levels[vertex as usize] {
            NO_LEVEL => None,
            level => Some(level),
        }
    }

    #[inline]
    pub fn is_contracted(&self, vertex: VertexId) -> bool {
        self.levels[vertex as usize] != NO_LEVEL
    }

    pub fn set_level(&mut self, vertex: VertexId, level: u32) -> Result<()> {
        if level == NO_LEVEL {
            return Err(ContractError::InvariantViolation(format!(
                "level {level} is reserved"
            )));
        }
        if self.is_contracted(vertex) {
            return Err(ContractError::InvariantViolation(format!(
                "vertex {vertex} contracted twice"
            )));
        }
        self.levels[vertex as usize] = level;
        Ok(())
    }

    /// Raw level array, `NO_LEVEL` for uncontracted vertices
    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    /// Best existing `vertex1 -> vertex2` (forward) and `vertex2 -> vertex1` (backward) weights
    pub fn best_weights(&self, vertex1: VertexId, vertex2: VertexId) -> Shortcut<W> {
        let mut best: Shortcut<W> = Shortcut::none();
        for e in self.adjacency[vertex1 as usize].iter().filter(|e| e.neighbour == vertex2) {
            if e.dir.forward() {
                best.forward = best.forward.min_weight(e.weight);
            }
            if e.dir.backward() {
                best.backward = best.backward.min_weight(e.weight);
            }
        }
        best
    }

    fn plan_update(
        &self,
        vertex1: VertexId,
        vertex2: VertexId,
        candidate: Shortcut<W>,
        via: Option<VertexId>,
    ) -> UpdatePlan<W> {
        let mut forward: (W, Option<VertexId>) = (W::INFINITE, None);
        let mut backward: (W, Option<VertexId>) = (W::INFINITE, None);
        let mut existing = 0u32;

        for e in self.adjacency[vertex1 as usize].iter().filter(|e| e.neighbour == vertex2) {
            existing += 1;
            if e.dir.forward() && e.weight < forward.0 {
                forward = (e.weight, e.via);
            }
            if e.dir.backward() && e.weight < backward.0 {
                backward = (e.weight, e.via);
            }
        }

        let forward_improves = candidate.forward.is_finite() && candidate.forward < forward.0;
        let backward_improves = candidate.backward.is_finite() && candidate.backward < backward.0;
        if !forward_improves && !backward_improves {
            return UpdatePlan {
                update: EdgeUpdate::default(),
                entries: [None, None],
            };
        }
        if forward_improves {
            forward = (candidate.forward, via);
        }
        if backward_improves {
            backward = (candidate.backward, via);
        }

        let make = |(weight, via): (W, Option<VertexId>), dir: Dir| Edge {
            neighbour: vertex2,
            weight,
            dir,
            via,
        };
        let entries = if forward.0.is_finite() && forward.0 == backward.0 && forward.1 == backward.1 {
            [Some(make(forward, Dir::BOTH)), None]
        } else {
            [
                forward.0.is_finite().then(|| make(forward, Dir::FORWARD)),
                backward.0.is_finite().then(|| make(backward, Dir::BACKWARD)),
            ]
        };
        let added = entries.iter().flatten().count() as u32;

        UpdatePlan {
            update: EdgeUpdate {
                added,
                removed: existing,
            },
            entries,
        }
    }

    /// Counts what [`add_or_update_edge`](Self::add_or_update_edge) would do, without mutating
    pub fn try_add_or_update_edge(
        &self,
        vertex1: VertexId,
        vertex2: VertexId,
        candidate: Shortcut<W>,
        via: Option<VertexId>,
    ) -> EdgeUpdate {
        if vertex1 == vertex2 {
            return EdgeUpdate::default();
        }
        self.plan_update(vertex1, vertex2, candidate, via).update
    }

    /// Insert `candidate` between `vertex1` and `vertex2`, or strengthen what is there
    ///
    /// A direction is only written when the candidate is strictly better than
    /// every existing parallel edge in that direction. When anything changes,
    /// the parallel edges are replaced by the best forward/backward pair
    /// (a single `BOTH` edge if both directions agree).
    pub fn add_or_update_edge(
        &mut self,
        vertex1: VertexId,
        vertex2: VertexId,
        candidate: Shortcut<W>,
        via: Option<VertexId>,
    ) -> Result<EdgeUpdate> {
        if vertex1 == vertex2 {
            return Err(ContractError::InvariantViolation(format!(
                "shortcut from vertex {vertex1} to itself"
            )));
        }
        let plan = self.plan_update(vertex1, vertex2, candidate, via);
        if plan.update.is_noop() {
            return Ok(plan.update);
        }

        self.adjacency[vertex1 as usize].retain(|e| e.neighbour != vertex2);
        let mirrored_before = self.adjacency[vertex2 as usize].len();
        self.adjacency[vertex2 as usize].retain(|e| e.neighbour != vertex1);
        let mirrored_removed = (mirrored_before - self.adjacency[vertex2 as usize].len()) as u32;
        if mirrored_removed != plan.update.removed {
            return Err(ContractError::InvariantViolation(format!(
                "relation {vertex1}-{vertex2} has {} edges at {vertex1} but {mirrored_removed} at {vertex2}",
                plan.update.removed
            )));
        }

        self.edge_count -= plan.update.removed as usize;
        for edge in plan.entries.into_iter().flatten() {
            self.push_relation(vertex1, edge);
        }
        Ok(plan.update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> DirectedGraph<f32> {
        let mut g = DirectedGraph::new(3);
        g.add_edge(0, 1, 1.0, Dir::BOTH);
        g.add_edge(1, 2, 2.0, Dir::FORWARD);
        g
    }

    #[test]
    fn edges_are_mirrored() {
        let g = line();
        assert_eq!(g.edge_count(), 2);
        let at_two: Vec<_> = g.edges(2).collect();
        assert_eq!(at_two.len(), 1);
        assert_eq!(at_two[0].neighbour, 1);
        assert_eq!(at_two[0].dir, Dir::BACKWARD);
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.relations().count(), 2);
    }

    #[test]
    fn best_weights_are_symmetric() {
        let g = line();
        assert_eq!(g.best_weights(1, 2), Shortcut::new(2.0, f32::INFINITE));
        assert_eq!(g.best_weights(2, 1), Shortcut::new(f32::INFINITE, 2.0));
    }

    #[test]
    fn new_relation_is_added() {
        let mut g = line();
        let update = g.add_or_update_edge(0, 2, Shortcut::new(3.0, f32::INFINITE), Some(1)).unwrap();
        assert_eq!(update, EdgeUpdate { added: 1, removed: 0 });
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.shortcut_count(), 1);
        let e = g.edges(2).find(|e| e.neighbour == 0).unwrap();
        assert_eq!(e.dir, Dir::BACKWARD);
        assert_eq!(e.via, Some(1));
    }

    #[test]
    fn equal_or_worse_candidate_is_dropped() {
        let mut g = line();
        let before = g.edge_count();
        let update = g.add_or_update_edge(1, 2, Shortcut::new(2.0, f32::INFINITE), Some(0)).unwrap();
        assert!(update.is_noop());
        let update = g.add_or_update_edge(1, 2, Shortcut::new(5.0, f32::INFINITE), Some(0)).unwrap();
        assert!(update.is_noop());
        assert_eq!(g.edge_count(), before);
    }

    #[test]
    fn strictly_better_candidate_coalesces() {
        let mut g = line();
        let update = g.add_or_update_edge(0, 1, Shortcut::new(0.5, 0.5), Some(2)).unwrap();
        assert_eq!(update, EdgeUpdate { added: 1, removed: 1 });
        let edges: Vec<_> = g.edges(0).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].dir, Dir::BOTH);
        assert_eq!(edges[0].weight, 0.5);
    }

    #[test]
    fn partially_better_candidate_splits_directions() {
        let mut g = line();
        let update = g.add_or_update_edge(0, 1, Shortcut::new(0.5, 4.0), Some(2)).unwrap();
        assert_eq!(update, EdgeUpdate { added: 2, removed: 1 });
        assert_eq!(g.best_weights(0, 1), Shortcut::new(0.5, 1.0));
        let original = g.edges(0).find(|e| e.dir == Dir::BACKWARD).unwrap();
        assert_eq!(original.via, None);
        assert_eq!(g.edges(1).filter(|e| e.neighbour == 0).count(), 2);
    }

    #[test]
    fn simulation_matches_commit() {
        let mut g = line();
        let candidate = Shortcut::new(0.5, 4.0);
        let simulated = g.try_add_or_update_edge(0, 1, candidate, Some(2));
        let committed = g.add_or_update_edge(0, 1, candidate, Some(2)).unwrap();
        assert_eq!(simulated, committed);
    }

    #[test]
    fn self_shortcut_is_an_invariant_violation() {
        let mut g = line();
        assert!(matches!(
            g.add_or_update_edge(1, 1, Shortcut::new(1.0, 1.0), Some(0)),
            Err(ContractError::InvariantViolation(_))
        ));
        assert!(g.try_add_or_update_edge(1, 1, Shortcut::new(1.0, 1.0), Some(0)).is_noop());
    }

    #[test]
    fn levels() {
        let mut g = line();
        assert_eq!(g.level(1), None);
        g.set_level(1, 0).unwrap();
        assert!(g.is_contracted(1));
        assert_eq!(g.level(1), Some(0));
        assert!(g.set_level(1, 1).is_err());
    }

    #[test]
    fn self_loops_are_stored_once() {
        let mut g: DirectedGraph<f32> = DirectedGraph::new(1);
        g.add_edge(0, 0, 1.0, Dir::BOTH);
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.relations().count(), 1);
    }
}
