use rustc_hash::{FxHashMap, FxHashSet};

use super::bounded::{BoundedSearch, SearchBounds, WitnessSearchStats};
use super::witness_graph::Witness;
use crate::dir::{Dir, Shortcut};
use crate::graph::{DirectedGraph, VertexId};
use crate::weight::Weight;

/// Two-hop witness precompute around a pivot
///
/// Records the best `pivot -> a -> b` weight for every vertex `b` two hops
/// away, then searches from the pivot. When `b` is settled strictly below its
/// recorded two-hop weight, some other path is shorter than any shortcut
/// `pivot <-> b` through a common neighbour, and a [`Witness`] is emitted.
#[derive(Debug)]
pub struct NeighbourWitnessCalculator<W> {
    hop_limit: u32,
    max_settles: usize,
    search: BoundedSearch<W>,
    two_hop: FxHashMap<VertexId, Shortcut<W>>,
    pending: FxHashMap<VertexId, Dir>,
    found: FxHashMap<VertexId, Shortcut<W>>,
}

impl<W: Weight> NeighbourWitnessCalculator<W> {
    pub fn new(hop_limit: u32, max_settles: usize) -> Self {
        Self {
            hop_limit,
            max_settles,
            search: BoundedSearch::new(),
            two_hop: FxHashMap::default(),
            pending: FxHashMap::default(),
            found: FxHashMap::default(),
        }
    }

    /// Emit witnesses `(pivot, other)` into `sink`
    ///
    /// With `dirty` set, only two-hop paths whose middle or end vertex is in
    /// the set are considered; the rest are assumed unchanged since the last
    /// run for this pivot.
    pub fn run<F>(
        &mut self,
        graph: &DirectedGraph<W>,
        pivot: VertexId,
        dirty: Option<&FxHashSet<VertexId>>,
        mut sink: F,
    ) -> WitnessSearchStats
    where
        F: FnMut(Witness<W>),
    {
        self.two_hop.clear();
        self.pending.clear();
        self.found.clear();
        if graph.is_contracted(pivot) {
            return WitnessSearchStats::default();
        }

        for first in graph.edges(pivot) {
            let middle = first.neighbour;
            if middle == pivot || graph.is_contracted(middle) {
                continue;
            }
            for second in graph.edges(middle) {
                let other = second.neighbour;
                if other == pivot || other == middle || graph.is_contracted(other) {
                    continue;
                }
                if let Some(dirty) = dirty {
                    if !dirty.contains(&middle) && !dirty.contains(&other) {
                        continue;
                    }
                }
                let dirs = first.dir & second.dir;
                if dirs.is_none() {
                    continue;
                }
                let weight = first.weight.saturating_add(second.weight);
                let best = self.two_hop.entry(other).or_insert_with(Shortcut::none);
                if dirs.forward() {
                    best.forward = best.forward.min_weight(weight);
                }
                if dirs.backward() {
                    best.backward = best.backward.min_weight(weight);
                }
            }
        }
        if self.two_hop.is_empty() {
            return WitnessSearchStats::default();
        }

        let mut remaining = [0usize; 2];
        let mut max_two_hop = [f64::NEG_INFINITY; 2];
        for (&other, best) in &self.two_hop {
            let dirs = best.dir();
            self.pending.insert(other, dirs);
            if dirs.forward() {
                remaining[0] += 1;
                max_two_hop[0] = max_two_hop[0].max(best.forward.to_f64());
            }
            if dirs.backward() {
                remaining[1] += 1;
                max_two_hop[1] = max_two_hop[1].max(best.backward.to_f64());
            }
        }
        let bounds = SearchBounds {
            hop_limit: self.hop_limit,
            max_settles: self.max_settles,
            max_forward: max_two_hop[0],
            max_backward: max_two_hop[1],
        };
        let needed = Dir::new(remaining[0] > 0, remaining[1] > 0);

        let two_hop = &self.two_hop;
        let pending = &mut self.pending;
        let found = &mut self.found;
        let stats = self.search.run(graph, pivot, None, bounds, needed, |vertex, dirs, weight| {
            if let Some(open) = pending.get_mut(&vertex) {
                let recorded = two_hop[&vertex];
                if dirs.forward() && open.forward() {
                    if weight < recorded.forward {
                        found.entry(vertex).or_insert_with(Shortcut::none).forward = weight;
                    }
                    remaining[0] -= 1;
                }
                if dirs.backward() && open.backward() {
                    if weight < recorded.backward {
                        found.entry(vertex).or_insert_with(Shortcut::none).backward = weight;
                    }
                    remaining[1] -= 1;
                }
                *open = *open & Dir::from_bits(!dirs.bits());
            }
            Dir::new(remaining[0] > 0, remaining[1] > 0)
        });

        let mut emitted: Vec<_> = self.found.iter().map(|(&other, s)| (other, *s)).collect();
        emitted.sort_unstable_by_key(|(other, _)| *other);
        for (other, s) in emitted {
            sink(Witness::new(pivot, other, s));
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(calc: &mut NeighbourWitnessCalculator<f32>, g: &DirectedGraph<f32>, pivot: VertexId) -> Vec<Witness<f32>> {
        let mut out = Vec::new();
        calc.run(g, pivot, None, |w| out.push(w));
        out
    }

    #[test]
    fn two_hop_path_is_not_its_own_witness() {
        let mut g = DirectedGraph::new(3);
        g.add_edge(0, 1, 1.0, Dir::BOTH);
        g.add_edge(1, 2, 1.0, Dir::BOTH);
        let mut calc = NeighbourWitnessCalculator::new(16, 64);
        assert!(collect(&mut calc, &g, 0).is_empty());
    }

    #[test]
    fn shorter_path_to_two_hop_vertex_is_reported() {
        // 0 - 1 - 2 costs 2 + 2, 0 - 3 - 2 costs 1 + 1
        let mut g = DirectedGraph::new(5);
        g.add_edge(0, 1, 2.0, Dir::BOTH);
        g.add_edge(1, 2, 2.0, Dir::BOTH);
        g.add_edge(0, 3, 1.0, Dir::BOTH);
        g.add_edge(3, 2, 1.0, Dir::BOTH);
        // 0 -> 4 -> 2 costs 10 two hops, but 0 -> 3 -> 2 is 2
        g.add_edge(0, 4, 5.0, Dir::FORWARD);
        g.add_edge(4, 2, 5.0, Dir::FORWARD);
        let mut calc = NeighbourWitnessCalculator::new(16, 64);
        let witnesses = collect(&mut calc, &g, 0);
        // best two-hop to 2 is already 2.0 through 3, nothing strictly shorter
        assert!(witnesses.is_empty());

        let mut g = DirectedGraph::new(5);
        g.add_edge(0, 1, 2.0, Dir::BOTH);
        g.add_edge(1, 2, 2.0, Dir::BOTH);
        g.add_edge(0, 3, 1.0, Dir::BOTH);
        g.add_edge(3, 4, 1.0, Dir::BOTH);
        g.add_edge(4, 2, 1.0, Dir::BOTH);
        let witnesses = collect(&mut calc, &g, 0);
        assert_eq!(witnesses.len(), 1);
        assert_eq!(witnesses[0].vertex1, 0);
        assert_eq!(witnesses[0].vertex2, 2);
        assert_eq!(witnesses[0].forward, 3.0);
        assert_eq!(witnesses[0].backward, 3.0);
    }

    #[test]
    fn one_way_witness_only_in_its_direction() {
        let mut g = DirectedGraph::new(5);
        g.add_edge(0, 1, 2.0, Dir::BOTH);
        g.add_edge(1, 2, 2.0, Dir::BOTH);
        g.add_edge(0, 3, 1.0, Dir::FORWARD);
        g.add_edge(3, 4, 1.0, Dir::FORWARD);
        g.add_edge(4, 2, 1.0, Dir::FORWARD);
        let mut calc = NeighbourWitnessCalculator::new(16, 64);
        let witnesses = collect(&mut calc, &g, 0);
        assert_eq!(witnesses.len(), 1);
        assert_eq!(witnesses[0].forward, 3.0);
        assert!(Weight::is_infinite(witnesses[0].backward));
    }

    #[test]
    fn dirty_set_restricts_two_hop_targets() {
        let mut g = DirectedGraph::new(5);
        g.add_edge(0, 1, 2.0, Dir::BOTH);
        g.add_edge(1, 2, 2.0, Dir::BOTH);
        g.add_edge(0, 3, 1.0, Dir::BOTH);
        g.add_edge(3, 4, 1.0, Dir::BOTH);
        g.add_edge(4, 2, 1.0, Dir::BOTH);
        let mut calc = NeighbourWitnessCalculator::new(16, 64);

        let unrelated: FxHashSet<VertexId> = [4].into_iter().collect();
        let mut out = Vec::new();
        calc.run(&g, 0, Some(&unrelated), |w| out.push(w));
        assert!(out.iter().all(|w| w.vertex2 != 2));

        let touching: FxHashSet<VertexId> = [1].into_iter().collect();
        calc.run(&g, 0, Some(&touching), |w| out.push(w));
        assert!(out.iter().any(|w| w.vertex2 == 2));
    }
}
