use rustc_hash::FxHashMap;

use crate::config::PriorityParams;
use crate::dir::{Dir, Shortcut};
use crate::graph::{DirectedGraph, Edge, EdgeUpdate, OriginalEdge, VertexId};
use crate::weight::Weight;
use crate::witness::{DykstraWitnessCalculator, WitnessGraph, WitnessTarget};

/// Totals over the witness searches run for one vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WitnessSummary {
    pub searches: usize,
    pub exhausted: usize,
    pub settled: usize,
}

/// Working set of the vertex currently considered for contraction
///
/// Pooled: `clear` keeps every buffer so the next vertex reuses them.
/// Shortcuts are keyed by the normalised endpoint pair, `forward` being
/// `vertex1 -> vertex2`.
#[derive(Debug)]
pub struct VertexInfo<W> {
    vertex: VertexId,
    edges: Vec<Edge<W>>,
    shortcuts: FxHashMap<OriginalEdge, Shortcut<W>>,
    pub depth: u32,
    pub contracted_neighbours: u32,
    sorted: Vec<(OriginalEdge, Shortcut<W>)>,
    targets: Vec<WitnessTarget<W>>,
}

impl<W: Weight> Default for VertexInfo<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Weight> VertexInfo<W> {
    pub fn new() -> Self {
        Self {
            vertex: 0,
            edges: Vec::new(),
            shortcuts: FxHashMap::default(),
            depth: 0,
            contracted_neighbours: 0,
            sorted: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.vertex = 0;
        self.edges.clear();
        self.shortcuts.clear();
        self.depth = 0;
        self.contracted_neighbours = 0;
    }

    #[inline]
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Snapshot of the edges to uncontracted neighbours
    pub fn edges(&self) -> &[Edge<W>] {
        &self.edges
    }

    /// Distinct uncontracted neighbours, ascending
    pub fn neighbours(&self) -> Vec<VertexId> {
        let mut out: Vec<_> = self.edges.iter().map(|e| e.neighbour).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn shortcut_count(&self) -> usize {
        self.shortcuts.len()
    }

    /// Current shortcuts ordered by endpoint pair
    pub fn shortcuts(&self) -> Vec<(OriginalEdge, Shortcut<W>)> {
        let mut out: Vec<_> = self.shortcuts.iter().map(|(k, s)| (*k, *s)).collect();
        out.sort_unstable_by_key(|(k, _)| *k);
        out
    }

    /// Shortcut between `vertex1` and `vertex2`, oriented `vertex1 -> vertex2`
    pub fn shortcut(&self, vertex1: VertexId, vertex2: VertexId) -> Option<Shortcut<W>> {
        let (key, flipped) = OriginalEdge::new(vertex1, vertex2).normalized();
        self.shortcuts
            .get(&key)
            .map(|s| if flipped { s.reverse() } else { *s })
    }

    /// Load `vertex` and its edges; self-loops and edges into the contracted part are skipped
    pub fn add_relevant_edges(&mut self, graph: &DirectedGraph<W>, vertex: VertexId) {
        self.vertex = vertex;
        self.edges.extend(
            graph
                .edges(vertex)
                .filter(|e| e.neighbour != vertex && !graph.is_contracted(e.neighbour) && !e.dir.is_none()),
        );
    }

    /// Propose a shortcut for every pair of edges a path can take through the vertex
    pub fn build_shortcuts(&mut self) {
        for j in 1..self.edges.len() {
            let ej = self.edges[j];
            for k in 0..j {
                let ek = self.edges[k];
                if ej.neighbour == ek.neighbour {
                    continue;
                }
                // ej seen from its far end, then ek
                let through = ej.dir.reverse() & ek.dir;
                if through.is_none() {
                    continue;
                }
                let weight = ej.weight.saturating_add(ek.weight);
                let mut candidate = Shortcut::new(
                    if through.forward() { weight } else { W::INFINITE },
                    if through.backward() { weight } else { W::INFINITE },
                );
                let (key, flipped) = OriginalEdge::new(ej.neighbour, ek.neighbour).normalized();
                if flipped {
                    candidate = candidate.reverse();
                }
                self.shortcuts
                    .entry(key)
                    .or_insert_with(Shortcut::none)
                    .merge_min(candidate);
            }
        }
    }

    /// Drop directions the shared witness graph already beats by more than `epsilon`
    pub fn remove_shortcuts(&mut self, witnesses: &WitnessGraph<W>, epsilon: f64) -> usize {
        let beaten = |witness: W, candidate: W| {
            witness.is_finite() && candidate.is_finite() && witness.to_f64() + epsilon < candidate.to_f64()
        };
        let mut dropped = 0;
        for (key, shortcut) in self.shortcuts.iter_mut() {
            let known = witnesses.get(key.vertex1, key.vertex2);
            if beaten(known.forward, shortcut.forward) {
                shortcut.forward = W::INFINITE;
                dropped += 1;
            }
            if beaten(known.backward, shortcut.backward) {
                shortcut.backward = W::INFINITE;
                dropped += 1;
            }
        }
        self.shortcuts.retain(|_, s| s.is_needed());
        dropped
    }

    /// Run one bounded search per shortcut source and drop witnessed directions
    pub fn witness(
        &mut self,
        graph: &DirectedGraph<W>,
        calculator: &mut DykstraWitnessCalculator<W>,
    ) -> WitnessSummary {
        let mut summary = WitnessSummary::default();
        self.sorted.clear();
        self.sorted.extend(self.shortcuts.iter().map(|(k, s)| (*k, *s)));
        self.sorted.sort_unstable_by_key(|(k, _)| *k);

        let mut start = 0;
        while start < self.sorted.len() {
            let source = self.sorted[start].0.vertex1;
            let end = start
                + self.sorted[start..]
                    .iter()
                    .take_while(|(k, _)| k.vertex1 == source)
                    .count();

            self.targets.clear();
            self.targets.extend(
                self.sorted[start..end]
                    .iter()
                    .map(|(k, s)| WitnessTarget::new(k.vertex2, *s)),
            );
            let stats = calculator.calculate(graph, source, self.vertex, &mut self.targets);
            summary.searches += 1;
            summary.settled += stats.settled;
            if stats.exhausted {
                summary.exhausted += 1;
            }
            for t in &self.targets {
                let key = OriginalEdge::new(source, t.target);
                if t.shortcut.is_needed() {
                    self.shortcuts.insert(key, t.shortcut);
                } else {
                    self.shortcuts.remove(&key);
                }
            }
            start = end;
        }
        summary
    }

    /// Edge counts if every remaining shortcut were committed and the vertex removed
    pub fn simulate(&self, graph: &DirectedGraph<W>) -> EdgeUpdate {
        let mut update = EdgeUpdate {
            added: 0,
            removed: self.edges.len() as u32,
        };
        for (key, shortcut) in &self.shortcuts {
            let u = graph.try_add_or_update_edge(key.vertex1, key.vertex2, *shortcut, Some(self.vertex));
            update.added += u.added;
            update.removed += u.removed;
        }
        update
    }

    /// Lower is contracted sooner
    pub fn priority(&self, graph: &DirectedGraph<W>, params: &PriorityParams) -> f32 {
        let update = self.simulate(graph);
        let edge_difference = update.added as f32 - update.removed as f32;
        params.edge_difference * edge_difference
            + params.depth * self.depth as f32
            + params.contracted_neighbours * self.contracted_neighbours as f32
    }

    /// Mask of the through path `vertex1 -> vertex -> vertex2`, if any shortcut exists
    pub fn through_dir(&self, vertex1: VertexId, vertex2: VertexId) -> Dir {
        self.shortcut(vertex1, vertex2).map_or(Dir::NONE, |s| s.dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> DirectedGraph<f32> {
        // 1 -> 0 -> 2 one way, 0 <-> 3 both ways
        let mut g = DirectedGraph::new(4);
        g.add_edge(1, 0, 1.0, Dir::FORWARD);
        g.add_edge(0, 2, 2.0, Dir::FORWARD);
        g.add_edge(0, 3, 4.0, Dir::BOTH);
        g
    }

    fn load(g: &DirectedGraph<f32>, v: VertexId) -> VertexInfo<f32> {
        let mut info = VertexInfo::new();
        info.add_relevant_edges(g, v);
        info.build_shortcuts();
        info
    }

    #[test]
    fn shortcuts_follow_direction_masks() {
        let info = load(&star(), 0);
        assert_eq!(info.shortcut_count(), 3);
        // 1 -> 0 -> 2 only
        assert_eq!(info.shortcut(1, 2), Some(Shortcut::new(3.0, f32::INFINITE)));
        assert_eq!(info.shortcut(2, 1), Some(Shortcut::new(f32::INFINITE, 3.0)));
        // 1 -> 0 -> 3 only, 3 -> 0 -> 2 only
        assert_eq!(info.through_dir(1, 3), Dir::FORWARD);
        assert_eq!(info.shortcut(3, 2), Some(Shortcut::new(6.0, f32::INFINITE)));
    }

    #[test]
    fn blocked_pairs_give_no_shortcut() {
        // 1 -> 0 and 2 -> 0: nothing can pass through 0
        let mut g = DirectedGraph::new(3);
        g.add_edge(1, 0, 1.0, Dir::FORWARD);
        g.add_edge(2, 0, 1.0, Dir::FORWARD);
        let info = load(&g, 0);
        assert_eq!(info.shortcut_count(), 0);
    }

    #[test]
    fn parallel_edges_keep_the_minimum() {
        let mut g = DirectedGraph::new(3);
        g.add_edge(1, 0, 5.0, Dir::BOTH);
        g.add_edge(1, 0, 1.0, Dir::FORWARD);
        g.add_edge(0, 2, 1.0, Dir::BOTH);
        let info = load(&g, 0);
        assert_eq!(info.shortcut(1, 2), Some(Shortcut::new(2.0, 6.0)));
    }

    #[test]
    fn contracted_neighbours_and_self_loops_are_ignored() {
        let mut g = star();
        g.add_edge(0, 0, 1.0, Dir::BOTH);
        g.set_level(3, 0).unwrap();
        let info = load(&g, 0);
        assert_eq!(info.edges().len(), 2);
        assert_eq!(info.neighbours(), vec![1, 2]);
        assert_eq!(info.shortcut_count(), 1);
    }

    #[test]
    fn witness_graph_removes_beaten_directions() {
        let mut info = load(&star(), 0);
        let witnesses = WitnessGraph::new();
        witnesses.add(crate::witness::Witness::new(2, 1, Shortcut::new(f32::INFINITE, 2.5)));
        witnesses.add(crate::witness::Witness::new(1, 3, Shortcut::new(5.0, f32::INFINITE)));
        let dropped = info.remove_shortcuts(&witnesses, 0.0);
        assert_eq!(dropped, 1);
        assert_eq!(info.shortcut(1, 2), None);
        // equal weight is not enough
        assert_eq!(info.through_dir(1, 3), Dir::FORWARD);
    }

    #[test]
    fn dykstra_pass_drops_witnessed_shortcuts() {
        let mut g = star();
        g.add_edge(1, 2, 3.0, Dir::FORWARD);
        let mut info = load(&g, 0);
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        let summary = info.witness(&g, &mut calc);
        assert!(summary.searches >= 1);
        assert_eq!(info.shortcut(1, 2), None);
        assert!(info.shortcut(1, 3).is_some());
    }

    #[test]
    fn priority_counts_vertex_edges_as_removed() {
        let g = star();
        let mut info = load(&g, 0);
        info.depth = 2;
        info.contracted_neighbours = 1;
        let update = info.simulate(&g);
        assert_eq!(update, EdgeUpdate { added: 3, removed: 3 });
        let params = PriorityParams::default();
        assert_eq!(info.priority(&g, &params), 5.0 * 0.0 + 5.0 * 2.0 + 1.0);
    }

    #[test]
    fn clear_resets_for_reuse() {
        let g = star();
        let mut info = load(&g, 0);
        info.clear();
        info.add_relevant_edges(&g, 2);
        info.build_shortcuts();
        assert_eq!(info.vertex(), 2);
        assert_eq!(info.shortcut_count(), 0);
        assert_eq!(info.depth, 0);
    }
}
