use rustc_hash::FxHashMap;

use super::bounded::{BoundedSearch, SearchBounds, WitnessSearchStats};
use crate::dir::{Dir, Shortcut};
use crate::graph::{DirectedGraph, VertexId};
use crate::weight::{within_slack, Weight};

/// One candidate shortcut `source <-> target` checked by a search from `source`
///
/// `shortcut.forward` is the weight of `source -> target` through the
/// contracted vertex, `shortcut.backward` of `target -> source`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WitnessTarget<W> {
    pub target: VertexId,
    pub shortcut: Shortcut<W>,
}

impl<W: Weight> WitnessTarget<W> {
    pub fn new(target: VertexId, shortcut: Shortcut<W>) -> Self {
        Self { target, shortcut }
    }
}

/// Single-source bounded multi-target witness search
#[derive(Debug)]
pub struct DykstraWitnessCalculator<W> {
    hop_limit: u32,
    max_settles: usize,
    epsilon: f64,
    search: BoundedSearch<W>,
    // target vertex -> (index into the caller's slice, unresolved directions)
    pending: FxHashMap<VertexId, (usize, Dir)>,
}

impl<W: Weight> DykstraWitnessCalculator<W> {
    pub fn new(hop_limit: u32, max_settles: usize, epsilon: f64) -> Self {
        Self {
            hop_limit,
            max_settles,
            epsilon,
            search: BoundedSearch::new(),
            pending: FxHashMap::default(),
        }
    }

    /// Clear every direction of `targets` that has a witness avoiding `vertex_to_skip`
    ///
    /// Directions already at `W::INFINITE` are not searched for. A direction
    /// left unresolved when a bound is hit keeps its candidate weight.
    pub fn calculate(
        &mut self,
        graph: &DirectedGraph<W>,
        source: VertexId,
        vertex_to_skip: VertexId,
        targets: &mut [WitnessTarget<W>],
    ) -> WitnessSearchStats {
        self.pending.clear();
        let mut remaining = [0usize; 2];
        let mut max_candidate = [f64::NEG_INFINITY; 2];

        for (i, t) in targets.iter().enumerate() {
            if t.target == source || t.target == vertex_to_skip {
                continue;
            }
            let dirs = t.shortcut.dir();
            if dirs.is_none() {
                continue;
            }
            self.pending.insert(t.target, (i, dirs));
            for (slot, (wanted, weight)) in [
                (dirs.forward(), t.shortcut.forward),
                (dirs.backward(), t.shortcut.backward),
            ]
            .into_iter()
            .enumerate()
            {
                if wanted {
                    remaining[slot] += 1;
                    max_candidate[slot] = max_candidate[slot].max(weight.to_f64());
                }
            }
        }

        let needed = Dir::new(remaining[0] > 0, remaining[1] > 0);
        if needed.is_none() {
            return WitnessSearchStats::default();
        }
        let bounds = SearchBounds {
            hop_limit: self.hop_limit,
            max_settles: self.max_settles,
            max_forward: max_candidate[0] + self.epsilon,
            max_backward: max_candidate[1] + self.epsilon,
        };

        let epsilon = self.epsilon;
        let pending = &mut self.pending;
        let mut witnessed = 0usize;
        let stats = self.search.run(graph, source, Some(vertex_to_skip), bounds, needed, |vertex, dirs, weight| {
            if let Some((index, open)) = pending.get_mut(&vertex) {
                let shortcut = &mut targets[*index].shortcut;
                if dirs.forward() && open.forward() {
                    if within_slack(weight, shortcut.forward, epsilon) {
                        shortcut.forward = W::INFINITE;
                        witnessed += 1;
                    }
                    remaining[0] -= 1;
                }
                if dirs.backward() && open.backward() {
                    if within_slack(weight, shortcut.backward, epsilon) {
                        shortcut.backward = W::INFINITE;
                        witnessed += 1;
                    }
                    remaining[1] -= 1;
                }
                *open = *open & Dir::from_bits(!dirs.bits());
            }
            Dir::new(remaining[0] > 0, remaining[1] > 0)
        });

        tracing::trace!(source, vertex_to_skip, targets = targets.len(), witnessed, "witness search");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A=0, B=1, C=2, D=3: A-B-D costs 2, A-C-D costs 6
    fn diamond() -> DirectedGraph<f32> {
        let mut g = DirectedGraph::new(4);
        g.add_edge(0, 1, 1.0, Dir::FORWARD);
        g.add_edge(1, 3, 1.0, Dir::FORWARD);
        g.add_edge(0, 2, 1.0, Dir::FORWARD);
        g.add_edge(2, 3, 5.0, Dir::FORWARD);
        g
    }

    #[test]
    fn longer_alternative_is_no_witness() {
        let g = diamond();
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        let mut targets = [WitnessTarget::new(3, Shortcut::new(2.0, f32::INFINITE))];
        calc.calculate(&g, 0, 1, &mut targets);
        assert_eq!(targets[0].shortcut.forward, 2.0);
    }

    #[test]
    fn shorter_alternative_is_a_witness() {
        let g = diamond();
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        let mut targets = [WitnessTarget::new(3, Shortcut::new(6.0, f32::INFINITE))];
        calc.calculate(&g, 0, 2, &mut targets);
        assert!(Weight::is_infinite(targets[0].shortcut.forward));
    }

    #[test]
    fn equal_weight_witnesses_and_slack_extends_it() {
        let g = diamond();
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        let mut exact = [WitnessTarget::new(3, Shortcut::new(2.0, f32::INFINITE))];
        calc.calculate(&g, 0, 2, &mut exact);
        assert!(Weight::is_infinite(exact[0].shortcut.forward));

        let mut tight = [WitnessTarget::new(3, Shortcut::new(1.5, f32::INFINITE))];
        calc.calculate(&g, 0, 2, &mut tight);
        assert_eq!(tight[0].shortcut.forward, 1.5);

        let mut slack = DykstraWitnessCalculator::new(16, 100, 0.5);
        slack.calculate(&g, 0, 2, &mut tight);
        assert!(Weight::is_infinite(tight[0].shortcut.forward));
    }

    #[test]
    fn directions_resolve_independently() {
        // 0 -> 1 -> 2 and 2 -> 0 directly
        let mut g = DirectedGraph::new(4);
        g.add_edge(0, 1, 1.0, Dir::FORWARD);
        g.add_edge(1, 2, 1.0, Dir::FORWARD);
        g.add_edge(2, 0, 1.0, Dir::FORWARD);
        g.add_edge(0, 3, 1.0, Dir::BOTH);
        g.add_edge(3, 2, 1.0, Dir::BOTH);
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        // candidate through 3: 0 -> 2 costs 2, 2 -> 0 costs 2
        let mut targets = [WitnessTarget::new(2, Shortcut::new(2.0, 2.0))];
        calc.calculate(&g, 0, 3, &mut targets);
        assert!(Weight::is_infinite(targets[0].shortcut.forward));
        assert!(Weight::is_infinite(targets[0].shortcut.backward));

        let mut targets = [WitnessTarget::new(2, Shortcut::new(1.5, 1.5))];
        calc.calculate(&g, 0, 3, &mut targets);
        assert_eq!(targets[0].shortcut.forward, 1.5);
        assert!(Weight::is_infinite(targets[0].shortcut.backward));
    }

    #[test]
    fn settle_bound_keeps_candidates() {
        let g = diamond();
        let mut calc = DykstraWitnessCalculator::new(16, 1, 0.0);
        let mut targets = [WitnessTarget::new(3, Shortcut::new(6.0, f32::INFINITE))];
        let stats = calc.calculate(&g, 0, 2, &mut targets);
        assert_eq!(targets[0].shortcut.forward, 6.0);
        assert!(stats.exhausted);
    }

    #[test]
    fn contracted_vertices_are_not_used() {
        let mut g = diamond();
        g.set_level(1, 0).unwrap();
        let mut calc = DykstraWitnessCalculator::new(16, 100, 0.0);
        let mut targets = [WitnessTarget::new(3, Shortcut::new(6.0, f32::INFINITE))];
        calc.calculate(&g, 0, 2, &mut targets);
        assert_eq!(targets[0].shortcut.forward, 6.0);
    }
}
