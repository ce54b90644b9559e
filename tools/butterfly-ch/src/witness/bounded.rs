use rustc_hash::FxHashMap;

use crate::dir::{Dir, Shortcut};
use crate::graph::{DirectedGraph, VertexId};
use crate::search::{BinaryHeap, PathTree, NO_PREDECESSOR};
use crate::weight::Weight;

const DIRECTIONS: [(usize, Dir); 2] = [(0, Dir::FORWARD), (1, Dir::BACKWARD)];

/// Outcome of one bounded search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WitnessSearchStats {
    /// Vertex settles, counted once per direction
    pub settled: usize,
    /// A hop or settle bound cut the search while targets were unresolved
    pub exhausted: bool,
}

impl WitnessSearchStats {
    pub fn merge(&mut self, other: WitnessSearchStats) {
        self.settled += other.settled;
        self.exhausted |= other.exhausted;
    }
}

/// Bounds applied to one search
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchBounds {
    pub hop_limit: u32,
    pub max_settles: usize,
    /// Frontier weight above which a direction can no longer resolve anything
    pub max_forward: f64,
    pub max_backward: f64,
}

impl SearchBounds {
    fn max_weight(&self, index: usize) -> f64 {
        if index == 0 {
            self.max_forward
        } else {
            self.max_backward
        }
    }
}

/// Forward + backward label-setting search shared by both calculators
///
/// Forward labels describe paths `source -> x`, backward labels paths
/// `x -> source`. Contracted vertices and `skip` are never entered.
#[derive(Debug, Default)]
pub(crate) struct BoundedSearch<W> {
    tree: PathTree<W>,
    heap: BinaryHeap<W>,
    tentative: FxHashMap<VertexId, Shortcut<W>>,
    settled: FxHashMap<VertexId, Dir>,
}

impl<W: Weight> BoundedSearch<W> {
    pub fn new() -> Self {
        Self {
            tree: PathTree::new(),
            heap: BinaryHeap::new(),
            tentative: FxHashMap::default(),
            settled: FxHashMap::default(),
        }
    }

    fn clear(&mut self) {
        self.tree.clear();
        self.heap.clear();
        self.tentative.clear();
        self.settled.clear();
    }

    /// Run from `source` while `needed` has a direction left
    ///
    /// `on_settle(vertex, dirs, weight)` is called once per newly settled
    /// vertex (other than the source) and returns the directions that still
    /// have unresolved targets.
    pub fn run<F>(
        &mut self,
        graph: &DirectedGraph<W>,
        source: VertexId,
        skip: Option<VertexId>,
        bounds: SearchBounds,
        mut needed: Dir,
        mut on_settle: F,
    ) -> WitnessSearchStats
    where
        F: FnMut(VertexId, Dir, W) -> Dir,
    {
        self.clear();
        let mut stats = WitnessSearchStats::default();
        let mut active = needed;
        let mut settles = [0usize; 2];
        let mut limited = false;

        let root = self.tree.add(source, W::ZERO, Dir::BOTH, 0, NO_PREDECESSOR);
        self.heap.push(root, W::ZERO);
        self.tentative.insert(source, Shortcut::new(W::ZERO, W::ZERO));

        while !active.is_none() {
            let Some((pointer, weight)) = self.heap.pop_with_key() else {
                break;
            };
            for (index, dir) in DIRECTIONS {
                if (active & dir) != Dir::NONE && weight.to_f64() > bounds.max_weight(index) {
                    active = active & dir.reverse();
                }
            }

            let entry = self.tree.get(pointer);
            let already = self.settled.get(&entry.vertex).copied().unwrap_or(Dir::NONE);
            let mask = entry.dir & active & Dir::from_bits(!already.bits());
            if mask.is_none() {
                continue;
            }
            self.settled.insert(entry.vertex, already | mask);
            for (index, dir) in DIRECTIONS {
                if (mask & dir) != Dir::NONE {
                    settles[index] += 1;
                    stats.settled += 1;
                }
            }

            if entry.vertex != source {
                needed = on_settle(entry.vertex, mask, weight);
                active = active & needed;
            }
            for (index, dir) in DIRECTIONS {
                if (active & dir) != Dir::NONE && settles[index] >= bounds.max_settles {
                    active = active & dir.reverse();
                    limited = true;
                }
            }

            if entry.hops >= bounds.hop_limit {
                limited = true;
                continue;
            }
            for edge in graph.edges(entry.vertex) {
                let next = edge.neighbour;
                if next == entry.vertex || next == source || Some(next) == skip || graph.is_contracted(next) {
                    continue;
                }
                let dirs = mask & active & edge.dir;
                if dirs.is_none() {
                    continue;
                }
                let next_weight = weight.saturating_add(edge.weight);
                if next_weight.is_infinite() {
                    continue;
                }
                let best = self.tentative.entry(next).or_insert_with(Shortcut::none);
                let improves = Dir::new(
                    dirs.forward() && next_weight < best.forward,
                    dirs.backward() && next_weight < best.backward,
                );
                if improves.is_none() {
                    continue;
                }
                if improves.forward() {
                    best.forward = next_weight;
                }
                if improves.backward() {
                    best.backward = next_weight;
                }
                let child = self.tree.add(next, next_weight, improves, entry.hops + 1, pointer);
                self.heap.push(child, next_weight);
            }
        }

        stats.exhausted = limited && !needed.is_none();
        tracing::trace!(
            source,
            settled = stats.settled,
            labels = self.tree.len(),
            exhausted = stats.exhausted,
            "bounded search finished"
        );
        stats
    }
}
