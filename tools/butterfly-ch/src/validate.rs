//! Validation of hierarchy correctness
//!
//! Compares distances found by an upward/upward bidirectional search on the
//! contracted graph against plain Dijkstra on the input graph.

use rand::prelude::*;
use rand::SeedableRng;
use tracing::{info, instrument, warn};

use crate::graph::{DirectedGraph, VertexId};
use crate::search::BinaryHeap;
use crate::weight::Weight;

/// Dijkstra over original edges (ground truth), `None` if unreachable
pub fn dijkstra_distance<W: Weight>(graph: &DirectedGraph<W>, source: VertexId, target: VertexId) -> Option<W> {
    let mut dist = vec![W::INFINITE; graph.vertex_count() as usize];
    let mut heap = BinaryHeap::new();
    dist[source as usize] = W::ZERO;
    heap.push(source, W::ZERO);

    while let Some((u, d)) = heap.pop_with_key() {
        if u == target {
            return Some(d);
        }
        if d > dist[u as usize] {
            continue;
        }
        for e in graph.edges(u) {
            if e.is_shortcut() || !e.dir.forward() {
                continue;
            }
            let next = d.saturating_add(e.weight);
            if next < dist[e.neighbour as usize] {
                dist[e.neighbour as usize] = next;
                heap.push(e.neighbour, next);
            }
        }
    }
    None
}

/// Settle everything reachable upward from `root`; `forward` picks the edge direction
fn upward_search<W: Weight>(graph: &DirectedGraph<W>, root: VertexId, forward: bool) -> Vec<W> {
    let levels = graph.levels();
    let mut dist = vec![W::INFINITE; graph.vertex_count() as usize];
    let mut heap = BinaryHeap::new();
    dist[root as usize] = W::ZERO;
    heap.push(root, W::ZERO);

    while let Some((u, d)) = heap.pop_with_key() {
        if d > dist[u as usize] {
            continue;
        }
        for e in graph.edges(u) {
            let usable = if forward { e.dir.forward() } else { e.dir.backward() };
            if !usable || levels[e.neighbour as usize] <= levels[u as usize] {
                continue;
            }
            let next = d.saturating_add(e.weight);
            if next < dist[e.neighbour as usize] {
                dist[e.neighbour as usize] = next;
                heap.push(e.neighbour, next);
            }
        }
    }
    dist
}

/// Shortest `source -> target` distance using only upward edges from both ends
pub fn ch_distance<W: Weight>(graph: &DirectedGraph<W>, source: VertexId, target: VertexId) -> Option<W> {
    let fwd = upward_search(graph, source, true);
    let bwd = upward_search(graph, target, false);
    let best = fwd
        .iter()
        .zip(&bwd)
        .map(|(a, b)| a.saturating_add(*b))
        .fold(W::INFINITE, |acc, d| acc.min_weight(d));
    best.is_finite().then_some(best)
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub n_tests: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unreachable_both: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.incorrect == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub source: VertexId,
    pub target: VertexId,
    pub dijkstra_dist: Option<f64>,
    pub ch_dist: Option<f64>,
}

fn agrees(expected: f64, actual: f64, epsilon: f64) -> bool {
    (actual - expected).abs() <= epsilon + 1e-4 * expected.abs().max(1.0)
}

/// Compare `n_tests` random pairs between `original` and `contracted`
#[instrument(skip(original, contracted))]
pub fn validate_hierarchy<W: Weight>(
    original: &DirectedGraph<W>,
    contracted: &DirectedGraph<W>,
    n_tests: usize,
    seed: u64,
    epsilon: f64,
) -> ValidationResult {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let n = original.vertex_count();

    let mut correct = 0;
    let mut incorrect = 0;
    let mut unreachable_both = 0;
    let mut errors = Vec::new();

    if n == 0 {
        return ValidationResult {
            n_tests: 0,
            correct,
            incorrect,
            unreachable_both,
            errors,
        };
    }

    for i in 0..n_tests {
        let source = rng.random_range(0..n);
        let target = rng.random_range(0..n);

        let expected = dijkstra_distance(original, source, target).map(W::to_f64);
        let actual = ch_distance(contracted, source, target).map(W::to_f64);

        let ok = match (expected, actual) {
            (None, None) => {
                unreachable_both += 1;
                true
            }
            (Some(e), Some(a)) => agrees(e, a, epsilon),
            _ => false,
        };
        if ok {
            correct += 1;
        } else {
            incorrect += 1;
            if errors.len() < 10 {
                errors.push(ValidationError {
                    source,
                    target,
                    dijkstra_dist: expected,
                    ch_dist: actual,
                });
            }
            warn!(source, target, ?expected, ?actual, "distance mismatch");
        }

        if (i + 1) % 100 == 0 {
            info!("{}/{} queries, {} correct, {} incorrect", i + 1, n_tests, correct, incorrect);
        }
    }

    ValidationResult {
        n_tests,
        correct,
        incorrect,
        unreachable_both,
        errors,
    }
}
