//! Contraction loop
//!
//! Vertices leave a min-priority queue one at a time. The popped vertex gets
//! its shortcuts built and witnessed, then its priority is recomputed; if it
//! is no longer the minimum it goes back into the queue (lazy update).
//! Otherwise its shortcuts are committed, it receives the next level and its
//! neighbours are re-evaluated.
//!
//! Only the initial two-hop witness pass and the initial priorities run in
//! parallel. Every step after that reads the state the previous one left.

use std::cmp::Reverse;
use std::time::Instant;

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use rayon::ThreadPool;
use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument};

use super::vertex_info::{VertexInfo, WitnessSummary};
use crate::config::ContractionConfig;
use crate::error::{ContractError, Result};
use crate::graph::{DirectedGraph, VertexId};
use crate::weight::Weight;
use crate::witness::{DykstraWitnessCalculator, NeighbourWitnessCalculator, Witness, WitnessGraph};

/// Queue key: lowest priority first, lower vertex id on ties
type QueueKey = Reverse<(OrderedFloat<f32>, VertexId)>;

fn queue_key(vertex: VertexId, priority: f32) -> QueueKey {
    Reverse((OrderedFloat(priority), vertex))
}

/// Phase the builder will run on its next [`HierarchyBuilder::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractionState {
    Selecting,
    Expanding,
    Witnessing,
    Committing,
    Done,
}

/// Statistics from hierarchy construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyStats {
    pub n_vertices: u32,
    pub n_original_edges: usize,
    pub n_edges: usize,
    pub n_shortcuts: usize,
    pub n_contracted: u32,
    pub n_witness_searches: usize,
    pub n_exhausted_searches: usize,
    pub n_settled: usize,
    pub n_witnesses: usize,
    pub n_lazy_requeues: usize,
    pub max_depth: u32,
    pub ordering_time_ms: u64,
    pub contraction_time_ms: u64,
}

impl HierarchyStats {
    fn absorb(&mut self, summary: WitnessSummary) {
        self.n_witness_searches += summary.searches;
        self.n_exhausted_searches += summary.exhausted;
        self.n_settled += summary.settled;
    }
}

/// Per-vertex evaluation shared by the parallel init and the sequential loop
#[allow(clippy::too_many_arguments)]
fn evaluate<W: Weight>(
    graph: &DirectedGraph<W>,
    vertex: VertexId,
    depth: u32,
    contracted_neighbours: u32,
    config: &ContractionConfig,
    witnesses: Option<&WitnessGraph<W>>,
    info: &mut VertexInfo<W>,
    calculator: &mut DykstraWitnessCalculator<W>,
) -> (f32, WitnessSummary) {
    info.clear();
    info.depth = depth;
    info.contracted_neighbours = contracted_neighbours;
    info.add_relevant_edges(graph, vertex);
    info.build_shortcuts();
    if let Some(witnesses) = witnesses {
        info.remove_shortcuts(witnesses, config.epsilon);
    }
    let summary = info.witness(graph, calculator);
    (info.priority(graph, &config.priority), summary)
}

fn in_pool<R, F>(pool: Option<&ThreadPool>, f: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

/// Drives the contraction of one graph, in place
pub struct HierarchyBuilder<'g, W: Weight> {
    graph: &'g mut DirectedGraph<W>,
    config: ContractionConfig,
    queue: PriorityQueue<VertexId, QueueKey>,
    depth: Vec<u32>,
    contracted_neighbours: Vec<u32>,
    info: VertexInfo<W>,
    probe: VertexInfo<W>,
    dykstra: DykstraWitnessCalculator<W>,
    neighbour: NeighbourWitnessCalculator<W>,
    witness_graph: WitnessGraph<W>,
    witness_batch: Vec<Witness<W>>,
    current: Option<VertexId>,
    state: ContractionState,
    next_level: u32,
    total: u32,
    next_report: u32,
    started: Instant,
    stats: HierarchyStats,
}

impl<'g, W: Weight> HierarchyBuilder<'g, W> {
    /// Validate `config`, precompute witnesses and fill the queue
    #[instrument(skip_all, fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
    pub fn new(graph: &'g mut DirectedGraph<W>, config: ContractionConfig) -> Result<Self> {
        config.validate()?;
        let pool = if config.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()
                    .map_err(|e| ContractError::InvalidConfig(format!("thread pool: {e}")))?,
            )
        } else {
            None
        };

        let n = graph.vertex_count();
        let started = Instant::now();
        let mut stats = HierarchyStats {
            n_vertices: n,
            n_original_edges: graph.edge_count(),
            ..Default::default()
        };
        let witness_graph = WitnessGraph::new();
        let pending: Vec<VertexId> = (0..n).filter(|&v| !graph.is_contracted(v)).collect();

        let shared: &DirectedGraph<W> = graph;
        if config.neighbour_witnesses {
            in_pool(pool.as_ref(), || {
                pending.par_iter().for_each_init(
                    || {
                        (
                            NeighbourWitnessCalculator::new(config.hop_limit, config.neighbour_max_settles),
                            Vec::new(),
                        )
                    },
                    |(calculator, batch), &v| {
                        calculator.run(shared, v, None, |w| batch.push(w));
                        if !batch.is_empty() {
                            witness_graph.add_batch(batch.drain(..));
                        }
                    },
                );
            });
            info!(witnesses = witness_graph.len(), "two-hop witnesses precomputed");
        }

        let witnesses = config.neighbour_witnesses.then_some(&witness_graph);
        let priorities: Vec<(VertexId, f32, WitnessSummary)> = in_pool(pool.as_ref(), || {
            pending
                .par_iter()
                .map_init(
                    || {
                        (
                            VertexInfo::new(),
                            DykstraWitnessCalculator::new(config.hop_limit, config.max_settles, config.epsilon),
                        )
                    },
                    |(info, calculator), &v| {
                        let (priority, summary) = evaluate(shared, v, 0, 0, &config, witnesses, info, calculator);
                        (v, priority, summary)
                    },
                )
                .collect()
        });

        let mut queue = PriorityQueue::with_capacity(priorities.len());
        for (v, priority, summary) in priorities {
            stats.absorb(summary);
            queue.push(v, queue_key(v, priority));
        }
        stats.ordering_time_ms = started.elapsed().as_millis() as u64;
        info!(
            queued = queue.len(),
            searches = stats.n_witness_searches,
            ms = stats.ordering_time_ms,
            "initial priorities computed"
        );

        let total = queue.len() as u32;
        Ok(Self {
            dykstra: DykstraWitnessCalculator::new(config.hop_limit, config.max_settles, config.epsilon),
            neighbour: NeighbourWitnessCalculator::new(config.hop_limit, config.neighbour_max_settles),
            graph,
            queue,
            depth: vec![0; n as usize],
            contracted_neighbours: vec![0; n as usize],
            info: VertexInfo::new(),
            probe: VertexInfo::new(),
            witness_graph,
            witness_batch: Vec::new(),
            current: None,
            state: if total == 0 { ContractionState::Done } else { ContractionState::Selecting },
            next_level: 0,
            total,
            next_report: 1,
            started: Instant::now(),
            stats,
            config,
        })
    }

    pub fn state(&self) -> ContractionState {
        self.state
    }

    /// Vertex between selection and commit, if any
    pub fn current(&self) -> Option<VertexId> {
        self.current
    }

    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    pub fn graph(&self) -> &DirectedGraph<W> {
        self.graph
    }

    pub fn witness_graph(&self) -> &WitnessGraph<W> {
        &self.witness_graph
    }

    pub fn stats(&self) -> &HierarchyStats {
        &self.stats
    }

    /// Run the phase of the current state and return the next state
    pub fn step(&mut self) -> Result<ContractionState> {
        self.state = match self.state {
            ContractionState::Selecting => self.select(),
            ContractionState::Expanding => self.expand()?,
            ContractionState::Witnessing => self.witness()?,
            ContractionState::Committing => self.commit()?,
            ContractionState::Done => ContractionState::Done,
        };
        Ok(self.state)
    }

    /// Contract every remaining vertex
    pub fn run(mut self) -> Result<HierarchyStats> {
        while self.step()? != ContractionState::Done {}
        Ok(self.finish())
    }

    /// Like [`run`](Self::run), also handing back the witness graph
    pub fn run_with_witnesses(mut self) -> Result<(HierarchyStats, WitnessGraph<W>)> {
        while self.step()? != ContractionState::Done {}
        let stats = self.finish();
        Ok((stats, self.witness_graph))
    }

    fn finish(&mut self) -> HierarchyStats {
        self.stats.n_edges = self.graph.edge_count();
        self.stats.n_shortcuts = self.graph.shortcut_count();
        self.stats.n_witnesses = self.witness_graph.len();
        self.stats.contraction_time_ms = self.started.elapsed().as_millis() as u64;
        info!(
            contracted = self.stats.n_contracted,
            shortcuts = self.stats.n_shortcuts,
            edges = self.stats.n_edges,
            lazy_requeues = self.stats.n_lazy_requeues,
            exhausted = self.stats.n_exhausted_searches,
            ms = self.stats.contraction_time_ms,
            "contraction finished"
        );
        self.stats.clone()
    }

    fn select(&mut self) -> ContractionState {
        match self.queue.pop() {
            Some((v, _)) => {
                self.current = Some(v);
                ContractionState::Expanding
            }
            None => {
                self.current = None;
                ContractionState::Done
            }
        }
    }

    fn current_vertex(&self) -> Result<VertexId> {
        self.current
            .ok_or_else(|| ContractError::InvariantViolation("no vertex selected".to_string()))
    }

    fn expand(&mut self) -> Result<ContractionState> {
        let v = self.current_vertex()?;
        self.info.clear();
        self.info.depth = self.depth[v as usize];
        self.info.contracted_neighbours = self.contracted_neighbours[v as usize];
        self.info.add_relevant_edges(self.graph, v);
        self.info.build_shortcuts();
        Ok(ContractionState::Witnessing)
    }

    fn witness(&mut self) -> Result<ContractionState> {
        let v = self.current_vertex()?;
        if self.config.neighbour_witnesses {
            self.info.remove_shortcuts(&self.witness_graph, self.config.epsilon);
        }
        let summary = self.info.witness(self.graph, &mut self.dykstra);
        self.stats.absorb(summary);

        let priority = self.info.priority(self.graph, &self.config.priority);
        if let Some((_, Reverse((top, _)))) = self.queue.peek() {
            if priority > top.0 {
                debug!(vertex = v, priority, next = top.0, "priority went stale, requeued");
                self.queue.push(v, queue_key(v, priority));
                self.current = None;
                self.stats.n_lazy_requeues += 1;
                return Ok(ContractionState::Selecting);
            }
        }
        Ok(ContractionState::Committing)
    }

    fn commit(&mut self) -> Result<ContractionState> {
        let v = self.current_vertex()?;
        let mut added = 0u32;
        for (key, shortcut) in self.info.shortcuts() {
            let update = self.graph.add_or_update_edge(key.vertex1, key.vertex2, shortcut, Some(v))?;
            added += update.added;
        }
        let level = self.next_level;
        self.graph.set_level(v, level)?;
        self.next_level += 1;
        self.current = None;
        self.stats.n_contracted += 1;

        let neighbours = self.info.neighbours();
        debug!(vertex = v, level, neighbours = neighbours.len(), added, "contracted");

        let child_depth = self.depth[v as usize] + 1;
        for &u in &neighbours {
            self.contracted_neighbours[u as usize] += 1;
            let d = &mut self.depth[u as usize];
            *d = (*d).max(child_depth);
            self.stats.max_depth = self.stats.max_depth.max(*d);
        }

        if self.config.neighbour_witnesses && !neighbours.is_empty() {
            let dirty: FxHashSet<VertexId> = neighbours.iter().copied().collect();
            for &u in &neighbours {
                let batch = &mut self.witness_batch;
                self.neighbour.run(self.graph, u, Some(&dirty), |w| batch.push(w));
            }
            self.witness_graph.add_batch(self.witness_batch.drain(..));
        }

        let witnesses = self.config.neighbour_witnesses.then_some(&self.witness_graph);
        for &u in &neighbours {
            let (priority, summary) = evaluate(
                self.graph,
                u,
                self.depth[u as usize],
                self.contracted_neighbours[u as usize],
                &self.config,
                witnesses,
                &mut self.probe,
                &mut self.dykstra,
            );
            self.stats.absorb(summary);
            self.queue.push(u, queue_key(u, priority));
        }

        self.report_progress();
        Ok(if self.queue.is_empty() {
            ContractionState::Done
        } else {
            ContractionState::Selecting
        })
    }

    fn report_progress(&mut self) {
        let done = self.stats.n_contracted;
        if self.total >= 10 && done as u64 * 10 >= self.next_report as u64 * self.total as u64 {
            info!(
                percent = self.next_report * 10,
                contracted = done,
                edges = self.graph.edge_count(),
                "contraction progress"
            );
            self.next_report += 1;
        }
    }
}

/// Contract `graph` in place with `config`
pub fn contract<W: Weight>(graph: &mut DirectedGraph<W>, config: ContractionConfig) -> Result<HierarchyStats> {
    HierarchyBuilder::new(graph, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::Dir;

    fn path(n: u32) -> DirectedGraph<f32> {
        let mut g = DirectedGraph::new(n);
        for v in 1..n {
            g.add_edge(v - 1, v, 1.0, Dir::BOTH);
        }
        g
    }

    #[test]
    fn every_vertex_gets_a_distinct_level() {
        let mut g = path(6);
        let stats = contract(&mut g, ContractionConfig::default()).unwrap();
        assert_eq!(stats.n_contracted, 6);
        let mut levels: Vec<u32> = (0..6).map(|v| g.level(v).unwrap()).collect();
        levels.sort_unstable();
        assert_eq!(levels, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn isolated_vertices_are_contracted() {
        let mut g: DirectedGraph<f32> = DirectedGraph::new(3);
        let stats = contract(&mut g, ContractionConfig::default()).unwrap();
        assert_eq!(stats.n_contracted, 3);
        assert_eq!(stats.n_shortcuts, 0);
        assert!((0..3).all(|v| g.is_contracted(v)));
    }

    #[test]
    fn empty_graph_is_done_immediately() {
        let mut g: DirectedGraph<f32> = DirectedGraph::new(0);
        let builder = HierarchyBuilder::new(&mut g, ContractionConfig::default()).unwrap();
        assert_eq!(builder.state(), ContractionState::Done);
    }

    #[test]
    fn step_walks_through_the_states() {
        let mut g = path(3);
        let mut builder = HierarchyBuilder::new(&mut g, ContractionConfig::default()).unwrap();
        assert_eq!(builder.state(), ContractionState::Selecting);
        assert_eq!(builder.step().unwrap(), ContractionState::Expanding);
        assert!(builder.current().is_some());
        assert_eq!(builder.step().unwrap(), ContractionState::Witnessing);
        let next = builder.step().unwrap();
        assert!(matches!(next, ContractionState::Committing | ContractionState::Selecting));
        let stats = builder.run().unwrap();
        assert_eq!(stats.n_contracted, 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut g = path(3);
        let config = ContractionConfig::default().hop_limit(0);
        assert!(matches!(
            HierarchyBuilder::new(&mut g, config),
            Err(ContractError::InvalidConfig(_))
        ));
    }

    #[test]
    fn explicit_thread_count_gives_same_levels() {
        let mut a = path(12);
        let mut b = path(12);
        contract(&mut a, ContractionConfig::default()).unwrap();
        contract(&mut b, ContractionConfig::default().threads(2)).unwrap();
        assert_eq!(a.levels(), b.levels());
    }
}
