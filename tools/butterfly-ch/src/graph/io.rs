//! JSON graph files: the edge list going in and the hierarchy coming out
//!
//! Input vertex ids are validated before anything is built; a dangling id
//! fails the load, never the contraction.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{DirectedGraph, Edge, VertexId};
use crate::dir::{Dir, DirName};
use crate::error::{ContractError, Result};
use crate::weight::Weight;
use crate::witness::WitnessRecord;

fn default_dir() -> DirName {
    DirName::Both
}

/// One input edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f64,
    #[serde(default = "default_dir")]
    pub dir: DirName,
}

/// Weighted input graph as produced by a cost profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeList {
    pub vertex_count: u32,
    pub edges: Vec<EdgeRecord>,
}

impl EdgeList {
    /// Check every record before building anything
    pub fn validate(&self) -> Result<()> {
        for (i, e) in self.edges.iter().enumerate() {
            for vertex in [e.from, e.to] {
                if vertex >= self.vertex_count {
                    return Err(ContractError::DanglingVertex {
                        edge: i,
                        vertex,
                        vertex_count: self.vertex_count,
                    });
                }
            }
            if !e.weight.is_finite() || e.weight < 0.0 || e.weight >= f32::INFINITE.to_f64() {
                return Err(ContractError::InvalidWeight {
                    edge: i,
                    weight: e.weight,
                });
            }
        }
        Ok(())
    }

    pub fn to_graph<W: Weight>(&self) -> Result<DirectedGraph<W>> {
        self.validate()?;
        let mut graph = DirectedGraph::new(self.vertex_count);
        for (i, e) in self.edges.iter().enumerate() {
            let weight = W::from_f64(e.weight);
            // would collide with the unreachable sentinel
            if Weight::is_infinite(weight) {
                return Err(ContractError::InvalidWeight {
                    edge: i,
                    weight: e.weight,
                });
            }
            graph.add_edge(e.from, e.to, weight, e.dir.into());
        }
        Ok(graph)
    }
}

pub struct EdgeListFile;

impl EdgeListFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<EdgeList> {
        let reader = BufReader::new(File::open(path)?);
        let list: EdgeList = serde_json::from_reader(reader)?;
        list.validate()?;
        Ok(list)
    }

    pub fn write<P: AsRef<Path>>(path: P, data: &EdgeList) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, data)?;
        writer.flush()?;
        Ok(())
    }
}

/// One stored relation of a contracted graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f64,
    pub dir: DirName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<VertexId>,
    /// Edge word, see [`crate::dir::pack_weight_and_dir`]
    pub packed: u32,
}

/// Contracted graph: original edges, shortcuts and one level per vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub vertex_count: u32,
    pub levels: Vec<Option<u32>>,
    pub edges: Vec<HierarchyEdge>,
}

impl Hierarchy {
    pub fn from_graph<W: Weight>(graph: &DirectedGraph<W>) -> Result<Self> {
        let levels = (0..graph.vertex_count()).map(|v| graph.level(v)).collect();
        let edges = graph
            .relations()
            .map(|(from, e)| {
                Ok(HierarchyEdge {
                    from,
                    to: e.neighbour,
                    weight: e.weight.to_f64(),
                    dir: DirName::try_from(e.dir)?,
                    via: e.via,
                    packed: e.packed()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            vertex_count: graph.vertex_count(),
            levels,
            edges,
        })
    }

    pub fn to_graph<W: Weight>(&self) -> Result<DirectedGraph<W>> {
        if self.levels.len() != self.vertex_count as usize {
            return Err(ContractError::InvariantViolation(format!(
                "{} levels for {} vertices",
                self.levels.len(),
                self.vertex_count
            )));
        }
        let mut graph = DirectedGraph::new(self.vertex_count);
        for (i, e) in self.edges.iter().enumerate() {
            for vertex in [e.from, e.to].into_iter().chain(e.via) {
                if vertex >= self.vertex_count {
                    return Err(ContractError::DanglingVertex {
                        edge: i,
                        vertex,
                        vertex_count: self.vertex_count,
                    });
                }
            }
            graph.push_relation(
                e.from,
                Edge {
                    neighbour: e.to,
                    weight: W::from_f64(e.weight),
                    dir: Dir::from(e.dir),
                    via: e.via,
                },
            );
        }
        for (v, level) in self.levels.iter().enumerate() {
            if let Some(level) = level {
                graph.set_level(v as VertexId, *level)?;
            }
        }
        Ok(graph)
    }
}

pub struct HierarchyFile;

impl HierarchyFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Hierarchy> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write<P: AsRef<Path>>(path: P, data: &Hierarchy) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, data)?;
        writer.flush()?;
        Ok(())
    }
}

/// Witness graph dump, one record per vertex pair
pub struct WitnessGraphFile;

impl WitnessGraphFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<WitnessRecord>> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write<P: AsRef<Path>>(path: P, records: &[WitnessRecord]) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;
        Ok(())
    }
}
