use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dir::Shortcut;
use crate::graph::{OriginalEdge, VertexId};
use crate::weight::Weight;

/// Best known path weights between two vertices, not through any single neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Witness<W> {
    pub vertex1: VertexId,
    pub vertex2: VertexId,
    /// `vertex1 -> vertex2`, `INFINITE` if unknown
    pub forward: W,
    /// `vertex2 -> vertex1`, `INFINITE` if unknown
    pub backward: W,
}

impl<W: Weight> Witness<W> {
    pub fn new(vertex1: VertexId, vertex2: VertexId, weights: Shortcut<W>) -> Self {
        Self {
            vertex1,
            vertex2,
            forward: weights.forward,
            backward: weights.backward,
        }
    }

    pub fn weights(&self) -> Shortcut<W> {
        Shortcut::new(self.forward, self.backward)
    }
}

/// Serialized witness, unknown directions omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessRecord {
    pub from: VertexId,
    pub to: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backward: Option<f64>,
}

impl<W: Weight> From<&Witness<W>> for WitnessRecord {
    fn from(w: &Witness<W>) -> Self {
        let finite = |x: W| x.is_finite().then(|| x.to_f64());
        Self {
            from: w.vertex1,
            to: w.vertex2,
            forward: finite(w.forward),
            backward: finite(w.backward),
        }
    }
}

/// Witnesses shared between workers
///
/// Keyed by the normalised vertex pair; a pair seen from `vertex2` is
/// stored reversed. Writers take the lock once per batch.
#[derive(Debug, Default)]
pub struct WitnessGraph<W> {
    inner: Mutex<FxHashMap<OriginalEdge, Shortcut<W>>>,
}

impl<W: Weight> WitnessGraph<W> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FxHashMap::default()),
        }
    }

    fn merge(map: &mut FxHashMap<OriginalEdge, Shortcut<W>>, witness: Witness<W>) {
        if witness.vertex1 == witness.vertex2 || !witness.weights().is_needed() {
            return;
        }
        let (key, flipped) = OriginalEdge::new(witness.vertex1, witness.vertex2).normalized();
        let weights = if flipped {
            witness.weights().reverse()
        } else {
            witness.weights()
        };
        map.entry(key).or_insert_with(Shortcut::none).merge_min(weights);
    }

    pub fn add(&self, witness: Witness<W>) {
        Self::merge(&mut self.inner.lock(), witness);
    }

    pub fn add_batch<I>(&self, witnesses: I)
    where
        I: IntoIterator<Item = Witness<W>>,
    {
        let mut map = self.inner.lock();
        for witness in witnesses {
            Self::merge(&mut map, witness);
        }
    }

    /// Witness weights oriented `vertex1 -> vertex2` (forward) and back
    pub fn get(&self, vertex1: VertexId, vertex2: VertexId) -> Shortcut<W> {
        let (key, flipped) = OriginalEdge::new(vertex1, vertex2).normalized();
        let map = self.inner.lock();
        match map.get(&key) {
            Some(w) if flipped => w.reverse(),
            Some(w) => *w,
            None => Shortcut::none(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// All witnesses, ordered by vertex pair
    pub fn snapshot(&self) -> Vec<Witness<W>> {
        let map = self.inner.lock();
        let mut all: Vec<_> = map
            .iter()
            .map(|(key, w)| Witness::new(key.vertex1, key.vertex2, *w))
            .collect();
        all.sort_unstable_by_key(|w| (w.vertex1, w.vertex2));
        all
    }

    pub fn records(&self) -> Vec<WitnessRecord> {
        self.snapshot().iter().map(WitnessRecord::from).collect()
    }
}
