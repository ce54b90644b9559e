use crate::dir::{pack_dir_and_hops, unpack_dir_and_hops, Dir};
use crate::graph::VertexId;
use crate::weight::Weight;

/// Predecessor pointer of a search root
pub const NO_PREDECESSOR: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Slot<W> {
    vertex: VertexId,
    weight: W,
    dir_and_hops: u32,
    predecessor: u32,
}

/// Decoded path tree entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEntry<W> {
    pub vertex: VertexId,
    pub weight: W,
    pub dir: Dir,
    pub hops: u32,
    pub predecessor: u32,
}

/// Append-only arena of search labels addressed by `u32` pointers
///
/// `clear` only resets the length; slots of the previous search are
/// overwritten in place by the next one.
#[derive(Debug, Clone, Default)]
pub struct PathTree<W> {
    slots: Vec<Slot<W>>,
    len: usize,
}

impl<W: Weight> PathTree<W> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    pub fn add(&mut self, vertex: VertexId, weight: W, dir: Dir, hops: u32, predecessor: u32) -> u32 {
        let slot = Slot {
            vertex,
            weight,
            dir_and_hops: pack_dir_and_hops(dir, hops),
            predecessor,
        };
        let pointer = self.len;
        if pointer < self.slots.len() {
            self.slots[pointer] = slot;
        } else {
            self.slots.push(slot);
        }
        self.len += 1;
        pointer as u32
    }

    /// Panics on a pointer that was not returned since the last `clear`
    #[inline]
    pub fn get(&self, pointer: u32) -> PathEntry<W> {
        let index = pointer as usize;
        assert!(index < self.len, "path tree pointer {pointer} out of range");
        let slot = self.slots[index];
        let (dir, hops) = unpack_dir_and_hops(slot.dir_and_hops);
        PathEntry {
            vertex: slot.vertex,
            weight: slot.weight,
            dir,
            hops,
            predecessor: slot.predecessor,
        }
    }

    /// Vertices from `pointer` back to the root
    pub fn walk(&self, pointer: u32) -> impl Iterator<Item = VertexId> + '_ {
        let mut current = pointer;
        std::iter::from_fn(move || {
            if current == NO_PREDECESSOR {
                return None;
            }
            let entry = self.get(current);
            current = entry.predecessor;
            Some(entry.vertex)
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated slots, kept across clears
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}
