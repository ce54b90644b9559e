//! Endpoint pair in the original (pre-shortcut) topology

use serde::{Deserialize, Serialize};

use super::VertexId;

/// Ordered pair `(vertex1, vertex2)`; equality and hashing are order-sensitive
///
/// Used as the key under which a shortcut between two vertices is tracked.
/// Unlike an edge id it stays stable across contraction rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginalEdge {
    pub vertex1: VertexId,
    pub vertex2: VertexId,
}

impl OriginalEdge {
    #[inline]
    pub const fn new(vertex1: VertexId, vertex2: VertexId) -> Self {
        Self { vertex1, vertex2 }
    }

    #[inline]
    pub const fn reverse(self) -> Self {
        Self {
            vertex1: self.vertex2,
            vertex2: self.vertex1,
        }
    }

    /// Orientation with `vertex1 <= vertex2`, and whether it had to be flipped
    #[inline]
    pub fn normalized(self) -> (Self, bool) {
        if self.vertex1 <= self.vertex2 {
            (self, false)
        } else {
            (self.reverse(), true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn order_sensitive_identity() {
        let e = OriginalEdge::new(1, 2);
        assert_ne!(e, e.reverse());
        let mut set = FxHashSet::default();
        set.insert(e);
        assert!(!set.contains(&e.reverse()));
        assert_eq!(e.reverse().reverse(), e);
    }

    #[test]
    fn normalization() {
        assert_eq!(OriginalEdge::new(5, 3).normalized(), (OriginalEdge::new(3, 5), true));
        assert_eq!(OriginalEdge::new(3, 5).normalized(), (OriginalEdge::new(3, 5), false));
    }
}
