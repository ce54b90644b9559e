//! Direction mask and weight algebra
//!
//! A [`Dir`] is a 2-bit mask: bit 0 = traversable forward, bit 1 =
//! traversable backward, always relative to the orientation the edge is
//! looked at from. Composing two legs of a path is a bitwise AND.
//!
//! # Packed layouts
//!
//! Edge word (`u32`), written by the storage layer:
//!
//! ```text
//!  31                               2 1 0
//! +----------------------------------+---+
//! | weight * PACK_PRECISION (30 bit) |dir|
//! +----------------------------------+---+
//! ```
//!
//! Dir-and-hops word (`u32`), used by the search path tree:
//!
//! ```text
//!  31                               2 1 0
//! +----------------------------------+---+
//! | hop count (30 bit)               |dir|
//! +----------------------------------+---+
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use crate::error::{ContractError, Result};
use crate::weight::Weight;

const DIR_MASK: u32 = 0b11;
const PAYLOAD_SHIFT: u32 = 2;
const PAYLOAD_MAX: u32 = u32::MAX >> PAYLOAD_SHIFT;

/// Fixed-point units per weight unit in the packed edge word
pub const PACK_PRECISION: f64 = 10.0;

/// Largest weight that survives packing
pub const MAX_PACKED_WEIGHT: f64 = PAYLOAD_MAX as f64 / PACK_PRECISION;

/// Largest hop count representable in a dir-and-hops word
pub const MAX_HOPS: u32 = PAYLOAD_MAX;

/// 2-bit traversability mask
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dir(u8);

impl Dir {
    pub const NONE: Dir = Dir(0b00);
    pub const FORWARD: Dir = Dir(0b01);
    pub const BACKWARD: Dir = Dir(0b10);
    pub const BOTH: Dir = Dir(0b11);

    /// Build from the low two bits of `bits`
    #[inline]
    pub const fn from_bits(bits: u32) -> Dir {
        Dir((bits & DIR_MASK) as u8)
    }

    #[inline]
    pub const fn new(forward: bool, backward: bool) -> Dir {
        Dir((forward as u8) | ((backward as u8) << 1))
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn forward(self) -> bool {
        self.0 & 0b01 != 0
    }

    #[inline]
    pub const fn backward(self) -> bool {
        self.0 & 0b10 != 0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Same relation seen from the other endpoint
    #[inline]
    pub const fn reverse(self) -> Dir {
        Dir(((self.0 & 0b01) << 1) | ((self.0 & 0b10) >> 1))
    }

    /// Mask of a path made of `self` followed by `next`
    #[inline]
    pub const fn compose(self, next: Dir) -> Dir {
        Dir(self.0 & next.0)
    }
}

impl BitAnd for Dir {
    type Output = Dir;

    #[inline]
    fn bitand(self, rhs: Dir) -> Dir {
        self.compose(rhs)
    }
}

impl BitOr for Dir {
    type Output = Dir;

    #[inline]
    fn bitor(self, rhs: Dir) -> Dir {
        Dir(self.0 | rhs.0)
    }
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Dir::NONE => "None",
            Dir::FORWARD => "Forward",
            Dir::BACKWARD => "Backward",
            _ => "Both",
        };
        f.write_str(name)
    }
}

/// Serialized form of a [`Dir`] in graph files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirName {
    Forward,
    Backward,
    Both,
}

impl From<DirName> for Dir {
    fn from(name: DirName) -> Dir {
        match name {
            DirName::Forward => Dir::FORWARD,
            DirName::Backward => Dir::BACKWARD,
            DirName::Both => Dir::BOTH,
        }
    }
}

impl TryFrom<Dir> for DirName {
    type Error = ContractError;

    fn try_from(dir: Dir) -> Result<DirName> {
        match dir {
            Dir::FORWARD => Ok(DirName::Forward),
            Dir::BACKWARD => Ok(DirName::Backward),
            Dir::BOTH => Ok(DirName::Both),
            _ => Err(ContractError::InvariantViolation(
                "edge stored with an empty direction mask".to_string(),
            )),
        }
    }
}

/// A weight together with the directions it is valid for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightAndDir<W> {
    pub weight: W,
    pub dir: Dir,
}

impl<W: Weight> WeightAndDir<W> {
    #[inline]
    pub fn new(weight: W, dir: Dir) -> Self {
        Self { weight, dir }
    }

    /// Extend a path by one more leg
    #[inline]
    pub fn append(self, next: WeightAndDir<W>) -> Self {
        Self {
            weight: self.weight.saturating_add(next.weight),
            dir: self.dir & next.dir,
        }
    }
}

/// Candidate (or committed) replacement for `vertex1 -> contracted -> vertex2`
///
/// `forward` is the weight of `vertex1 -> vertex2`, `backward` of
/// `vertex2 -> vertex1`; `W::INFINITE` means no shortcut is required in that
/// direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortcut<W> {
    pub forward: W,
    pub backward: W,
}

impl<W: Weight> Shortcut<W> {
    pub const fn new(forward: W, backward: W) -> Self {
        Self { forward, backward }
    }

    pub fn none() -> Self {
        Self {
            forward: W::INFINITE,
            backward: W::INFINITE,
        }
    }

    /// Same shortcut seen from `vertex2`
    #[inline]
    pub fn reverse(self) -> Self {
        Self {
            forward: self.backward,
            backward: self.forward,
        }
    }

    /// True when at least one direction still needs materializing
    #[inline]
    pub fn is_needed(&self) -> bool {
        self.forward.is_finite() || self.backward.is_finite()
    }

    /// Directions with a finite weight
    #[inline]
    pub fn dir(&self) -> Dir {
        Dir::new(self.forward.is_finite(), self.backward.is_finite())
    }

    /// Keep the per-direction minimum of `self` and `other`
    #[inline]
    pub fn merge_min(&mut self, other: Shortcut<W>) {
        self.forward = self.forward.min_weight(other.forward);
        self.backward = self.backward.min_weight(other.backward);
    }

    /// Largest finite weight over both directions, `ZERO` if none
    pub fn max_finite(&self) -> W {
        let mut max = W::ZERO;
        for w in [self.forward, self.backward] {
            if w.is_finite() && w > max {
                max = w;
            }
        }
        max
    }
}

/// Pack a weight and direction into one edge word
pub fn pack_weight_and_dir<W: Weight>(value: WeightAndDir<W>) -> Result<u32> {
    let weight = value.weight.to_f64();
    if !(0.0..=MAX_PACKED_WEIGHT).contains(&weight) {
        return Err(ContractError::WeightOverflow(weight));
    }
    let fixed = (weight * PACK_PRECISION).round() as u32;
    Ok((fixed.min(PAYLOAD_MAX) << PAYLOAD_SHIFT) | value.dir.bits())
}

/// Inverse of [`pack_weight_and_dir`] (weights come back quantized)
pub fn unpack_weight_and_dir<W: Weight>(word: u32) -> WeightAndDir<W> {
    let fixed = word >> PAYLOAD_SHIFT;
    WeightAndDir {
        weight: W::from_f64(fixed as f64 / PACK_PRECISION),
        dir: Dir::from_bits(word),
    }
}

/// Pack a direction mask and hop count; hops saturate at [`MAX_HOPS`]
#[inline]
pub fn pack_dir_and_hops(dir: Dir, hops: u32) -> u32 {
    (hops.min(MAX_HOPS) << PAYLOAD_SHIFT) | dir.bits()
}

#[inline]
pub fn unpack_dir_and_hops(word: u32) -> (Dir, u32) {
    (Dir::from_bits(word), word >> PAYLOAD_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Dir; 4] = [Dir::NONE, Dir::FORWARD, Dir::BACKWARD, Dir::BOTH];

    #[test]
    fn composition_is_bitwise_and() {
        for a in ALL {
            for b in ALL {
                assert_eq!((a & b).bits(), a.bits() & b.bits());
                assert_eq!(a.compose(b), b.compose(a));
            }
            assert_eq!(a & Dir::NONE, Dir::NONE);
            assert_eq!(Dir::NONE & a, Dir::NONE);
            assert_eq!(a & Dir::BOTH, a);
        }
    }

    #[test]
    fn reverse_swaps_bits() {
        assert_eq!(Dir::FORWARD.reverse(), Dir::BACKWARD);
        assert_eq!(Dir::BACKWARD.reverse(), Dir::FORWARD);
        assert_eq!(Dir::BOTH.reverse(), Dir::BOTH);
        assert_eq!(Dir::NONE.reverse(), Dir::NONE);
        for d in ALL {
            assert_eq!(d.reverse().reverse(), d);
        }
    }

    #[test]
    fn through_path_mask() {
        // u -> v stored at v as (v -> u, BACKWARD), v -> w as (v -> w, FORWARD)
        let to_u = Dir::BACKWARD;
        let to_w = Dir::FORWARD;
        let through = to_u.reverse() & to_w;
        assert!(through.forward());
        assert!(!through.backward());
    }

    #[test]
    fn append_composes_weight_and_dir() {
        let a = WeightAndDir::new(1.5f32, Dir::BOTH);
        let b = WeightAndDir::new(2.0f32, Dir::FORWARD);
        let ab = a.append(b);
        assert_eq!(ab.weight, 3.5);
        assert_eq!(ab.dir, Dir::FORWARD);
    }

    #[test]
    fn edge_word_layout() {
        let word = pack_weight_and_dir(WeightAndDir::new(12.3f32, Dir::BACKWARD)).unwrap();
        assert_eq!(word & 0b11, Dir::BACKWARD.bits());
        assert_eq!(word >> 2, 123);
        let back: WeightAndDir<f32> = unpack_weight_and_dir(word);
        assert!((back.weight - 12.3).abs() < 1e-4);
        assert_eq!(back.dir, Dir::BACKWARD);
    }

    #[test]
    fn edge_word_rejects_unrepresentable_weights() {
        assert!(pack_weight_and_dir(WeightAndDir::new(-1.0f32, Dir::BOTH)).is_err());
        assert!(pack_weight_and_dir(WeightAndDir::new(f32::INFINITE, Dir::BOTH)).is_err());
        assert!(pack_weight_and_dir(WeightAndDir::new(MAX_PACKED_WEIGHT as f32 * 0.5, Dir::BOTH)).is_ok());
    }

    #[test]
    fn dir_and_hops_word() {
        let word = pack_dir_and_hops(Dir::FORWARD, 17);
        assert_eq!(unpack_dir_and_hops(word), (Dir::FORWARD, 17));
        let (_, hops) = unpack_dir_and_hops(pack_dir_and_hops(Dir::BOTH, u32::MAX));
        assert_eq!(hops, MAX_HOPS);
    }

    #[test]
    fn shortcut_merge_and_reverse() {
        let mut s = Shortcut::new(5.0f32, f32::INFINITE);
        s.merge_min(Shortcut::new(7.0, 3.0));
        assert_eq!(s, Shortcut::new(5.0, 3.0));
        assert_eq!(s.reverse(), Shortcut::new(3.0, 5.0));
        assert_eq!(s.dir(), Dir::BOTH);
        assert_eq!(s.max_finite(), 5.0);
        assert!(!Shortcut::<f32>::none().is_needed());
    }
}
