//! Numeric weight abstraction
//!
//! Searches only need a zero, addition, ordering and an unreachable sentinel.
//! `f32` is the default weight type; `u32` is provided for integer metrics
//! (millimetres, deciseconds) as used by the other butterfly pipelines.

use std::fmt::Debug;
use std::ops::Add;

/// Weight type usable by the graph, the witness searches and the contraction
pub trait Weight:
    Copy + PartialOrd + Add<Output = Self> + Debug + Send + Sync + 'static
{
    const ZERO: Self;
    /// Sentinel meaning "unreachable" / "no shortcut needed"
    const INFINITE: Self;

    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;

    /// True for the sentinel and anything not strictly below it (NaN included)
    #[inline]
    fn is_infinite(self) -> bool {
        !(self < Self::INFINITE)
    }

    #[inline]
    fn is_finite(self) -> bool {
        !self.is_infinite()
    }

    /// Addition that never wraps past the sentinel
    #[inline]
    fn saturating_add(self, other: Self) -> Self {
        if self.is_infinite() || other.is_infinite() {
            Self::INFINITE
        } else {
            self + other
        }
    }

    /// Smaller of two weights, preferring `self` on ties
    #[inline]
    fn min_weight(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl Weight for f32 {
    const ZERO: Self = 0.0;
    const INFINITE: Self = f32::MAX;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        if value >= f32::MAX as f64 {
            f32::MAX
        } else {
            value as f32
        }
    }
}

impl Weight for u32 {
    const ZERO: Self = 0;
    const INFINITE: Self = u32::MAX;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        if value >= u32::MAX as f64 {
            u32::MAX
        } else {
            value.round().max(0.0) as u32
        }
    }

    #[inline]
    fn saturating_add(self, other: Self) -> Self {
        u32::saturating_add(self, other)
    }
}

/// True when `witness` is at least as good as `candidate`, allowing `epsilon` slack
#[inline]
pub fn within_slack<W: Weight>(witness: W, candidate: W, epsilon: f64) -> bool {
    if witness.is_infinite() || candidate.is_infinite() {
        return false;
    }
    witness.to_f64() <= candidate.to_f64() + epsilon
}
