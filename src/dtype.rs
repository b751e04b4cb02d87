//! Semiring element types
//!
//! The encoder and the convergence predicate are generic over the scalar
//! the kernel computes with: `f32` for SpMV/BFS/SSSP/PageRank, `i32` or
//! `u32` for SCC component labels. The encoder only needs `size_of::<T>()`
//! and a caller-supplied zero; the convergence predicate additionally needs
//! to know whether two snapshots compare by absolute delta (floating point)
//! or exactly (discrete labels).

use bytemuck::{Pod, Zeroable};

/// Scalar type a benchmark kernel computes over.
///
/// Implementors are plain-old-data so host snapshots can be reinterpreted
/// as `&[T]` with bytemuck, matching how the kernel sees the buffer.
pub trait SemiringElement: Pod + Zeroable + PartialEq + Copy + Send + Sync + 'static {
    /// Short type name used in log output
    const NAME: &'static str;

    /// Whether equality is approximate (floating point) or exact
    const APPROXIMATE_EQ: bool;

    /// Compare two values under the type's equality policy.
    ///
    /// `delta` is ignored for exact types.
    fn eq_within(self, other: Self, delta: f64) -> bool;

    /// Largest representable value, used as the "infinity" / "unvisited"
    /// sentinel by distance-style seeds
    fn max_value() -> Self;

    /// Convert from f64, truncating as the type requires.
    ///
    /// Matrix-Market files carry values as decimal text; loaders parse to
    /// f64 and narrow to the kernel's element type here.
    fn from_f64(v: f64) -> Self;
}

impl SemiringElement for f32 {
    const NAME: &'static str = "f32";
    const APPROXIMATE_EQ: bool = true;

    #[inline]
    fn eq_within(self, other: Self, delta: f64) -> bool {
        f64::from(self - other).abs() < delta
    }

    fn max_value() -> Self {
        f32::MAX
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl SemiringElement for f64 {
    const NAME: &'static str = "f64";
    const APPROXIMATE_EQ: bool = true;

    #[inline]
    fn eq_within(self, other: Self, delta: f64) -> bool {
        (self - other).abs() < delta
    }

    fn max_value() -> Self {
        f64::MAX
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl SemiringElement for i32 {
    const NAME: &'static str = "i32";
    const APPROXIMATE_EQ: bool = false;

    #[inline]
    fn eq_within(self, other: Self, _delta: f64) -> bool {
        self == other
    }

    fn max_value() -> Self {
        i32::MAX
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

impl SemiringElement for u32 {
    const NAME: &'static str = "u32";
    const APPROXIMATE_EQ: bool = false;

    #[inline]
    fn eq_within(self, other: Self, _delta: f64) -> bool {
        self == other
    }

    fn max_value() -> Self {
        u32::MAX
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as u32
    }
}
