//! Initial-vector generation strategies
//!
//! Each benchmark seeds its x/y vectors differently: SpMV-style kernels
//! want a constant fill, SSSP wants distance 0 at the source vertex and
//! "infinity" everywhere else, SCC wants every vertex labelled with its own
//! index. One closed enum covers them; the per-index function is pure, so
//! generation is an index-parallel map.

use rayon::prelude::*;

use crate::dtype::SemiringElement;

/// Per-index value-generation strategy for initial vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VectorStrategy<T: SemiringElement> {
    /// Every element is the same value
    Constant(T),
    /// Element 0 is zero (the source vertex), everything else is the
    /// supplied "infinity" sentinel
    InitialDistance {
        /// Unreached-vertex sentinel, e.g. `f32::MAX` for min-plus SSSP
        infinity: T,
    },
    /// Element `i` is `i` itself (initial component labels)
    Identity,
}

impl<T: SemiringElement> VectorStrategy<T> {
    /// The value at one index. Pure and total over `0..length`.
    #[inline]
    pub fn value_at(&self, index: usize) -> T {
        match *self {
            VectorStrategy::Constant(value) => value,
            VectorStrategy::InitialDistance { infinity } => {
                if index == 0 {
                    T::zeroed()
                } else {
                    infinity
                }
            }
            VectorStrategy::Identity => T::from_f64(index as f64),
        }
    }

    /// Generate `length` elements in index order.
    pub fn generate(&self, length: usize) -> Vec<T> {
        (0..length)
            .into_par_iter()
            .map(|i| self.value_at(i))
            .collect()
    }

    /// Generate straight into a byte vector sized for the GPU buffer.
    pub fn generate_bytes(&self, length: usize) -> Vec<u8> {
        bytemuck::cast_slice(&self.generate(length)).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fill() {
        let v = VectorStrategy::Constant(10.0f32).generate(5);
        assert_eq!(v, vec![10.0; 5]);
    }

    #[test]
    fn initial_distance_seeds_source_vertex() {
        let v = VectorStrategy::InitialDistance {
            infinity: f32::MAX,
        }
        .generate(4);
        assert_eq!(v, vec![0.0, f32::MAX, f32::MAX, f32::MAX]);
    }

    #[test]
    fn identity_labels() {
        let v: Vec<u32> = VectorStrategy::Identity.generate(4);
        assert_eq!(v, vec![0, 1, 2, 3]);
    }

    #[test]
    fn byte_generation_matches_cast() {
        let bytes = VectorStrategy::Constant(1.0f32).generate_bytes(2);
        assert_eq!(bytes.len(), 8);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(floats, &[1.0, 1.0]);
    }
}
