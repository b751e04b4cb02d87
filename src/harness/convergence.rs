//! The convergence predicate

use crate::dtype::SemiringElement;

/// Compare two host snapshots under `T`'s equality policy.
///
/// Both buffers are interpreted as `&[T]` over the first
/// `min(len) / size_of::<T>()` elements; the comparison short-circuits on
/// the first mismatch. Floating-point types compare by absolute delta,
/// discrete semirings exactly.
///
/// Note that two buffers seeded with identical contents compare equal
/// before the kernel has done any work; the engine therefore only applies
/// this predicate after a completed execution.
pub fn buffers_equal<T: SemiringElement>(input: &[u8], output: &[u8], delta: f64) -> bool {
    let elem = std::mem::size_of::<T>();
    let len = (input.len().min(output.len()) / elem) * elem;
    // copy out rather than cast in place: downloaded byte vectors carry no
    // alignment guarantee for T
    let input: Vec<T> = bytemuck::pod_collect_to_vec(&input[..len]);
    let output: Vec<T> = bytemuck::pod_collect_to_vec(&output[..len]);
    input
        .iter()
        .zip(&output)
        .all(|(&a, &b)| a.eq_within(b, delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_comparison_uses_delta() {
        let a: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 2.0]).to_vec();
        let b: Vec<u8> = bytemuck::cast_slice(&[1.00005f32, 2.0]).to_vec();
        assert!(buffers_equal::<f32>(&a, &b, 0.001));
        assert!(!buffers_equal::<f32>(&a, &b, 0.00001));
    }

    #[test]
    fn exact_comparison_for_labels() {
        let a: Vec<u8> = bytemuck::cast_slice(&[1u32, 2, 3]).to_vec();
        let b: Vec<u8> = bytemuck::cast_slice(&[1u32, 2, 4]).to_vec();
        assert!(!buffers_equal::<u32>(&a, &b, 100.0));
        assert!(buffers_equal::<u32>(&a, &a, 0.0));
    }

    #[test]
    fn compares_over_the_shorter_length() {
        let a: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 2.0, 3.0]).to_vec();
        let b: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 2.0]).to_vec();
        assert!(buffers_equal::<f32>(&a, &b, 0.001));
    }
}
