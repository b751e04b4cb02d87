//! Layout selection flags

use crate::config::KernelProperties;
use crate::dtype::SemiringElement;

/// Selects one of the three binary layouts and carries the padding value.
///
/// `ragged` and the two padding moduli come from the kernel config's
/// `arrayType`, `chunkSize`, and `splitSize` properties; the kernel was
/// generated against a specific layout and the encoder must match it.
#[derive(Debug, Clone, Copy)]
pub struct EncodingFlags<T: SemiringElement> {
    /// Value written into padding slots of the value buffer (the
    /// semiring's additive identity, e.g. f32::MAX for min-plus)
    pub zero: T,
    /// Pad the row count up past the next multiple of `height_modulo`
    pub pad_height: bool,
    /// Pad every row width up past the next multiple of `width_modulo`
    pub pad_width: bool,
    /// Emit the self-describing ragged layout instead of a rectangle
    pub ragged: bool,
    /// Height padding modulo (kernel chunk size)
    pub height_modulo: usize,
    /// Width padding modulo (kernel split size)
    pub width_modulo: usize,
}

impl<T: SemiringElement> EncodingFlags<T> {
    /// Plain rectangular layout: no padding, no headers.
    pub fn regular(zero: T) -> Self {
        Self {
            zero,
            pad_height: false,
            pad_width: false,
            ragged: false,
            height_modulo: 1,
            width_modulo: 1,
        }
    }

    /// Derive the layout a kernel expects from its declared properties.
    ///
    /// `chunkSize > 1` means the kernel walks rows in chunks and needs the
    /// height padded to that modulo; `splitSize > 1` likewise for row
    /// widths; `arrayType == "ragged_array"` selects the ragged layout.
    pub fn from_properties(props: &KernelProperties, zero: T) -> Self {
        Self {
            zero,
            pad_height: props.chunk_size > 1,
            pad_width: props.split_size > 1,
            ragged: props.is_ragged(),
            height_modulo: props.chunk_size.max(1) as usize,
            width_modulo: props.split_size.max(1) as usize,
        }
    }
}

/// Pad `value` past the next multiple of `modulo`.
///
/// Matches the generated kernels' expectation: a full extra modulo is added
/// when the value is already aligned, so the result is always strictly
/// larger than the input.
pub(crate) fn pad_to_modulo(value: usize, modulo: usize) -> usize {
    value + (modulo - value % modulo)
}
