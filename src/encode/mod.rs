//! Sparse-matrix binary encoding for GPU consumption
//!
//! Turns the ELLPACK view of a matrix into the flat index/value byte
//! buffers a kernel reads: regular padded SOA-ELLPACK, height-chunked, or
//! ragged self-describing ("RSA") layout.
//!
//! - `buffer` — length-checked byte buffer with typed element writes
//! - `flags` — layout selection derived from kernel properties
//! - `encoder` — the layout algorithm itself

mod buffer;
mod encoder;
mod flags;

pub use buffer::ByteBuffer;
pub use encoder::{EncodedMatrix, encode};
pub use flags::EncodingFlags;

/// Index sentinel marking a padding slot.
///
/// Always a 32-bit signed -1 regardless of the value type; kernels treat
/// it as "no column here, skip".
pub const INDEX_SENTINEL: i32 = -1;

/// Byte size of the two-field (length, capacity) header prefixed to every
/// real row in the ragged layout
pub const RAGGED_HEADER_BYTES: usize = 2 * std::mem::size_of::<i32>();
