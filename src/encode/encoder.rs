//! The layout algorithm: ELLPACK rows to flat GPU byte buffers

use log::debug;

use crate::dtype::SemiringElement;
use crate::encode::flags::pad_to_modulo;
use crate::encode::{ByteBuffer, EncodingFlags, INDEX_SENTINEL, RAGGED_HEADER_BYTES};
use crate::error::{Error, Result};
use crate::matrix::CooMatrix;

const INDEX_BYTES: usize = std::mem::size_of::<i32>();

/// A matrix encoded for the GPU: two flat byte buffers plus the logical
/// dimensions as the kernel will see them.
///
/// Produced once per (matrix, flags) pair and never mutated in place; a
/// fresh encode replaces it if inputs are reset between trials.
#[derive(Debug, Clone)]
pub struct EncodedMatrix {
    indices: ByteBuffer,
    values: ByteBuffer,
    cl_width: i32,
    cl_height: u32,
}

impl EncodedMatrix {
    /// Flat index buffer bytes
    pub fn indices(&self) -> &[u8] {
        self.indices.as_bytes()
    }

    /// Flat value buffer bytes
    pub fn values(&self) -> &[u8] {
        self.values.as_bytes()
    }

    /// Logical row capacity as the kernel sees it.
    ///
    /// `None` in the ragged layout, where each row carries its own width.
    pub fn declared_width(&self) -> Option<u32> {
        u32::try_from(self.cl_width).ok()
    }

    /// Raw width scalar passed to kernels (-1 in the ragged layout)
    #[inline]
    pub fn cl_width(&self) -> i32 {
        self.cl_width
    }

    /// Logical row count as the kernel sees it (excludes the ragged
    /// layout's offset-table header row)
    #[inline]
    pub fn cl_height(&self) -> u32 {
        self.cl_height
    }
}

/// Encode a matrix into one of the three binary layouts.
///
/// `device_limit` is the device's maximum single-allocation size; the
/// index-buffer size is checked against it before anything is allocated.
///
/// # Errors
///
/// Returns [`Error::AllocationOverflow`] carrying the attempted byte size
/// when the index buffer would not fit the device.
///
/// # Panics
///
/// Panics if the computed buffer size disagrees with
/// `width * height * 4` in the regular non-height-padded layout. That is a
/// structural invariant of the format, not an input condition.
pub fn encode<T: SemiringElement>(
    matrix: &CooMatrix<T>,
    flags: &EncodingFlags<T>,
    device_limit: u64,
) -> Result<EncodedMatrix> {
    let value_bytes = std::mem::size_of::<T>();
    let ell = matrix.ellpack();

    // Height: pad to the chunk modulo, then reserve the ragged header row.
    let mut concrete_height = matrix.height();
    if flags.pad_height {
        concrete_height = pad_to_modulo(concrete_height, flags.height_modulo);
    }
    if flags.ragged {
        concrete_height += 1;
    }
    debug!("concrete height: {concrete_height}");

    let row_offset = usize::from(flags.ragged);
    let mut concrete_lengths = vec![0usize; concrete_height];
    concrete_lengths[row_offset..row_offset + ell.height()].copy_from_slice(ell.row_lengths());

    // Width: uniform for the rectangular layouts, per-row for ragged.
    // Ragged rows are deliberately not padded to the split modulo; the
    // inline headers describe each row's true length.
    let mut regular_width = ell.max_width();
    if !flags.ragged {
        if flags.pad_width {
            regular_width = pad_to_modulo(regular_width, flags.width_modulo);
        }
        concrete_lengths.fill(regular_width);
    }
    debug!("regular width: {regular_width}");

    // Per-row byte lengths; ragged rows gain the (length, capacity) header
    // and row 0 becomes the offset table.
    let header = if flags.ragged { RAGGED_HEADER_BYTES } else { 0 };
    let mut byte_lengths_indices: Vec<usize> = concrete_lengths
        .iter()
        .map(|&len| len * INDEX_BYTES + header)
        .collect();
    let mut byte_lengths_values: Vec<usize> = concrete_lengths
        .iter()
        .map(|&len| len * value_bytes + header)
        .collect();
    if flags.ragged {
        let offset_table = (concrete_height - 1) * INDEX_BYTES;
        byte_lengths_indices[0] = offset_table;
        byte_lengths_values[0] = offset_table;
    }

    let ixs_size: usize = byte_lengths_indices.iter().sum();
    let vals_size: usize = byte_lengths_values.iter().sum();
    debug!("index buffer {ixs_size} bytes, value buffer {vals_size} bytes");

    // Bail before allocating anything the device cannot hold.
    if ixs_size as u64 > device_limit {
        return Err(Error::AllocationOverflow {
            attempted: ixs_size as u64,
            limit: device_limit,
        });
    }

    if !flags.ragged && !flags.pad_height {
        assert_eq!(
            ixs_size,
            regular_width * concrete_height * INDEX_BYTES,
            "rectangular index buffer size must be width * height * 4"
        );
    }

    let (cl_width, cl_height) = if flags.ragged {
        (-1, (concrete_height - 1) as u32)
    } else {
        (regular_width as i32, concrete_height as u32)
    };

    let mut indices = ByteBuffer::zeroed(ixs_size);
    let mut values = ByteBuffer::zeroed(vals_size);

    if flags.ragged {
        encode_ragged(
            ell.rows(),
            &concrete_lengths,
            &byte_lengths_indices,
            &byte_lengths_values,
            &mut indices,
            &mut values,
        )?;
    } else {
        // Every slot starts as padding; real entries overwrite below.
        indices.fill_with(INDEX_SENTINEL)?;
        values.fill_with(flags.zero)?;
        for (row, entries) in ell.rows().iter().enumerate() {
            let idx_base = row * regular_width * INDEX_BYTES;
            let val_base = row * regular_width * value_bytes;
            for (slot, &(col, value)) in entries.iter().enumerate() {
                indices.write_elem(idx_base, slot, col)?;
                values.write_elem(val_base, slot, value)?;
            }
        }
    }

    Ok(EncodedMatrix {
        indices,
        values,
        cl_width,
        cl_height,
    })
}

/// Fill the ragged layout: an offset table in row 0 locating each real
/// row, and a (length, capacity) header at the start of each row's slot.
fn encode_ragged<T: SemiringElement>(
    rows: &[Vec<(i32, T)>],
    concrete_lengths: &[usize],
    byte_lengths_indices: &[usize],
    byte_lengths_values: &[usize],
    indices: &mut ByteBuffer,
    values: &mut ByteBuffer,
) -> Result<()> {
    let value_bytes = std::mem::size_of::<T>();

    let idx_offsets = exclusive_prefix_sum(byte_lengths_indices);
    let val_offsets = exclusive_prefix_sum(byte_lengths_values);

    // Offset table: one i32 per real row, written into row 0 of each
    // buffer, holding that row's starting byte offset within that buffer.
    for row in 1..concrete_lengths.len() {
        indices.write_elem(0, row - 1, idx_offsets[row] as i32)?;
        values.write_elem(0, row - 1, val_offsets[row] as i32)?;
    }

    // Row headers: (length, capacity). Without width padding the two
    // fields are equal.
    for (row, &len) in concrete_lengths.iter().enumerate().skip(1) {
        let len = len as i32;
        indices.write_elem(idx_offsets[row], 0, len)?;
        indices.write_elem(idx_offsets[row], 1, len)?;
        values.write_elem(val_offsets[row], 0, len)?;
        values.write_elem(val_offsets[row], 1, len)?;
    }

    for (row, entries) in rows.iter().enumerate() {
        let idx_base = idx_offsets[row + 1] + RAGGED_HEADER_BYTES;
        let val_base = val_offsets[row + 1] + RAGGED_HEADER_BYTES;
        for (slot, &(col, value)) in entries.iter().enumerate() {
            indices.write_at(idx_base + slot * std::mem::size_of::<i32>(), col)?;
            values.write_at(val_base + slot * value_bytes, value)?;
        }
    }

    Ok(())
}

fn exclusive_prefix_sum(lengths: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lengths.len());
    let mut acc = 0usize;
    for &len in lengths {
        offsets.push(acc);
        acc += len;
    }
    offsets
}
