//! Length-checked byte buffer
//!
//! The encoded layouts are built with manual byte-offset arithmetic; this
//! buffer makes every write carry its own bounds check and return a
//! `Result` instead of overrunning.

use bytemuck::Pod;

use crate::error::{Error, Result};

/// Owned byte buffer with typed, bounds-checked element access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Allocate a zero-initialized buffer of `size` bytes.
    pub fn zeroed(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    /// Declared size in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overwrite every `T`-sized slot with `value`.
    ///
    /// # Errors
    ///
    /// Fails if the buffer size is not a multiple of `size_of::<T>()`.
    pub fn fill_with<T: Pod>(&mut self, value: T) -> Result<()> {
        let elem = std::mem::size_of::<T>();
        if self.data.len() % elem != 0 {
            return Err(Error::BufferOverrun {
                offset: self.data.len() - self.data.len() % elem,
                len: elem,
                size: self.data.len(),
            });
        }
        let bytes = bytemuck::bytes_of(&value);
        for chunk in self.data.chunks_exact_mut(elem) {
            chunk.copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Write `value` at an absolute byte offset.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::BufferOverrun`] if the write would end past the
    /// declared size.
    pub fn write_at<T: Pod>(&mut self, byte_offset: usize, value: T) -> Result<()> {
        let elem = std::mem::size_of::<T>();
        let end = byte_offset.checked_add(elem).ok_or(Error::BufferOverrun {
            offset: byte_offset,
            len: elem,
            size: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(Error::BufferOverrun {
                offset: byte_offset,
                len: elem,
                size: self.data.len(),
            });
        }
        self.data[byte_offset..end].copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Write `value` at `base + index * size_of::<T>()`.
    pub fn write_elem<T: Pod>(&mut self, base: usize, index: usize, value: T) -> Result<()> {
        self.write_at(base + index * std::mem::size_of::<T>(), value)
    }

    /// Read a `T` from an absolute byte offset.
    pub fn read_at<T: Pod>(&self, byte_offset: usize) -> Result<T> {
        let elem = std::mem::size_of::<T>();
        let end = byte_offset.checked_add(elem).ok_or(Error::BufferOverrun {
            offset: byte_offset,
            len: elem,
            size: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(Error::BufferOverrun {
                offset: byte_offset,
                len: elem,
                size: self.data.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(&self.data[byte_offset..end]))
    }

    /// View as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into the underlying byte vector
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_roundtrip() {
        let mut buf = ByteBuffer::zeroed(16);
        buf.write_at(4, -1i32).unwrap();
        assert_eq!(buf.read_at::<i32>(4).unwrap(), -1);
        assert_eq!(buf.read_at::<i32>(0).unwrap(), 0);
    }

    #[test]
    fn write_past_end_is_an_error() {
        let mut buf = ByteBuffer::zeroed(8);
        let err = buf.write_at(6, 1.0f32).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverrun {
                offset: 6,
                len: 4,
                size: 8
            }
        ));
    }

    #[test]
    fn fill_with_sets_every_slot() {
        let mut buf = ByteBuffer::zeroed(12);
        buf.fill_with(-1i32).unwrap();
        for i in 0..3 {
            assert_eq!(buf.read_at::<i32>(i * 4).unwrap(), -1);
        }
    }

    #[test]
    fn fill_with_rejects_misaligned_size() {
        let mut buf = ByteBuffer::zeroed(10);
        assert!(buf.fill_with(0.0f64).is_err());
    }

    #[test]
    fn write_elem_offsets_by_element_size() {
        let mut buf = ByteBuffer::zeroed(24);
        buf.write_elem(8, 1, 2.5f64).unwrap();
        assert_eq!(buf.read_at::<f64>(16).unwrap(), 2.5);
    }
}
