//! Circular buffer of intermediate rows.
//!
//! Holds `capacity` rows of `stride` bytes in one contiguous allocation.
//! Source row `r` lives in slot `r % capacity`, so the vertical kernel can
//! address consecutive slots as one strided block.

use crate::contrib::try_vec;
use crate::error::RescaleResult;

pub struct RowRing {
    buf: Vec<u8>,
    stride: usize,
    capacity: u32,
}

impl RowRing {
    /// Allocate a zeroed ring. `capacity` must be non-zero.
    pub fn new(capacity: u32, stride: usize) -> RescaleResult<Self> {
        debug_assert!(capacity > 0);
        let buf = try_vec::<u8>("row ring", capacity as usize * stride)?;
        Ok(Self {
            buf,
            stride,
            capacity,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Slot holding source row `row`.
    #[inline]
    pub fn slot_of(&self, row: u32) -> usize {
        (row % self.capacity) as usize
    }

    /// Mutable bytes of the slot holding source row `row`.
    #[inline]
    pub fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let start = self.slot_of(row) * self.stride;
        &mut self.buf[start..start + self.stride]
    }

    /// The whole ring, slot 0 first.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl std::fmt::Debug for RowRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowRing")
            .field("capacity", &self.capacity)
            .field("stride", &self.stride)
            .finish()
    }
}
