//! Fixed partition of the encoded frame into datagram-sized slices.
//!
//! The device expects the whole frame every cycle, so the partition is
//! computed once and never tracks edits.

use serde::Serialize;

use crate::channel::FRAME_SIZE;

/// Largest datagram the device accepts.
pub const DATAGRAM_MAX_SIZE: usize = 250;

/// Number of slices in a full frame.
pub const SLICE_COUNT: usize = FRAME_SIZE.div_ceil(DATAGRAM_MAX_SIZE);

/// A view over a contiguous region of the encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slice {
    pub offset: usize,
    pub len: usize,
    /// True only for the final slice of the frame.
    pub is_last: bool,
}

impl Slice {
    /// Byte range of this slice within the frame.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Borrow this slice's bytes out of an encoded frame. `None` if the
    /// frame is too short to hold the slice.
    pub fn view<'a>(&self, frame: &'a [u8]) -> Option<&'a [u8]> {
        frame.get(self.range())
    }
}

/// The ordered set of slices covering a frame exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    slices: Vec<Slice>,
}

impl SlicePlan {
    /// Partition `frame_len` bytes into slices of at most `max_size` bytes.
    ///
    /// `max_size` of zero is treated as one byte per slice.
    pub fn new(frame_len: usize, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        let mut slices = Vec::with_capacity(frame_len.div_ceil(max_size));
        let mut offset = 0;

        while offset < frame_len {
            let len = max_size.min(frame_len - offset);
            offset += len;
            slices.push(Slice {
                offset: offset - len,
                len,
                is_last: offset == frame_len,
            });
        }

        Self { slices }
    }

    /// The freeDMX partition: 1536 bytes in slices of at most 250.
    pub fn standard() -> Self {
        Self::new(FRAME_SIZE, DATAGRAM_MAX_SIZE)
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slice> {
        self.slices.iter()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Slice> {
        self.slices.get(position)
    }
}

impl Default for SlicePlan {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a SlicePlan {
    type Item = &'a Slice;
    type IntoIter = std::slice::Iter<'a, Slice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}
