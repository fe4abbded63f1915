use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::channel::{CHANNEL_COUNT, FRAME_SIZE, GROUP_0, OVERFLOW_BIT};
use crate::codec::decode_frame;
use crate::error::{FrameError, Result};
use crate::slice::SlicePlan;

/// Reassembles frame slices into complete channel frames, as a device does.
///
/// Slices must arrive in plan order. Any slice that does not fit resets the
/// assembler so the next frame start resynchronizes it.
#[derive(Debug)]
pub struct FrameAssembler {
    plan: SlicePlan,
    buf: BytesMut,
    position: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_plan(SlicePlan::standard())
    }

    pub fn with_plan(plan: SlicePlan) -> Self {
        Self {
            plan,
            buf: BytesMut::with_capacity(FRAME_SIZE),
            position: 0,
        }
    }

    /// Feed one frame slice.
    ///
    /// Returns the decoded channel values once the last slice of a frame
    /// arrives, `Ok(None)` while a frame is still incomplete.
    pub fn push(&mut self, slice: &[u8]) -> Result<Option<[u8; CHANNEL_COUNT]>> {
        let expected = match self.plan.get(self.position) {
            Some(expected) => *expected,
            None => {
                self.reset();
                return Err(FrameError::SliceOutOfOrder {
                    position: self.position,
                    size: slice.len(),
                });
            }
        };

        if slice.len() != expected.len || (self.position == 0 && !starts_frame(slice)) {
            let position = self.position;
            self.reset();
            return Err(FrameError::SliceOutOfOrder {
                position,
                size: slice.len(),
            });
        }

        self.buf.put_slice(slice);
        self.position += 1;

        if !expected.is_last {
            return Ok(None);
        }

        let frame = self.buf.split().freeze();
        self.position = 0;
        debug!(size = frame.len(), "frame reassembled");
        decode_frame(&frame).map(Some)
    }

    /// Drop any partially assembled frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.position = 0;
    }

    /// Number of slices held for the frame in progress.
    pub fn pending_slices(&self) -> usize {
        self.position
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// A frame begins with channel 0's triplet.
fn starts_frame(slice: &[u8]) -> bool {
    slice.len() >= 2 && slice[0] & !OVERFLOW_BIT == GROUP_0 && slice[1] == 0
}
