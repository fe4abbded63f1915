//! The canonical encoded frame and its shared, lock-guarded handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::channel::{BYTES_PER_CHANNEL, CHANNEL_COUNT, FRAME_SIZE, OVERFLOW_BIT};
use crate::codec::{decode_triplet, encode_triplet, triplets, VALUE_MASK};

/// A 512-channel frame held in its wire-encoded form.
///
/// Group codes and index bytes are written once by [`initialize`](Self::initialize);
/// [`update`](Self::update) only touches the overflow bit and the value byte.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    bytes: [u8; FRAME_SIZE],
}

impl FrameBuffer {
    /// Create a frame with every channel at zero.
    pub fn new() -> Self {
        let mut frame = Self {
            bytes: [0u8; FRAME_SIZE],
        };
        frame.initialize();
        frame
    }

    /// Reset to the default frame: all values zero, group codes and index
    /// bytes per channel range.
    pub fn initialize(&mut self) {
        for (channel, triplet) in self.bytes.chunks_exact_mut(BYTES_PER_CHANNEL).enumerate() {
            triplet.copy_from_slice(&encode_triplet(channel, 0));
        }
    }

    /// Write channel values starting at channel 0.
    ///
    /// Channels past `values.len()` keep their previous encoding. Input longer
    /// than one universe is truncated. Returns the number of channels written.
    pub fn update(&mut self, values: &[u8]) -> usize {
        let count = if values.len() > CHANNEL_COUNT {
            warn!(
                channels = values.len(),
                max = CHANNEL_COUNT,
                "oversized channel input truncated"
            );
            CHANNEL_COUNT
        } else {
            values.len()
        };

        for (triplet, &value) in self
            .bytes
            .chunks_exact_mut(BYTES_PER_CHANNEL)
            .zip(&values[..count])
        {
            triplet[0] = (triplet[0] & !OVERFLOW_BIT) | ((value >> 7) & OVERFLOW_BIT);
            triplet[2] = value & VALUE_MASK;
        }

        count
    }

    /// Encoded bytes as sent on the wire.
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    /// Decoded value of one channel.
    pub fn value(&self, channel: usize) -> Option<u8> {
        let start = channel.checked_mul(BYTES_PER_CHANNEL)?;
        let end = start.checked_add(BYTES_PER_CHANNEL)?;
        self.bytes
            .get(start..end)
            .and_then(|triplet| triplet.try_into().ok())
            .map(decode_triplet)
    }

    /// All 512 decoded channel values.
    pub fn values(&self) -> [u8; CHANNEL_COUNT] {
        let mut values = [0u8; CHANNEL_COUNT];
        for (value, triplet) in values.iter_mut().zip(triplets(&self.bytes)) {
            *value = decode_triplet(triplet);
        }
        values
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.values().iter().filter(|v| **v != 0).count();
        f.debug_struct("FrameBuffer")
            .field("size", &FRAME_SIZE)
            .field("active_channels", &active)
            .finish()
    }
}

/// A [`FrameBuffer`] shared between the host's writer and the transmitter.
///
/// The mutex is held only for the byte-level mutation or the snapshot copy.
/// Callers never hold it across I/O.
#[derive(Clone, Default)]
pub struct SharedFrame {
    inner: Arc<Mutex<FrameBuffer>>,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply new channel values in one critical section.
    pub fn update(&self, values: &[u8]) -> usize {
        self.lock().update(values)
    }

    /// Copy the current encoded bytes into `dst`.
    ///
    /// The copy happens under the lock, so `dst` always holds the result of
    /// whole `update` calls, never a mix of two.
    pub fn snapshot_into(&self, dst: &mut [u8; FRAME_SIZE]) {
        dst.copy_from_slice(self.lock().as_bytes());
    }

    /// Clone the current frame.
    pub fn snapshot(&self) -> FrameBuffer {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, FrameBuffer> {
        // Frame bytes are valid after any partial update, so a poisoned lock
        // is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFrame").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::channel::{group_code, index_byte};
    use crate::codec::decode_frame;

    #[test]
    fn test_initialize_group_codes_and_indices() {
        let frame = FrameBuffer::new();
        for (channel, triplet) in frame.as_bytes().chunks_exact(3).enumerate() {
            assert_eq!(triplet[0], group_code(channel), "channel {channel}");
            assert_eq!(triplet[1], index_byte(channel), "channel {channel}");
            assert_eq!(triplet[2], 0, "channel {channel}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut frame = FrameBuffer::new();
        let first = frame.clone();
        frame.initialize();
        assert_eq!(frame, first);
    }

    #[test]
    fn test_update_all_full_scale() {
        let mut frame = FrameBuffer::new();
        assert_eq!(frame.update(&[255u8; CHANNEL_COUNT]), CHANNEL_COUNT);

        for (channel, triplet) in frame.as_bytes().chunks_exact(3).enumerate() {
            assert_eq!(triplet[0] & 1, 1, "channel {channel}");
            assert_eq!(triplet[0] & !1, group_code(channel), "channel {channel}");
            assert_eq!(triplet[1], index_byte(channel), "channel {channel}");
            assert_eq!(triplet[2], 0x7F, "channel {channel}");
        }
    }

    #[test]
    fn test_update_is_idempotent() {
        let values: Vec<u8> = (0..CHANNEL_COUNT).map(|i| (i * 7 % 256) as u8).collect();
        let mut frame = FrameBuffer::new();
        frame.update(&values);
        let once = *frame.as_bytes();
        frame.update(&values);
        assert_eq!(*frame.as_bytes(), once);
    }

    #[test]
    fn test_update_clears_overflow_bit() {
        let mut frame = FrameBuffer::new();
        frame.update(&[200]);
        assert_eq!(frame.as_bytes()[0], 0xC1);
        frame.update(&[10]);
        assert_eq!(frame.as_bytes()[0], 0xC0);
        assert_eq!(frame.value(0), Some(10));
    }

    #[test]
    fn test_short_update_keeps_remaining_channels() {
        let mut frame = FrameBuffer::new();
        frame.update(&[9u8; CHANNEL_COUNT]);
        let before = *frame.as_bytes();

        assert_eq!(frame.update(&[1, 2, 3]), 3);

        assert_eq!(frame.value(0), Some(1));
        assert_eq!(frame.value(1), Some(2));
        assert_eq!(frame.value(2), Some(3));
        assert_eq!(frame.as_bytes()[9..], before[9..]);
    }

    #[test]
    fn test_oversized_update_truncates() {
        let mut frame = FrameBuffer::new();
        let values = vec![42u8; CHANNEL_COUNT + 10];
        assert_eq!(frame.update(&values), CHANNEL_COUNT);
        assert!(frame.values().iter().all(|v| *v == 42));
    }

    #[test]
    fn test_first_triplets_after_update() {
        let mut frame = FrameBuffer::new();
        frame.update(&[255, 128, 0]);
        assert_eq!(&frame.as_bytes()[0..3], &[0xC1, 0x00, 0x7F]);
        assert_eq!(&frame.as_bytes()[3..6], &[0xC1, 0x01, 0x00]);
        assert_eq!(&frame.as_bytes()[6..9], &[0xC0, 0x02, 0x00]);
    }

    #[test]
    fn test_value_out_of_range() {
        let frame = FrameBuffer::new();
        assert_eq!(frame.value(CHANNEL_COUNT), None);
        assert_eq!(frame.value(usize::MAX), None);
    }

    #[test]
    fn test_snapshot_never_torn() {
        let shared = SharedFrame::new();
        let writer = shared.clone();

        let handle = thread::spawn(move || {
            for round in 0..2_000u32 {
                writer.update(&[(round % 256) as u8; CHANNEL_COUNT]);
            }
        });

        let mut snapshot = [0u8; FRAME_SIZE];
        for _ in 0..2_000 {
            shared.snapshot_into(&mut snapshot);
            let values = decode_frame(&snapshot).unwrap();
            assert!(
                values.iter().all(|v| *v == values[0]),
                "snapshot mixed two updates"
            );
        }

        handle.join().unwrap();
    }

    #[test]
    fn test_shared_update_visible_in_snapshot() {
        let shared = SharedFrame::new();
        shared.update(&[1, 2, 3]);
        let frame = shared.snapshot();
        assert_eq!(frame.value(2), Some(3));
    }
}
