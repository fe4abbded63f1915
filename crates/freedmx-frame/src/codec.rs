use crate::channel::{
    group_code, index_byte, BYTES_PER_CHANNEL, CHANNEL_COUNT, FRAME_SIZE, OVERFLOW_BIT,
};
use crate::error::{FrameError, Result};

/// Handshake datagram sent once when a controller starts talking to a device.
pub const HELLO: [u8; 4] = [0xE5, 0x39, 0x60, 0x00];

/// Handshake datagram sent once when a controller stops.
pub const GOODBYE: [u8; 2] = [0xAC, 0x00];

/// Mask for the 7 value bits carried in the third triplet byte.
pub const VALUE_MASK: u8 = 0x7F;

/// Encode one channel value into its wire triplet.
///
/// Wire format:
/// ```text
/// ┌─────────────────────────┬──────────────────┬──────────────────┐
/// │ group code | value>>7   │ channel mod 128  │ value & 0x7F     │
/// └─────────────────────────┴──────────────────┴──────────────────┘
/// ```
pub fn encode_triplet(channel: usize, value: u8) -> [u8; BYTES_PER_CHANNEL] {
    [
        group_code(channel) | ((value >> 7) & OVERFLOW_BIT),
        index_byte(channel),
        value & VALUE_MASK,
    ]
}

/// Recover the 8-bit channel value from a triplet.
pub fn decode_triplet(triplet: &[u8; BYTES_PER_CHANNEL]) -> u8 {
    ((triplet[0] & OVERFLOW_BIT) << 7) | (triplet[2] & VALUE_MASK)
}

/// A datagram as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datagram<'a> {
    Hello,
    Goodbye,
    /// A contiguous chunk of an encoded frame.
    Slice(&'a [u8]),
}

/// Classify a raw datagram.
pub fn classify(datagram: &[u8]) -> Datagram<'_> {
    if datagram == HELLO {
        Datagram::Hello
    } else if datagram == GOODBYE {
        Datagram::Goodbye
    } else {
        Datagram::Slice(datagram)
    }
}

/// Iterate over the whole triplets of an encoded buffer. A trailing partial
/// triplet is ignored.
pub(crate) fn triplets(encoded: &[u8]) -> impl Iterator<Item = &[u8; BYTES_PER_CHANNEL]> {
    encoded
        .chunks_exact(BYTES_PER_CHANNEL)
        .filter_map(|chunk| chunk.try_into().ok())
}

/// Decode a complete encoded frame into its 512 channel values.
///
/// Every triplet is checked against the group code and index byte its
/// position requires.
pub fn decode_frame(encoded: &[u8]) -> Result<[u8; CHANNEL_COUNT]> {
    if encoded.len() != FRAME_SIZE {
        return Err(FrameError::InvalidLength {
            len: encoded.len(),
            expected: FRAME_SIZE,
        });
    }

    let mut values = [0u8; CHANNEL_COUNT];
    for (channel, triplet) in triplets(encoded).enumerate() {
        let code = triplet[0] & !OVERFLOW_BIT;
        if code != group_code(channel) {
            return Err(FrameError::InvalidGroupCode {
                channel,
                code: triplet[0],
            });
        }
        if triplet[1] != index_byte(channel) {
            return Err(FrameError::InvalidIndex {
                channel,
                index: triplet[1],
            });
        }
        values[channel] = decode_triplet(triplet);
    }

    Ok(values)
}
