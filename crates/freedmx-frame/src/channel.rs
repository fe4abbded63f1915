//! Channel layout of a DMX512 universe on the freeDMX wire.
//!
//! Every channel is carried as a 3-byte triplet. The first byte's upper bits
//! hold a group code chosen by the channel's range, the second byte is the
//! channel index within its group of 128.

/// Channels in one universe.
pub const CHANNEL_COUNT: usize = 512;

/// Bytes used to encode one channel.
pub const BYTES_PER_CHANNEL: usize = 3;

/// Encoded frame size in bytes.
pub const FRAME_SIZE: usize = CHANNEL_COUNT * BYTES_PER_CHANNEL;

/// Channels 0-127.
pub const GROUP_0: u8 = 0xC0;

/// Channels 128-255.
pub const GROUP_1: u8 = 0xC2;

/// Channels 256-383.
pub const GROUP_2: u8 = 0xC4;

/// Channels 384-510.
pub const GROUP_3: u8 = 0xC6;

/// Channel 511 alone.
pub const GROUP_LAST: u8 = 0x86;

/// Low bit of the command byte, carrying bit 7 of the channel value.
pub const OVERFLOW_BIT: u8 = 0x01;

/// Returns the group code for a channel index.
///
/// Indices past the last channel map to [`GROUP_LAST`].
pub fn group_code(channel: usize) -> u8 {
    match channel {
        0..=127 => GROUP_0,
        128..=255 => GROUP_1,
        256..=383 => GROUP_2,
        384..=510 => GROUP_3,
        _ => GROUP_LAST,
    }
}

/// Returns the index byte for a channel (its position within the group).
pub fn index_byte(channel: usize) -> u8 {
    (channel % 128) as u8
}

/// Returns a human-readable name for a group code.
pub fn group_name(code: u8) -> &'static str {
    match code & !OVERFLOW_BIT {
        GROUP_0 => "GROUP_0",
        GROUP_1 => "GROUP_1",
        GROUP_2 => "GROUP_2",
        GROUP_3 => "GROUP_3",
        GROUP_LAST => "GROUP_LAST",
        _ => "UNKNOWN",
    }
}
