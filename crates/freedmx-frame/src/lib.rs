//! freeDMX frame encoding and slicing.
//!
//! A DMX512 universe travels to a freeDMX interface as a 1536-byte frame:
//! one 3-byte triplet per channel, carrying a group code, the channel's index
//! within its group, and the 8-bit value split into a 1-bit overflow and a
//! 7-bit remainder. The frame is cut into fixed slices of at most 250 bytes,
//! each sent as one datagram with no header.
//!
//! This crate holds the wire constants, the canonical [`FrameBuffer`], the
//! precomputed [`SlicePlan`], and the device-side [`FrameAssembler`].

pub mod assembler;
pub mod buffer;
pub mod channel;
pub mod codec;
pub mod error;
pub mod slice;

pub use assembler::FrameAssembler;
pub use buffer::{FrameBuffer, SharedFrame};
pub use channel::{group_code, index_byte, BYTES_PER_CHANNEL, CHANNEL_COUNT, FRAME_SIZE};
pub use codec::{
    classify, decode_frame, decode_triplet, encode_triplet, Datagram, GOODBYE, HELLO,
};
pub use error::{FrameError, Result};
pub use slice::{Slice, SlicePlan, DATAGRAM_MAX_SIZE, SLICE_COUNT};
