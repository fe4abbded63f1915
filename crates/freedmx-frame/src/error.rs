/// Errors that can occur while decoding or reassembling frames.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The encoded frame is not exactly one universe long.
    #[error("invalid frame length ({len} bytes, expected {expected})")]
    InvalidLength { len: usize, expected: usize },

    /// A triplet's command byte does not carry the group code of its channel.
    #[error("invalid group code 0x{code:02X} for channel {channel}")]
    InvalidGroupCode { channel: usize, code: u8 },

    /// A triplet's index byte does not match its channel.
    #[error("invalid index byte {index} for channel {channel}")]
    InvalidIndex { channel: usize, index: u8 },

    /// A slice arrived that does not fit the slice plan at this position.
    #[error("unexpected slice of {size} bytes at slice {position}")]
    SliceOutOfOrder { position: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
