//! Frame layer error types

use thiserror::Error;

/// Errors raised while framing or unframing control messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer too small to hold a header or the announced payload
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Announced payload length exceeds the configured maximum
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Bytes left over after a complete frame
    #[error("{extra} trailing bytes after frame")]
    TrailingBytes {
        /// Number of unexpected bytes
        extra: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FrameError>;
