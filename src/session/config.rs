//! Session configuration

use std::time::Duration;

use crate::protocol::{DEFAULT_SEGMENT_SIZE, MAX_MESSAGE_SIZE, TypeCode};

use super::ConfigError;
use super::segment::HEADER_SIZE;

/// Type code of trailing segments (SEG_CONFIG_REQ)
pub const CONTINUATION_TYPE: TypeCode = TypeCode::new(0x13);

/// Session configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Largest payload of one frame, in either direction.
    pub max_message_size: usize,
    /// Data bytes carried by one segment of a segmented command.
    pub segment_size: usize,
    /// Type code used by the trailing segments of a segmented command.
    pub continuation_type: TypeCode,
    /// How long to wait for a reply; `None` waits forever.
    pub response_timeout: Option<Duration>,
    /// Optional socket write timeout.
    pub write_timeout: Option<Duration>,
    /// Client name announced by [`Client::login`](super::Client::login).
    pub client_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            segment_size: DEFAULT_SEGMENT_SIZE,
            continuation_type: CONTINUATION_TYPE,
            response_timeout: Some(Duration::from_secs(10)),
            write_timeout: None,
            client_name: "l2server-rs".to_owned(),
        }
    }
}

impl SessionConfig {
    /// Set the frame payload limit
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the segment size
    #[must_use]
    pub fn with_segment_size(mut self, size: usize) -> Self {
        self.segment_size = size;
        self
    }

    /// Set the continuation type code
    #[must_use]
    pub fn with_continuation_type(mut self, code: TypeCode) -> Self {
        self.continuation_type = code;
        self
    }

    /// Set the reply timeout
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the write timeout
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the login name
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Check that segments fit frames and frames fit the length field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if u32::try_from(self.max_message_size).is_err() {
            return Err(ConfigError::MessageSizeTooLarge {
                size: self.max_message_size,
            });
        }
        if self.segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        if self.segment_size + HEADER_SIZE > self.max_message_size {
            return Err(ConfigError::SegmentTooLarge {
                segment_size: self.segment_size,
                max_message_size: self.max_message_size,
            });
        }
        Ok(())
    }
}
