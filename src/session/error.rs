//! Session error taxonomy
//!
//! Every failure the client can report maps to one [`ErrorClass`]. Fatal
//! classes leave the session in the failed state; recoverable ones leave it
//! ready for the next command.

use thiserror::Error;

use crate::codec::{CodecError, CodecErrorKind};
use crate::protocol::{Sapi, ServerErrorCode, TypeCode};
use crate::schema::SchemaError;
use crate::transport::TransportError;

use super::NakInfo;

/// How a failure affects the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Byte stream or framing broke; the connection is unusable
    TransportFatal,
    /// Peer violated the command/response discipline; the connection is unusable
    ProtocolFatal,
    /// Part of a reply could not be interpreted by this schema; the session continues
    SchemaRecoverable,
    /// The request failed or was refused; the session continues
    RequestLocal,
}

impl ErrorClass {
    /// Whether the session must be abandoned
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::TransportFatal | Self::ProtocolFatal)
    }
}

/// Invalid [`SessionConfig`](super::SessionConfig)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Segments must carry at least one byte
    #[error("segment size must be non-zero")]
    ZeroSegmentSize,

    /// A segment plus its header does not fit one frame
    #[error("segment of {segment_size} bytes plus header exceeds frame limit {max_message_size}")]
    SegmentTooLarge {
        /// Configured segment size
        segment_size: usize,
        /// Configured frame payload limit
        max_message_size: usize,
    },

    /// Frame limit does not fit the 32-bit length field
    #[error("frame limit {size} exceeds the length field")]
    MessageSizeTooLarge {
        /// Configured limit
        size: usize,
    },
}

/// Payload cannot be split into segments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// Segment size of zero
    #[error("segment size must be non-zero")]
    ZeroSegmentSize,

    /// The 8-bit remaining counter cannot number this many segments
    #[error("{needed} segments needed, at most 256 allowed")]
    TooManySegments {
        /// Segments the payload would need
        needed: usize,
    },

    /// The request's segment counter does not fall in the initial segment
    #[error("segment counter `{field}` lies beyond the first {segment_size} bytes")]
    CounterOutsideFirstSegment {
        /// Counter field name
        field: String,
        /// Configured segment size
        segment_size: usize,
    },
}

/// Segment stream cannot be reassembled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Remaining counter did not decrease by exactly one
    #[error("segment counter {found} out of order, expected {expected}")]
    OutOfOrder {
        /// Counter the next segment should carry
        expected: u8,
        /// Counter it carried
        found: u8,
    },

    /// Stream ended before the segment with counter 0
    #[error("segment stream ended with {remaining} segments outstanding")]
    Incomplete {
        /// Segments still expected
        remaining: u8,
    },

    /// Segment received after the final one
    #[error("segment received after the final segment")]
    TrailingSegment,

    /// Initial frame too short to hold its segment counter
    #[error("initial segment of {len} bytes has no counter at offset {offset}")]
    MissingCounter {
        /// Counter offset in the request
        offset: usize,
        /// Frame payload length
        len: usize,
    },

    /// Trailing segment header does not decode
    #[error("bad segment header: {0}")]
    Header(#[source] CodecError),

    /// Trailing segment header schema lacks a field
    #[error("segment header has no usable `{field}`")]
    MissingHeaderField {
        /// Field name
        field: &'static str,
    },
}

/// Command/response discipline violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// A command is already outstanding; nothing was sent
    #[error("wait for ack: {outstanding} is still outstanding")]
    WaitForAck {
        /// Type code of the outstanding command
        outstanding: TypeCode,
    },

    /// Message that is not the ACK or NAK of the outstanding command
    #[error("unexpected primitive {type_code} on SAP {sapi}")]
    UnexpectedPrimitive {
        /// SAP of the received message
        sapi: Sapi,
        /// Type code of the received message
        type_code: TypeCode,
        /// Outstanding command, if any
        outstanding: Option<TypeCode>,
    },

    /// The session failed earlier and accepts no further traffic
    #[error("session has failed")]
    SessionFailed,
}

/// Client-facing error
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Byte stream failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command not in the registry
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Request record does not match its schema; nothing was sent
    #[error("cannot encode request: {0}")]
    Encode(#[source] CodecError),

    /// Reply payload does not match its schema
    #[error("cannot decode reply to {command}: {source}")]
    Decode {
        /// Command the reply answers
        command: TypeCode,
        /// Field-level failure
        #[source]
        source: CodecError,
    },

    /// Request payload too large for one frame and not segmentable
    #[error("payload of {size} bytes exceeds frame limit {max}")]
    PayloadTooLarge {
        /// Encoded payload size
        size: usize,
        /// Frame payload limit
        max: usize,
    },

    /// Segmentation failed
    #[error(transparent)]
    Split(#[from] SplitError),

    /// Reassembly failed
    #[error(transparent)]
    Reassembly(#[from] ReassemblyError),

    /// Command/response discipline violation
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// Server refused the command
    #[error("{command} refused: {info}")]
    Nak {
        /// Refused command
        command: TypeCode,
        /// NAK body
        info: NakInfo,
    },

    /// NAK body too short to carry an error code
    #[error("malformed reply {type_code}: {len} bytes")]
    MalformedReply {
        /// Type code of the reply
        type_code: TypeCode,
        /// Payload length
        len: usize,
    },

    /// Unsolicited ERROR_IND
    #[error("server error indication {code}: {description}")]
    ErrorIndication {
        /// Reported error
        code: ServerErrorCode,
        /// Server's description
        description: String,
    },

    /// Unsolicited REJECT_IND
    #[error("server rejected a message: {code}")]
    Rejected {
        /// Reported error
        code: ServerErrorCode,
        /// Type code of the rejected message, when the server echoed it
        rejected: Option<TypeCode>,
    },
}

impl SessionError {
    /// Classify the failure
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transport(_) | Self::Reassembly(_) => ErrorClass::TransportFatal,
            Self::Correlation(CorrelationError::WaitForAck { .. })
            | Self::Config(_)
            | Self::Schema(_)
            | Self::Encode(_)
            | Self::PayloadTooLarge { .. }
            | Self::Split(_)
            | Self::Nak { .. } => ErrorClass::RequestLocal,
            Self::Decode { source, .. }
                if matches!(source.kind(), CodecErrorKind::UnknownSelector { .. }) =>
            {
                ErrorClass::SchemaRecoverable
            }
            Self::Correlation(_)
            | Self::Decode { .. }
            | Self::MalformedReply { .. }
            | Self::ErrorIndication { .. }
            | Self::Rejected { .. } => ErrorClass::ProtocolFatal,
        }
    }

    /// Server error code carried by the failure, if any
    #[must_use]
    pub fn server_code(&self) -> Option<ServerErrorCode> {
        match self {
            Self::Nak { info, .. } => Some(info.code),
            Self::ErrorIndication { code, .. } | Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SessionError>;
