//! L2 server frame layer
//!
//! This module provides the frame header, type codes, SAP identifiers, server
//! error codes and the frame codec used by every message on the control socket.

mod codec;
mod error;
mod header;
mod message;
pub(crate) mod metrics;
mod types;

pub use codec::{FrameBuffer, decode, encode};
pub use error::{FrameError, Result};
pub use header::FrameHeader;
pub use message::Message;
pub use metrics::{MetricsSnapshot, metrics_snapshot};
pub use types::{ResponseKind, Sapi, ServerErrorCode, Severity, TypeCode};

/// Frame header size in bytes (`sapi: u16`, `type: u16`, `len: u32`)
pub const HEADER_SIZE: usize = 8;

/// Offset added to a command type code to form its positive acknowledgement
pub const ACK_OFFSET: u16 = 0x0100;

/// Offset added to a command type code to form its negative acknowledgement
pub const NAK_OFFSET: u16 = 0x0200;

/// Largest payload the LTE server accepts in one frame (22 KB)
pub const MAX_MESSAGE_SIZE: usize = 22 * 1024;

/// Data bytes carried by one segment of a segmented command
pub const DEFAULT_SEGMENT_SIZE: usize = 20_000;

/// Default LTE L2 server control port
pub const DEFAULT_PORT: u16 = 5130;

/// Default NR5G L2 server control port
pub const NR5G_PORT: u16 = 5141;

/// Unsolicited error indication on [`Sapi::SRV_ERROR`]
pub const ERROR_IND: TypeCode = TypeCode::new(1025);

/// Rejected-message indication on [`Sapi::SRV_ERROR`]
pub const REJECT_IND: TypeCode = TypeCode::new(1026);
