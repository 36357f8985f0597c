//! Transport-level error types covering socket and framing failures.

use core::fmt;
use std::io;

use crate::protocol::FrameError;

/// Unified error type for the control-socket transport.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying socket failure.
    Io(io::Error),
    /// Byte stream did not frame correctly.
    Frame(FrameError),
    /// Peer closed the connection.
    Closed,
    /// No reply arrived within the read timeout.
    TimedOut,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "socket error: {err}"),
            Self::Frame(err) => write!(f, "framing error: {err}"),
            Self::Closed => write!(f, "connection closed by peer"),
            Self::TimedOut => write!(f, "timed out waiting for the peer"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Frame(err) => Some(err),
            Self::Closed | Self::TimedOut => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}
