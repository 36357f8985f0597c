//! Command/response correlation
//!
//! The protocol carries no correlation id: a reply belongs to the single
//! outstanding command by connection state alone. The [`Correlator`] makes
//! that state explicit.
//!
//! ```text
//!            begin                    resolve(ack | nak)
//!   Idle ─────────────► Awaiting ─────────────────────────► Idle
//!     │                    │
//!     │ unexpected         │ unexpected / fail
//!     ▼                    ▼
//!   Failed ◄───────────────┘        (terminal)
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::protocol::{ResponseKind, Sapi, TypeCode};

use super::CorrelationError;

/// Correlation state of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationState {
    /// No command outstanding
    Idle,
    /// One command sent, reply pending
    AwaitingResponse {
        /// SAP the command was sent on
        sapi: Sapi,
        /// Command type code
        command: TypeCode,
        /// When the command was sent
        since: Instant,
    },
    /// A fatal error occurred; no further traffic is accepted
    Failed,
}

/// One-outstanding-request state machine
#[derive(Debug)]
pub struct Correlator {
    state: CorrelationState,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Idle correlator
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: CorrelationState::Idle,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> CorrelationState {
        self.state
    }

    /// Whether a new command may be sent
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, CorrelationState::Idle)
    }

    /// Whether the connection has failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.state, CorrelationState::Failed)
    }

    /// Command awaiting its reply
    #[must_use]
    pub const fn outstanding(&self) -> Option<(Sapi, TypeCode)> {
        match self.state {
            CorrelationState::AwaitingResponse { sapi, command, .. } => Some((sapi, command)),
            _ => None,
        }
    }

    /// Time since the outstanding command was sent
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            CorrelationState::AwaitingResponse { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// Check that a command may be sent, without changing state
    pub fn ready(&self) -> Result<(), CorrelationError> {
        match self.state {
            CorrelationState::Idle => Ok(()),
            CorrelationState::AwaitingResponse { command, .. } => {
                Err(CorrelationError::WaitForAck {
                    outstanding: command,
                })
            }
            CorrelationState::Failed => Err(CorrelationError::SessionFailed),
        }
    }

    /// Record that `command` has been written to the wire
    pub fn begin(&mut self, sapi: Sapi, command: TypeCode) -> Result<(), CorrelationError> {
        self.ready()?;
        debug!(%sapi, %command, "awaiting response");
        self.state = CorrelationState::AwaitingResponse {
            sapi,
            command,
            since: Instant::now(),
        };
        Ok(())
    }

    /// Match a received message against the outstanding command
    ///
    /// Returns the command and whether the reply is its ACK or NAK. Anything
    /// else fails the connection.
    pub fn resolve(
        &mut self,
        sapi: Sapi,
        type_code: TypeCode,
    ) -> Result<(TypeCode, ResponseKind), CorrelationError> {
        let outstanding = match self.state {
            CorrelationState::Failed => return Err(CorrelationError::SessionFailed),
            CorrelationState::Idle => None,
            CorrelationState::AwaitingResponse {
                sapi: expected_sapi,
                command,
                ..
            } => {
                if expected_sapi == sapi {
                    if let Some(kind) = type_code.response_to(command) {
                        debug!(%command, ?kind, "response correlated");
                        self.state = CorrelationState::Idle;
                        return Ok((command, kind));
                    }
                }
                Some(command)
            }
        };

        self.fail();
        warn!(%sapi, %type_code, "unexpected primitive");
        Err(CorrelationError::UnexpectedPrimitive {
            sapi,
            type_code,
            outstanding,
        })
    }

    /// Move to the terminal failed state
    pub fn fail(&mut self) {
        if !self.is_failed() {
            debug!(state = ?self.state, "session failed");
        }
        self.state = CorrelationState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: TypeCode = TypeCode::new(1);

    #[test]
    fn test_ack_returns_to_idle() {
        let mut correlator = Correlator::new();
        correlator.begin(Sapi::OM, LOGIN).unwrap();
        assert_eq!(correlator.outstanding(), Some((Sapi::OM, LOGIN)));

        let resolved = correlator.resolve(Sapi::OM, TypeCode::new(0x101)).unwrap();
        assert_eq!(resolved, (LOGIN, ResponseKind::Ack));
        assert!(correlator.is_idle());
    }

    #[test]
    fn test_nak_returns_to_idle() {
        let mut correlator = Correlator::new();
        correlator.begin(Sapi::OM, LOGIN).unwrap();
        let resolved = correlator.resolve(Sapi::OM, LOGIN.nak()).unwrap();
        assert_eq!(resolved.1, ResponseKind::Nak);
        assert!(correlator.is_idle());
    }

    #[test]
    fn test_second_begin_waits_for_ack() {
        let mut correlator = Correlator::new();
        correlator.begin(Sapi::OM, LOGIN).unwrap();
        assert_eq!(
            correlator.begin(Sapi::OM, TypeCode::new(4)),
            Err(CorrelationError::WaitForAck { outstanding: LOGIN })
        );
        assert_eq!(correlator.outstanding(), Some((Sapi::OM, LOGIN)));
    }

    #[test]
    fn test_mismatched_reply_is_fatal() {
        let mut correlator = Correlator::new();
        correlator.begin(Sapi::OM, LOGIN).unwrap();
        let err = correlator.resolve(Sapi::OM, TypeCode::new(4).ack()).unwrap_err();
        assert!(matches!(
            err,
            CorrelationError::UnexpectedPrimitive {
                outstanding: Some(LOGIN),
                ..
            }
        ));
        assert!(correlator.is_failed());
        assert_eq!(correlator.ready(), Err(CorrelationError::SessionFailed));
    }

    #[test]
    fn test_reply_on_wrong_sap_is_fatal() {
        let mut correlator = Correlator::new();
        correlator.begin(Sapi::OM, LOGIN).unwrap();
        assert!(correlator.resolve(Sapi::LIC, LOGIN.ack()).is_err());
        assert!(correlator.is_failed());
    }

    #[test]
    fn test_reply_while_idle_is_fatal() {
        let mut correlator = Correlator::new();
        assert!(matches!(
            correlator.resolve(Sapi::OM, LOGIN.ack()),
            Err(CorrelationError::UnexpectedPrimitive {
                outstanding: None,
                ..
            })
        ));
        assert!(correlator.is_failed());
    }
}
