//! Command session engine
//!
//! One control connection carries at most one outstanding command. The
//! [`Client`] sends a command, segmenting it if the command allows, and
//! matches the single reply against it. Failures are classified by
//! [`ErrorClass`] so callers know whether the session survives.

mod client;
mod config;
mod correlation;
mod error;
pub mod segment;

pub use client::{Ack, Client, NakInfo, Response};
pub use config::{CONTINUATION_TYPE, SessionConfig};
pub use correlation::{CorrelationState, Correlator};
pub use error::{
    ConfigError, CorrelationError, ErrorClass, ReassemblyError, Result, SessionError, SplitError,
};
pub use segment::{Reassembler, Segment};
