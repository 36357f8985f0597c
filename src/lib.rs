//! L2 server control protocol - schema-driven codec and command session engine
//!
//! This library talks to an LTE/NR5G L2 server over its binary control socket.
//! Message bodies are packed little-endian C structures; they are described
//! once as [`RecordSchema`]s and encoded or decoded from a dynamic [`Record`]
//! value tree. A [`Client`] drives the one-command-at-a-time ACK/NAK
//! discipline, including segmentation of oversized commands.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use l2server::catalog;
//! use l2server::{Client, Record, Sapi, SessionConfig, StreamTransport};
//!
//! let config = SessionConfig::default().with_client_name("bench-01");
//! let transport = StreamTransport::connect(("127.0.0.1", l2server::NR5G_PORT), &config)?;
//! let registry = Arc::new(catalog::default_registry()?);
//! let mut client = Client::new(transport, registry, config)?;
//!
//! client.login()?;
//! let ue = Record::new()
//!     .with("UeId", 5u32)
//!     .with("CellId", 1u32)
//!     .with("UeFlags", 0u32);
//! let ack = client.request(Sapi::OM, catalog::CREATE_UE, &ue)?;
//! println!("created UE {:?}", ack.body.get_u64("Id"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - **Declarative layouts** - presence masks, unions, counted and fixed-capacity lists
//! - **Zero-copy buffers** - payloads and segments share `bytes::Bytes`
//! - **Schema fingerprints** - `XXHash3` detects conflicting registrations
//! - **Classified failures** - every error says whether the session survives

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod catalog;
pub mod codec;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod transport;

pub use codec::{CodecError, Decoded, Record, Value, decode_record, encode_record};
pub use protocol::{
    DEFAULT_PORT, FrameError, MAX_MESSAGE_SIZE, Message, NR5G_PORT, Sapi, ServerErrorCode,
    TypeCode,
};
pub use schema::{CommandSchema, RecordSchema, SchemaError, SchemaRegistry};
pub use session::{Ack, Client, ErrorClass, Response, SessionConfig, SessionError};
pub use transport::{StreamTransport, Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
