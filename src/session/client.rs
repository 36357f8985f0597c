//! Command/response client
//!
//! [`Client`] owns a [`Transport`], the command registry and the correlation
//! state of one control connection. It encodes request records, segments
//! them when the command allows it, and turns the server's reply into an
//! [`Ack`], a NAK or a classified [`SessionError`].

use std::fmt;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::catalog;
use crate::codec::{Diagnostic, Record, decode_prefix, decode_record, encode_record};
use crate::protocol::metrics::Metrics;
use crate::protocol::{
    ERROR_IND, HEADER_SIZE, Message, REJECT_IND, ResponseKind, Sapi, ServerErrorCode, TypeCode,
};
use crate::schema::{CommandSchema, RecordSchema, SchemaRegistry, Segmentation};
use crate::transport::{Transport, TransportError};

use super::segment;
use super::{
    CorrelationError, CorrelationState, Correlator, Result, SessionConfig, SessionError, SplitError,
};

/// Decoded NAK body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NakInfo {
    /// UE, cell or group id the NAK refers to
    pub id: u32,
    /// Reason given by the server
    pub code: ServerErrorCode,
}

impl fmt::Display for NakInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {})", self.code, self.id)
    }
}

/// Positive acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Command being acknowledged
    pub command: TypeCode,
    /// Decoded body; empty when the command has no ACK schema
    pub body: Record,
    /// Payload as received
    pub raw: Bytes,
    /// Recoverable decode findings
    pub diagnostics: Vec<Diagnostic>,
}

/// Reply to the outstanding command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command accepted
    Ack(Ack),
    /// Command refused
    Nak {
        /// Command being refused
        command: TypeCode,
        /// NAK body
        info: NakInfo,
    },
}

/// L2 server control client
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    registry: Arc<SchemaRegistry>,
    config: SessionConfig,
    correlator: Correlator,
    nak_body: Arc<RecordSchema>,
    segment_header: Arc<RecordSchema>,
    session_id: Uuid,
}

impl<T: Transport> Client<T> {
    /// Create a client over a connected transport
    pub fn new(transport: T, registry: Arc<SchemaRegistry>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        debug!(%session_id, commands = registry.len(), "session created");
        Ok(Self {
            transport,
            registry,
            config,
            correlator: Correlator::new(),
            nak_body: catalog::nak_body()?,
            segment_header: segment::header_schema()?,
            session_id,
        })
    }

    /// Identifier attached to this session's log records
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Correlation state
    #[must_use]
    pub const fn state(&self) -> CorrelationState {
        self.correlator.state()
    }

    /// Session configuration
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Command registry
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Borrow the transport
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give up the client and recover the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Encode and send one command
    ///
    /// Fails with [`CorrelationError::WaitForAck`] without writing anything
    /// while another command is outstanding. Encoding failures are reported
    /// before any byte reaches the wire.
    #[instrument(level = "debug", skip(self, record), fields(session = %self.session_id))]
    pub fn send(&mut self, sapi: Sapi, code: TypeCode, record: &Record) -> Result<()> {
        self.correlator.ready()?;

        let command = self.registry.lookup(sapi, code)?;
        let segmented = command.is_segmentable();

        let frames = if let Some(layout) = command.segmentation() {
            let frames = self.segment_frames(sapi, command, layout, record)?;
            debug!(command = command.name(), segments = frames.len(), "command segmented");
            frames
        } else {
            let payload =
                encode_record(command.request(), record).map_err(SessionError::Encode)?;
            if payload.len() > self.config.max_message_size {
                return Err(SessionError::PayloadTooLarge {
                    size: payload.len(),
                    max: self.config.max_message_size,
                });
            }
            vec![frame(sapi, code, payload)?]
        };

        for message in &frames {
            if let Err(err) = self.transport.send_frame(message) {
                error!(%err, "send failed");
                self.correlator.fail();
                Metrics::record_fatal();
                return Err(err.into());
            }
        }

        self.correlator.begin(sapi, code)?;
        Metrics::record_command();
        if segmented {
            Metrics::record_segments_sent(frames.len());
        }
        Ok(())
    }

    /// Wait for the reply to the outstanding command
    ///
    /// A NAK is returned as [`Response::Nak`] and leaves the session ready for
    /// the next command. Fatal failures move the session to
    /// [`CorrelationState::Failed`].
    #[instrument(level = "debug", skip(self), fields(session = %self.session_id))]
    pub fn receive(&mut self) -> Result<Response> {
        if self.correlator.is_failed() {
            return Err(CorrelationError::SessionFailed.into());
        }

        let result = self.receive_reply();
        if let Err(err) = &result {
            let class = err.class();
            if class.is_fatal() {
                warn!(%err, ?class, "session failed");
                self.correlator.fail();
                Metrics::record_fatal();
            }
        }
        result
    }

    /// Send a command and wait for its ACK
    ///
    /// A NAK becomes [`SessionError::Nak`].
    #[instrument(level = "debug", skip(self, record), fields(session = %self.session_id))]
    pub fn request(&mut self, sapi: Sapi, code: TypeCode, record: &Record) -> Result<Ack> {
        self.send(sapi, code, record)?;
        match self.receive()? {
            Response::Ack(ack) => Ok(ack),
            Response::Nak { command, info } => Err(SessionError::Nak { command, info }),
        }
    }

    /// Log in with the configured client name
    #[instrument(level = "info", skip(self), fields(session = %self.session_id))]
    pub fn login(&mut self) -> Result<Ack> {
        let record = Record::new().with("CliName", self.config.client_name.clone());
        let ack = self.request(Sapi::OM, catalog::LOGIN, &record)?;
        info!(client = self.config.client_name.as_str(), "logged in");
        Ok(ack)
    }

    /// Frames of a segmentable command
    ///
    /// The request is encoded with its counter set to the number of trailing
    /// segments; the first piece goes out under the command's own type code
    /// and the rest as continuation frames behind a segment header.
    fn segment_frames(
        &self,
        sapi: Sapi,
        command: &CommandSchema,
        layout: &Segmentation,
        record: &Record,
    ) -> Result<Vec<Message>> {
        let request = command.request();
        let segment_size = self.config.segment_size;

        let single = record.clone().with(layout.counter(), 0u8);
        let mut payload = encode_record(request, &single).map_err(SessionError::Encode)?;
        let needed = segment::count(payload.len(), segment_size)?;
        if needed > 1 {
            let in_first = request
                .fixed_offset(layout.counter())
                .is_some_and(|offset| offset < segment_size);
            if !in_first {
                return Err(SplitError::CounterOutsideFirstSegment {
                    field: layout.counter().to_owned(),
                    segment_size,
                }
                .into());
            }
            #[allow(clippy::cast_possible_truncation)]
            let remaining = (needed - 1) as u8;
            let first = record.clone().with(layout.counter(), remaining);
            payload = encode_record(request, &first).map_err(SessionError::Encode)?;
        }

        let id = record
            .get_u64(layout.id())
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(u32::MAX);

        let mut frames = Vec::with_capacity(needed);
        for piece in segment::split(&payload, segment_size)? {
            if frames.is_empty() {
                frames.push(frame(sapi, command.code(), piece.data)?);
            } else {
                let body = piece
                    .encode_trailing(&self.segment_header, id)
                    .map_err(SessionError::Encode)?;
                frames.push(frame(sapi, self.config.continuation_type, body)?);
            }
        }
        trace!(len = payload.len(), id, "segment frames built");
        Ok(frames)
    }

    fn receive_reply(&mut self) -> Result<Response> {
        let message = self.transport.recv_frame()?;
        let sapi = message.sapi();
        let type_code = message.type_code();

        if sapi == Sapi::SRV_ERROR && (type_code == ERROR_IND || type_code == REJECT_IND) {
            return Err(server_indication(&message));
        }

        let (command, kind) = self.correlator.resolve(sapi, type_code)?;
        let payload = message.into_payload();

        match kind {
            ResponseKind::Ack => {
                let schema = self
                    .registry
                    .lookup(sapi, command)
                    .ok()
                    .and_then(|c| c.ack().cloned());
                let (body, diagnostics) = match schema {
                    Some(schema) if !payload.is_empty() => {
                        let decoded = decode_record(&schema, &payload)
                            .map_err(|source| SessionError::Decode { command, source })?;
                        (decoded.record, decoded.diagnostics)
                    }
                    _ => (Record::new(), Vec::new()),
                };
                Metrics::record_ack();
                debug!(%command, len = payload.len(), "ack");
                Ok(Response::Ack(Ack {
                    command,
                    body,
                    raw: payload,
                    diagnostics,
                }))
            }
            ResponseKind::Nak => {
                let info = parse_nak(&self.nak_body, type_code, &payload)?;
                Metrics::record_nak();
                debug!(%command, %info, "nak");
                Ok(Response::Nak { command, info })
            }
        }
    }
}

fn frame(sapi: Sapi, type_code: TypeCode, payload: Bytes) -> Result<Message> {
    Message::new(sapi, type_code, payload).map_err(|err| TransportError::from(err).into())
}

/// Decode a NAK body; anything after it is ignored
fn parse_nak(schema: &RecordSchema, type_code: TypeCode, payload: &Bytes) -> Result<NakInfo> {
    let malformed = || SessionError::MalformedReply {
        type_code,
        len: payload.len(),
    };
    let (decoded, _) = decode_prefix(schema, payload).map_err(|err| {
        debug!(%err, "nak body");
        malformed()
    })?;
    let id = decoded
        .record
        .get_u64("Id")
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(malformed)?;
    let code = decoded
        .record
        .get_i64("Err")
        .and_then(|code| i16::try_from(code).ok())
        .ok_or_else(malformed)?;
    Ok(NakInfo {
        id,
        code: ServerErrorCode::new(code),
    })
}

/// Map an `ERROR_IND` or `REJECT_IND` to its session error
fn server_indication(message: &Message) -> SessionError {
    let payload = message.payload();
    if payload.len() < 2 {
        return SessionError::MalformedReply {
            type_code: message.type_code(),
            len: payload.len(),
        };
    }
    let mut buf = payload.clone();
    let code = ServerErrorCode::new(buf.get_i16_le());

    if message.type_code() == ERROR_IND {
        let text = buf.chunk();
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        let description = String::from_utf8_lossy(&text[..end]).into_owned();
        error!(%code, description = description.as_str(), "server error indication");
        SessionError::ErrorIndication { code, description }
    } else {
        // Err, spare, then the header of the rejected message
        let type_offset = 4 + 2;
        let rejected = (payload.len() >= 4 + HEADER_SIZE).then(|| {
            TypeCode::new(u16::from_le_bytes([
                payload[type_offset],
                payload[type_offset + 1],
            ]))
        });
        error!(%code, ?rejected, "server rejected a message");
        SessionError::Rejected { code, rejected }
    }
}
