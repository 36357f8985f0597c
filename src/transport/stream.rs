//! Framed transport over a blocking byte stream.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use tracing::{debug, instrument, trace};

use crate::protocol::metrics::Metrics;
use crate::protocol::{FrameBuffer, Message, encode};
use crate::session::SessionConfig;

use super::{Transport, TransportError};

const READ_CHUNK: usize = 8 * 1024;

/// [`Transport`] over any `Read + Write` stream.
///
/// Reads are accumulated in a [`FrameBuffer`]; frames that arrive together
/// are queued and handed out one per [`recv_frame`](Transport::recv_frame).
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    frames: FrameBuffer,
    pending: VecDeque<Message>,
    read_buf: Box<[u8]>,
}

impl StreamTransport<TcpStream> {
    /// Connect to an L2 server and apply the configured timeouts.
    #[instrument(level = "info", skip(addr, config))]
    pub fn connect(
        addr: impl ToSocketAddrs,
        config: &SessionConfig,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.response_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(Self::with_max_payload(stream, config.max_message_size))
    }
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a connected stream, accepting frames up to the default size limit.
    pub fn new(stream: S) -> Self {
        Self::with_max_payload(stream, crate::protocol::MAX_MESSAGE_SIZE)
    }

    /// Wrap a connected stream with a custom frame payload limit.
    pub fn with_max_payload(stream: S, max_payload: usize) -> Self {
        Self {
            stream,
            frames: FrameBuffer::with_max_payload(max_payload),
            pending: VecDeque::new(),
            read_buf: vec![0u8; READ_CHUNK].into_boxed_slice(),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Recover the underlying stream; buffered bytes are dropped.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    #[instrument(level = "debug", skip(self, message), fields(sapi = %message.sapi(), type_code = %message.type_code(), len = message.payload().len()))]
    fn send_frame(&mut self, message: &Message) -> Result<(), TransportError> {
        let bytes = encode(message);
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Metrics::record_frame_sent();
        trace!(bytes = bytes.len(), "frame written");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn recv_frame(&mut self) -> Result<Message, TransportError> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                Metrics::record_frame_received();
                trace!(sapi = %message.sapi(), type_code = %message.type_code(), "frame received");
                return Ok(message);
            }

            let read = match self.stream.read(&mut self.read_buf) {
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                return Err(TransportError::Closed);
            }
            let frames = self.frames.push(&self.read_buf[..read])?;
            self.pending.extend(frames);
        }
    }
}
