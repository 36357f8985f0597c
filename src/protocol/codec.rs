//! Frame codec (encode/decode) and streaming frame extraction
//!
//! The control socket is a plain byte stream, so frames are recovered with a
//! small header/payload state machine over a `BytesMut` accumulator.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::{FrameError, FrameHeader, HEADER_SIZE, MAX_MESSAGE_SIZE, Message, Result};

/// Encode a message to bytes
///
/// # Format
///
/// ```text
/// [HEADER (8 bytes)] [PAYLOAD (len bytes)]
/// ```
#[must_use]
pub fn encode(message: &Message) -> Bytes {
    let payload = message.payload();
    let mut bytes = BytesMut::with_capacity(HEADER_SIZE + payload.len());

    bytes.put_slice(&message.header().to_bytes());
    bytes.put_slice(payload);

    bytes.freeze()
}

/// Decode exactly one message from bytes
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is shorter than the header or the announced payload
/// - Bytes remain after the announced payload
pub fn decode(bytes: Bytes) -> Result<Message> {
    let header = FrameHeader::from_bytes(&bytes)?;
    let total = header.frame_len();

    if bytes.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            got: bytes.len(),
        });
    }
    if bytes.len() > total {
        return Err(FrameError::TrailingBytes {
            extra: bytes.len() - total,
        });
    }

    let payload = bytes.slice(HEADER_SIZE..total);
    Ok(Message::from_parts(header, payload))
}

/// Parsing state of a [`FrameBuffer`]
#[derive(Debug, Clone, Copy)]
enum State {
    /// Need a complete 8-byte header
    WaitingForHeader,
    /// Header parsed, waiting for the payload bytes
    WaitingForPayload { header: FrameHeader },
}

/// Accumulates stream reads and extracts complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_payload: usize,
}

impl FrameBuffer {
    /// Create a frame buffer that accepts payloads up to [`MAX_MESSAGE_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_payload(MAX_MESSAGE_SIZE)
    }

    /// Create a frame buffer with a custom payload limit.
    #[must_use]
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(HEADER_SIZE + max_payload),
            state: State::WaitingForHeader,
            max_payload,
        }
    }

    /// Push bytes read from the stream and extract every complete frame.
    ///
    /// Partial frames stay buffered for the next push. An oversized length
    /// field is a stream-level failure: the buffer cannot resynchronise
    /// afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    if self.buffer.len() < HEADER_SIZE {
                        return Ok(None);
                    }

                    let header = FrameHeader::from_bytes(&self.buffer[..HEADER_SIZE])?;
                    let len = header.payload_len() as usize;
                    if len > self.max_payload {
                        return Err(FrameError::PayloadTooLarge {
                            size: len,
                            max: self.max_payload,
                        });
                    }

                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::WaitingForPayload { header };
                }
                State::WaitingForPayload { header } => {
                    let len = header.payload_len() as usize;
                    if self.buffer.len() < len {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(len).freeze();
                    self.state = State::WaitingForHeader;
                    trace!(
                        sapi = header.sapi().as_u16(),
                        type_code = header.type_code().as_u16(),
                        len,
                        "frame extracted"
                    );
                    return Ok(Some(Message::from_parts(header, payload)));
                }
            }
        }
    }

    /// Number of buffered bytes not yet returned as frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no partial data is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::WaitingForHeader)
    }

    /// Drop buffered data and reset the state machine.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Sapi, TypeCode};

    fn message(type_code: u16, payload: &'static [u8]) -> Message {
        Message::new(Sapi::OM, TypeCode::new(type_code), payload).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = message(1, b"abc\0");
        let decoded = decode(encode(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_truncated_payload() {
        let encoded = encode(&message(1, b"abcdef"));
        let result = decode(encoded.slice(..encoded.len() - 1));
        assert_eq!(
            result,
            Err(FrameError::BufferTooSmall {
                needed: HEADER_SIZE + 6,
                got: HEADER_SIZE + 5
            })
        );
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = BytesMut::from(&encode(&message(1, b"ab"))[..]);
        bytes.put_u8(0);
        let result = decode(bytes.freeze());
        assert_eq!(result, Err(FrameError::TrailingBytes { extra: 1 }));
    }

    #[test]
    fn test_frame_buffer_fragmented() {
        let encoded = encode(&message(4, b"payload"));
        let mut buffer = FrameBuffer::new();

        assert!(buffer.push(&encoded[..3]).unwrap().is_empty());
        assert!(buffer.push(&encoded[3..10]).unwrap().is_empty());
        let frames = buffer.push(&encoded[10..]).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload().as_ref(), b"payload");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_frame_buffer_multiple_frames() {
        let mut stream = BytesMut::new();
        stream.put_slice(&encode(&message(257, b"")));
        stream.put_slice(&encode(&message(513, b"\x05\0\0\0\xf8\xff")));
        stream.put_slice(&encode(&message(1, b"x"))[..4]);

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&stream).unwrap();

        assert_eq!(frames.len(), 2);
        assert!(frames[0].payload().is_empty());
        assert_eq!(frames[1].type_code(), TypeCode::new(513));
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_frame_buffer_rejects_oversized_length() {
        let header = FrameHeader::new(Sapi::OM, TypeCode::new(1), 1_000_000);
        let mut buffer = FrameBuffer::with_max_payload(1024);
        let result = buffer.push(&header.to_bytes());
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLarge {
                size: 1_000_000,
                max: 1024
            })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: arbitrary chunking of a frame stream yields the same frames
            #[test]
            fn prop_chunking_is_transparent(
                payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8),
                chunk in 1usize..32,
            ) {
                let mut stream = Vec::new();
                let mut originals = Vec::new();
                for (i, payload) in payloads.into_iter().enumerate() {
                    let code = u16::try_from(i).unwrap();
                    let msg = Message::new(Sapi::OM, TypeCode::new(code), payload).unwrap();
                    stream.extend_from_slice(&encode(&msg));
                    originals.push(msg);
                }

                let mut buffer = FrameBuffer::new();
                let mut frames = Vec::new();
                for piece in stream.chunks(chunk) {
                    frames.extend(buffer.push(piece).unwrap());
                }

                prop_assert_eq!(frames, originals);
                prop_assert!(buffer.is_empty());
            }
        }
    }
}
