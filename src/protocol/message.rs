//! Control message: a frame header plus its raw payload

use bytes::Bytes;

use super::{FrameError, FrameHeader, Sapi, TypeCode};

/// One framed control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message header
    header: FrameHeader,
    /// Message payload
    payload: Bytes,
}

impl Message {
    /// Create a new message
    ///
    /// Fails only if the payload does not fit the 32-bit length field.
    pub fn new(sapi: Sapi, type_code: TypeCode, payload: impl Into<Bytes>) -> super::Result<Self> {
        let payload = payload.into();
        let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        })?;
        let header = FrameHeader::new(sapi, type_code, len);

        Ok(Self { header, payload })
    }

    /// Create a message from a decoded header and payload
    pub(crate) fn from_parts(header: FrameHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Get the service access point
    #[must_use]
    pub const fn sapi(&self) -> Sapi {
        self.header.sapi()
    }

    /// Get the type code
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        self.header.type_code()
    }

    /// Get payload
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the message, returning its payload
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Get header
    #[must_use]
    pub const fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Encode message to bytes
    #[must_use]
    pub fn encode(&self) -> Bytes {
        super::encode(self)
    }

    /// Decode message from exactly one frame
    pub fn decode(bytes: Bytes) -> super::Result<Self> {
        super::decode(bytes)
    }
}
