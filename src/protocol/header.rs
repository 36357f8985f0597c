//! L2 server frame header
//!
//! Every control message starts with the same 8-byte little-endian header.

use super::{FrameError, HEADER_SIZE, Result, Sapi, TypeCode};

/// Frame header (8 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            SAPI (2)           |            Type (2)           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Payload Length (4)                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameHeader {
    sapi: u16,
    type_code: u16,
    len: u32,
}

impl FrameHeader {
    /// Create a new frame header
    #[must_use]
    pub const fn new(sapi: Sapi, type_code: TypeCode, len: u32) -> Self {
        Self {
            sapi: sapi.as_u16(),
            type_code: type_code.as_u16(),
            len,
        }
    }

    /// Get the service access point
    #[must_use]
    pub const fn sapi(&self) -> Sapi {
        Sapi::new(self.sapi)
    }

    /// Get the type code
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        TypeCode::new(self.type_code)
    }

    /// Get payload length
    #[must_use]
    pub const fn payload_len(&self) -> u32 {
        self.len
    }

    /// Total frame length (header + payload)
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        HEADER_SIZE + self.len as usize
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0..2].copy_from_slice(&self.sapi.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.type_code.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());

        bytes
    }

    /// Parse from bytes (little-endian)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::BufferTooSmall {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        Ok(Self {
            sapi: u16::from_le_bytes([bytes[0], bytes[1]]),
            type_code: u16::from_le_bytes([bytes[2], bytes[3]]),
            len: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}
