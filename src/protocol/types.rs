//! Type codes, SAP identifiers and server error codes

use std::fmt;

use super::{ACK_OFFSET, NAK_OFFSET};

/// Message type code carried in the frame header
///
/// Commands use the low range; the server answers command `T` with `T + 256`
/// (ACK) or `T + 512` (NAK).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeCode(u16);

impl TypeCode {
    /// Wrap a raw type code
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Positive acknowledgement code for this command
    #[must_use]
    pub const fn ack(self) -> Self {
        Self(self.0.wrapping_add(ACK_OFFSET))
    }

    /// Negative acknowledgement code for this command
    #[must_use]
    pub const fn nak(self) -> Self {
        Self(self.0.wrapping_add(NAK_OFFSET))
    }

    /// Classify `self` as a response to `command`, if it is one
    #[must_use]
    pub const fn response_to(self, command: Self) -> Option<ResponseKind> {
        if self.0 == command.ack().0 {
            Some(ResponseKind::Ack)
        } else if self.0 == command.nak().0 {
            Some(ResponseKind::Nak)
        } else {
            None
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self.0, self.0)
    }
}

/// Kind of response received for an outstanding command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Positive acknowledgement (`cmd + 256`)
    Ack,
    /// Negative acknowledgement (`cmd + 512`)
    Nak,
}

/// Service access point identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sapi(u16);

impl Sapi {
    /// Server error indications
    pub const SRV_ERROR: Self = Self(1);
    /// Operation and maintenance (server commands)
    pub const OM: Self = Self(2);
    /// License management
    pub const LIC: Self = Self(3);
    /// Test-manager operation and maintenance
    pub const OM_TM: Self = Self(4);
    /// LTE RLC/MAC control
    pub const RLCMAC_CMAC: Self = Self(12);
    /// NR5G RLC/MAC control
    pub const NR_RLCMAC_CMAC: Self = Self(143);
    /// NR5G RLC control
    pub const NR_RLCMAC_CRLC: Self = Self(144);

    /// Wrap a raw SAP identifier
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Sapi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::SRV_ERROR => "SRV_ERROR",
            Self::OM => "OM",
            Self::LIC => "LIC",
            Self::OM_TM => "OM_TM",
            Self::RLCMAC_CMAC => "RLCMAC_CMAC",
            Self::NR_RLCMAC_CMAC => "NR_RLCMAC_CMAC",
            Self::NR_RLCMAC_CRLC => "NR_RLCMAC_CRLC",
            _ => return write!(f, "SAP {}", self.0),
        };
        write!(f, "{name}")
    }
}

/// Severity of a server error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// `NOERR`
    None,
    /// Positive codes: the request failed, the connection stays usable
    Recoverable,
    /// Negative codes: the server considers the connection broken
    Fatal,
}

/// Signed 16-bit error code carried in NAKs and error indications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerErrorCode(i16);

impl ServerErrorCode {
    /// No error
    pub const NOERR: Self = Self(0);

    /// Message too long
    pub const EFMAT: Self = Self(-1);
    /// Server is exiting
    pub const EEXIT: Self = Self(-2);
    /// Missing LOGIN, CFG or START
    pub const EPHASE: Self = Self(-3);
    /// Duplicate login
    pub const ELOGIN: Self = Self(-4);
    /// Unknown or unreachable SAP
    pub const ESAPI: Self = Self(-5);
    /// Unknown message type
    pub const ETYPE: Self = Self(-6);
    /// Invalid message length
    pub const ELEN: Self = Self(-7);
    /// Illegal parameter
    pub const EINVAL: Self = Self(-8);
    /// Start failure
    pub const ESTRT: Self = Self(-9);
    /// Stack failure
    pub const ESTK: Self = Self(-10);
    /// AMM failure
    pub const EAMM: Self = Self(-11);
    /// NB-IoT failure
    pub const ENBIOT: Self = Self(-12);

    /// Unexpected primitive
    pub const EUNEXP: Self = Self(1);
    /// Invalid parameter
    pub const EPARM: Self = Self(2);
    /// Invalid object id
    pub const ESRCH: Self = Self(3);
    /// Duplicate object
    pub const EDUP: Self = Self(4);
    /// Resource exhausted
    pub const EMAX: Self = Self(5);
    /// Table not empty
    pub const ETNE: Self = Self(6);
    /// Wait for ACK before sending another command
    pub const EWTAK: Self = Self(7);
    /// Negative acknowledgement from a lower layer
    pub const ENAK: Self = Self(8);
    /// Send failure
    pub const ESEND: Self = Self(9);
    /// File error
    pub const EFILE: Self = Self(10);

    /// Wrap a raw code
    #[must_use]
    pub const fn new(value: i16) -> Self {
        Self(value)
    }

    /// Raw value
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self.0
    }

    /// Severity derived from the sign of the code
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self.0 {
            0 => Severity::None,
            v if v < 0 => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    /// Whether the server treats this code as connection-fatal
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        self.0 < 0
    }

    /// Symbolic name, if the code is one the server defines
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.describe() {
            Some((name, _)) => Some(name),
            None => None,
        }
    }

    /// Human-readable description, if known
    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        match self.describe() {
            Some((_, text)) => Some(text),
            None => None,
        }
    }

    const fn describe(self) -> Option<(&'static str, &'static str)> {
        let entry = match self.0 {
            0 => ("NOERR", "no error"),
            -1 => ("EFMAT", "message too long"),
            -2 => ("EEXIT", "server exiting"),
            -3 => ("EPHASE", "missing LOGIN, CFG or START"),
            -4 => ("ELOGIN", "duplicate login"),
            -5 => ("ESAPI", "unknown or unreachable SAP"),
            -6 => ("ETYPE", "unknown message type"),
            -7 => ("ELEN", "invalid message length"),
            -8 => ("EINVAL", "illegal parameter"),
            -9 => ("ESTRT", "start failure"),
            -10 => ("ESTK", "stack failure"),
            -11 => ("EAMM", "AMM failure"),
            -12 => ("ENBIOT", "NB-IoT failure"),
            1 => ("EUNEXP", "unexpected primitive"),
            2 => ("EPARM", "invalid parameter"),
            3 => ("ESRCH", "invalid object id"),
            4 => ("EDUP", "duplicate object"),
            5 => ("EMAX", "resource exhausted"),
            6 => ("ETNE", "table not empty"),
            7 => ("EWTAK", "wait for ack"),
            8 => ("ENAK", "negative acknowledgement"),
            9 => ("ESEND", "send failure"),
            10 => ("EFILE", "file error"),
            _ => return None,
        };
        Some(entry)
    }
}

impl fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Some((name, text)) => write!(f, "{name} ({}): {text}", self.0),
            None => write!(f, "error {}", self.0),
        }
    }
}

impl From<i16> for ServerErrorCode {
    fn from(value: i16) -> Self {
        Self(value)
    }
}
