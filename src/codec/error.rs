//! Codec errors, field paths and recoverable diagnostics

use std::fmt;

use thiserror::Error;

use crate::schema::ScalarKind;

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named field, union arm or root record
    Field(String),
    /// List element
    Index(usize),
}

/// Location of a field inside a record tree, e.g.
/// `CellConfig.PdcchConfDed.DedCtrlResSetsToAdd[2]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// Empty path
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path segments, root first
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Whether the path is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push_field(&mut self, name: &str) {
        self.0.push(PathSegment::Field(name.to_owned()));
    }

    pub(crate) fn push_index(&mut self, index: usize) {
        self.0.push(PathSegment::Index(index));
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong at a field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// Fewer bytes remain than the field needs
    #[error("truncated input: need {needed} bytes, {available} available")]
    TruncatedInput {
        /// Bytes needed
        needed: usize,
        /// Bytes left
        available: usize,
    },

    /// More list items than the declared capacity
    #[error("{len} items exceed capacity {max}")]
    CapacityExceeded {
        /// Item count
        len: usize,
        /// Declared capacity
        max: usize,
    },

    /// Decoded count larger than the declared capacity
    #[error("count {count} exceeds capacity {max}")]
    CountExceedsCapacity {
        /// Decoded count
        count: u64,
        /// Declared capacity
        max: usize,
    },

    /// Selector outside the closed set of a packed union
    #[error("unknown union selector {selector}")]
    UnknownSelector {
        /// Raw selector
        selector: u64,
    },

    /// Value names a union arm the schema does not declare
    #[error("union has no variant with tag {tag}")]
    UnknownVariant {
        /// Requested tag
        tag: u64,
    },

    /// Integer does not fit the field
    #[error("value {value} does not fit {kind}")]
    OutOfRange {
        /// Offending value
        value: i128,
        /// Field kind
        kind: ScalarKind,
    },

    /// Present value collides with the field's "absent" sentinel
    #[error("value {raw:#x} is reserved for \"absent\"")]
    ReservedValue {
        /// Raw bit pattern
        raw: u64,
    },

    /// Field has no sentinel, so it cannot be absent
    #[error("field cannot be absent")]
    AbsentNotAllowed,

    /// Value of the wrong shape for the field
    #[error("expected {expected} value")]
    TypeMismatch {
        /// Expected shape
        expected: &'static str,
    },

    /// Required field missing from the record
    #[error("missing field")]
    MissingField,

    /// String does not fit with its terminating NUL
    #[error("string of {len} bytes exceeds {max}")]
    StringTooLong {
        /// String length
        len: usize,
        /// Longest allowed length
        max: usize,
    },

    /// String is not valid UTF-8 or contains NUL
    #[error("invalid text")]
    InvalidText,

    /// Byte array of the wrong length
    #[error("expected {expected} bytes, got {got}")]
    LengthMismatch {
        /// Declared length
        expected: usize,
        /// Supplied length
        got: usize,
    },

    /// Mask value disagrees with which optional fields are present
    #[error("mask {found:#x} disagrees with present fields {expected:#x}")]
    MaskMismatch {
        /// Bits implied by present fields
        expected: u32,
        /// Governed bits in the supplied mask
        found: u32,
    },

    /// Count value disagrees with the list length
    #[error("count {found} disagrees with list length {expected}")]
    CountMismatch {
        /// List length
        expected: usize,
        /// Supplied count
        found: u64,
    },

    /// Bytes left over after the record
    #[error("{extra} trailing bytes")]
    TrailingBytes {
        /// Unconsumed bytes
        extra: usize,
    },
}

/// Field-level codec failure with its location
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {path} (offset {offset})")]
pub struct CodecError {
    path: FieldPath,
    offset: usize,
    kind: CodecErrorKind,
}

impl CodecError {
    pub(crate) fn new(path: FieldPath, offset: usize, kind: CodecErrorKind) -> Self {
        Self { path, offset, kind }
    }

    /// Path of the failing field
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Byte offset where the failure was detected
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Failure kind
    #[must_use]
    pub fn kind(&self) -> &CodecErrorKind {
        &self.kind
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CodecError>;

/// Recoverable event observed while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Union selector outside the schema's closed set; its region was kept raw
    UnknownSelector {
        /// Raw selector
        selector: u64,
    },
    /// Mask bits that govern no field in this schema
    ReservedMaskBits {
        /// Unknown bits
        bits: u32,
    },
}

/// Schema-recoverable event with its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Field path
    pub path: FieldPath,
    /// Byte offset
    pub offset: usize,
    /// What was recovered
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::UnknownSelector { selector } => write!(
                f,
                "{}: unknown selector {selector} skipped (offset {})",
                self.path, self.offset
            ),
            DiagnosticKind::ReservedMaskBits { bits } => write!(
                f,
                "{}: reserved mask bits {bits:#x} preserved (offset {})",
                self.path, self.offset
            ),
        }
    }
}
