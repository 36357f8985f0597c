//! Schema construction and registry errors

use thiserror::Error;

use crate::protocol::{Sapi, TypeCode};

use super::ScalarKind;

/// Errors raised while building schemas or registering commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields of one record share a name
    #[error("{record}: duplicate field `{field}`")]
    DuplicateField {
        /// Record name
        record: String,
        /// Field name
        field: String,
    },

    /// Optional field refers to a mask that is not declared before it
    #[error("{record}.{field}: mask `{mask}` is not an earlier mask field")]
    UnknownMask {
        /// Record name
        record: String,
        /// Optional field name
        field: String,
        /// Referenced mask
        mask: String,
    },

    /// Mask bit outside the mask width
    #[error("{record}.{field}: bit {bit} does not fit a {width}-bit mask")]
    BitOutOfRange {
        /// Record name
        record: String,
        /// Optional field name
        field: String,
        /// Requested bit
        bit: u8,
        /// Mask width in bits
        width: u8,
    },

    /// Two optional fields share one mask bit
    #[error("{record}: bit {bit} of mask `{mask}` is used twice")]
    DuplicateBit {
        /// Record name
        record: String,
        /// Mask name
        mask: String,
        /// Shared bit
        bit: u8,
    },

    /// Optional fields of one mask are not declared in ascending bit order
    #[error("{record}.{field}: optional fields must follow mask-bit order")]
    BitOrder {
        /// Record name
        record: String,
        /// Out-of-order field
        field: String,
    },

    /// Two union arms share a selector value
    #[error("{record}.{field}: selector {tag} is used by two variants")]
    DuplicateTag {
        /// Record name
        record: String,
        /// Union field name
        field: String,
        /// Shared tag
        tag: u64,
    },

    /// Union arm uses the "none" selector value
    #[error("{record}.{field}: selector {tag} is reserved for \"absent\"")]
    TagIsSentinel {
        /// Record name
        record: String,
        /// Union field name
        field: String,
        /// Offending tag
        tag: u64,
    },

    /// Selector value does not fit the selector width
    #[error("{record}.{field}: selector {tag} does not fit {kind}")]
    TagOverflow {
        /// Record name
        record: String,
        /// Union field name
        field: String,
        /// Offending tag
        tag: u64,
        /// Selector kind
        kind: ScalarKind,
    },

    /// Union region cannot be sized because an arm has variable size
    #[error("{record}.{field}: variant `{variant}` has no fixed size")]
    VariableVariant {
        /// Record name
        record: String,
        /// Union field name
        field: String,
        /// Variant name
        variant: String,
    },

    /// Union arm larger than its reserved region
    #[error("{record}.{field}: variant `{variant}` needs {size} bytes, {reserved} reserved")]
    VariantTooLarge {
        /// Record name
        record: String,
        /// Union field name
        field: String,
        /// Variant name
        variant: String,
        /// Variant size
        size: usize,
        /// Reserved region
        reserved: usize,
    },

    /// List capacity cannot be expressed by its count scalar
    #[error("{record}.{field}: capacity {max} does not fit a {kind} count")]
    CapacityOverflow {
        /// Record name
        record: String,
        /// List field name
        field: String,
        /// Declared capacity
        max: usize,
        /// Count kind
        kind: ScalarKind,
    },

    /// List count field missing, declared later, or not an unsigned scalar
    #[error("{record}.{field}: count field `{count}` must be an earlier unsigned scalar")]
    InvalidCountField {
        /// Record name
        record: String,
        /// List field name
        field: String,
        /// Referenced count field
        count: String,
    },

    /// Fixed-capacity array of variable-size elements
    #[error("{record}.{field}: fixed-capacity arrays need fixed-size elements")]
    VariableElement {
        /// Record name
        record: String,
        /// List field name
        field: String,
    },

    /// Segment counter or id field is missing, of the wrong kind, or not at a fixed offset
    #[error("{name}: segmentation field `{field}` must be a fixed-offset {expected} scalar")]
    InvalidSegmentation {
        /// Command name
        name: String,
        /// Offending field
        field: String,
        /// Required scalar kind
        expected: ScalarKind,
    },

    /// Command re-registered with a different schema
    #[error("{name} ({sapi}, type {code}) already registered with a different schema")]
    Conflict {
        /// Command name
        name: String,
        /// Service access point
        sapi: Sapi,
        /// Command type code
        code: TypeCode,
    },

    /// No schema registered for a type code
    #[error("no schema registered for type {code} on {sapi}")]
    UnknownType {
        /// Service access point
        sapi: Sapi,
        /// Type code
        code: TypeCode,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SchemaError>;
