//! Schema-driven payload codec
//!
//! Converts between [`Record`] value trees and the packed little-endian
//! payloads the L2 server expects. All widths and presence rules come from
//! the [`RecordSchema`](crate::schema::RecordSchema); nothing is inferred from
//! the value.
//!
//! Decoding recovers from two things a newer server may send: a union
//! selector this schema does not know (when the union has a sized region)
//! and mask bits that govern no field. Both are reported as [`Diagnostic`]s
//! alongside the decoded record.

mod error;
mod list;
mod mask;
mod record;
mod union;
mod value;
mod wire;

pub use error::{
    CodecError, CodecErrorKind, Diagnostic, DiagnosticKind, FieldPath, PathSegment, Result,
};
pub use mask::{decode_mask, encode_mask, governed_bits};
pub use record::{Decoded, decode_prefix, decode_record, encode_record};
pub use union::{UnionKind, classify_selector};
pub use value::{PresenceMask, Record, UnionValue, Value};
pub use wire::{WireReader, WireWriter};
