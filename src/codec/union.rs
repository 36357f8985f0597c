//! Discriminated-union codec
//!
//! The selector and its payload are coded as one unit. A selector outside the
//! schema's closed set is reported as [`UnionKind::UnknownSelector`]; when the
//! union has a sized region the region is kept raw and decoding continues.

use bytes::Bytes;
use tracing::warn;

use crate::schema::UnionSpec;

use super::record::{Decoder, Encoder};
use super::wire::WireReader;
use super::{CodecErrorKind, DiagnosticKind, UnionValue, Value};

/// Classification of a raw selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    /// Selector names a declared arm
    ValidVariant(u64),
    /// The "none" selector
    ExplicitlyAbsent,
    /// Selector unknown to this schema
    UnknownSelector(u64),
}

/// Classify a raw selector against the union's closed set
#[must_use]
pub fn classify_selector(spec: &UnionSpec, raw: u64) -> UnionKind {
    if raw == spec.absent() {
        UnionKind::ExplicitlyAbsent
    } else if spec.find(raw).is_some() {
        UnionKind::ValidVariant(raw)
    } else {
        UnionKind::UnknownSelector(raw)
    }
}

impl Encoder {
    pub(super) fn union(&mut self, spec: &UnionSpec, value: Option<&Value>) -> super::Result<()> {
        let region = spec.region_size();

        let union = match value {
            None | Some(Value::Absent | Value::Union(UnionValue::Absent)) => {
                self.writer.put_scalar(spec.selector(), spec.absent());
                self.writer.put_zeros(region.unwrap_or(0));
                return Ok(());
            }
            Some(Value::Union(union)) => union,
            Some(_) => {
                return Err(self.error(CodecErrorKind::TypeMismatch { expected: "union" }));
            }
        };

        match union {
            UnionValue::Variant { tag, record } => {
                let Some(variant) = spec.find(*tag) else {
                    return Err(self.error(CodecErrorKind::UnknownVariant { tag: *tag }));
                };
                self.writer.put_scalar(spec.selector(), *tag);
                let start = self.writer.len();

                self.path.push_field(variant.name());
                self.record(variant.record(), record)?;
                self.path.pop();

                if let Some(size) = region {
                    let written = self.writer.len() - start;
                    self.writer.put_zeros(size.saturating_sub(written));
                }
                Ok(())
            }
            UnionValue::Unknown { selector, raw } => {
                let Some(size) = region else {
                    return Err(self.error(CodecErrorKind::UnknownSelector {
                        selector: *selector,
                    }));
                };
                if raw.len() != size {
                    return Err(self.error(CodecErrorKind::LengthMismatch {
                        expected: size,
                        got: raw.len(),
                    }));
                }
                self.writer.put_scalar(spec.selector(), *selector);
                self.writer.put_slice(raw);
                Ok(())
            }
            UnionValue::Absent => unreachable!("handled above"),
        }
    }
}

impl Decoder<'_> {
    pub(super) fn union(&mut self, spec: &UnionSpec) -> super::Result<Value> {
        let selector_offset = self.reader.offset();
        let raw = self
            .reader
            .read_scalar(spec.selector())
            .map_err(|kind| self.error(kind))?;

        match (classify_selector(spec, raw), spec.region_size()) {
            (UnionKind::ExplicitlyAbsent, Some(size)) => {
                self.reader.skip(size).map_err(|kind| self.error(kind))?;
                Ok(Value::Union(UnionValue::Absent))
            }
            (UnionKind::ExplicitlyAbsent, None) => Ok(Value::Union(UnionValue::Absent)),
            (UnionKind::ValidVariant(tag), region) => {
                let Some(variant) = spec.find(tag) else {
                    return Err(self.error(CodecErrorKind::UnknownSelector { selector: tag }));
                };
                self.path.push_field(variant.name());
                let record = match region {
                    Some(size) => {
                        let base = self.reader.offset();
                        let bytes = self.reader.take(size).map_err(|kind| self.error(kind))?;
                        let outer = std::mem::replace(
                            &mut self.reader,
                            WireReader::nested(bytes, base),
                        );
                        let result = self.record(variant.record());
                        self.reader = outer;
                        result?
                    }
                    None => self.record(variant.record())?,
                };
                self.path.pop();
                Ok(Value::Union(UnionValue::Variant { tag, record }))
            }
            (UnionKind::UnknownSelector(selector), Some(size)) => {
                let bytes = self.reader.take(size).map_err(|kind| self.error(kind))?;
                warn!(path = %self.path, selector, "unknown union selector, region skipped");
                self.diagnose(selector_offset, DiagnosticKind::UnknownSelector { selector });
                Ok(Value::Union(UnionValue::Unknown {
                    selector,
                    raw: Bytes::copy_from_slice(bytes),
                }))
            }
            (UnionKind::UnknownSelector(selector), None) => {
                Err(self.error(CodecErrorKind::UnknownSelector { selector }))
            }
        }
    }
}
