//! Counted-list and fixed-capacity array codec

use bytes::Bytes;

use crate::schema::{CountSource, ElementSpec, ListLayout, ListSpec, ScalarSpec};

use super::record::{Decoder, Encoder};
use super::{CodecErrorKind, Value};

/// Number of items a list value carries
pub(super) fn list_len(spec: &ListSpec, value: Option<&Value>) -> Result<usize, CodecErrorKind> {
    match (spec.element(), value) {
        (_, None | Some(Value::Absent)) => Ok(0),
        (ElementSpec::Octet, Some(Value::Bytes(bytes))) => Ok(bytes.len()),
        (ElementSpec::Octet, Some(_)) => Err(CodecErrorKind::TypeMismatch { expected: "bytes" }),
        (_, Some(Value::List(items))) => Ok(items.len()),
        (_, Some(_)) => Err(CodecErrorKind::TypeMismatch { expected: "list" }),
    }
}

impl Encoder {
    pub(super) fn list(&mut self, spec: &ListSpec, value: Option<&Value>) -> super::Result<()> {
        let len = list_len(spec, value).map_err(|kind| self.error(kind))?;
        if len > spec.max() {
            return Err(self.error(CodecErrorKind::CapacityExceeded {
                len,
                max: spec.max(),
            }));
        }

        if let CountSource::Inline(kind) = spec.count() {
            self.writer.put_scalar(*kind, len as u64);
        }

        match (spec.element(), value) {
            (_, None | Some(Value::Absent)) => {}
            (ElementSpec::Octet, Some(Value::Bytes(bytes))) => self.writer.put_slice(bytes),
            (element, Some(Value::List(items))) => {
                for (index, item) in items.iter().enumerate() {
                    self.path.push_index(index);
                    self.element(element, item)?;
                    self.path.pop();
                }
            }
            (_, Some(_)) => unreachable!("shape checked by list_len"),
        }

        if spec.layout() == ListLayout::FixedCapacity {
            let size = spec.element().fixed_size().unwrap_or(0);
            self.writer.put_zeros((spec.max() - len) * size);
        }
        Ok(())
    }

    fn element(&mut self, element: &ElementSpec, item: &Value) -> super::Result<()> {
        match element {
            ElementSpec::Octet => unreachable!("octet lists are carried as bytes"),
            ElementSpec::Scalar(kind) => {
                let raw = item
                    .to_raw(&ScalarSpec::new(*kind))
                    .map_err(|k| self.error(k))?;
                self.writer.put_scalar(*kind, raw);
            }
            ElementSpec::Record(schema) => match item {
                Value::Record(record) => self.record(schema, record)?,
                _ => return Err(self.error(CodecErrorKind::TypeMismatch { expected: "record" })),
            },
        }
        Ok(())
    }
}

impl Decoder<'_> {
    /// `count` is the value of the governing count field, for lists counted by one
    pub(super) fn list(&mut self, spec: &ListSpec, count: Option<u64>) -> super::Result<Value> {
        let count = match spec.count() {
            CountSource::Inline(kind) => self
                .reader
                .read_scalar(*kind)
                .map_err(|k| self.error(k))?,
            CountSource::Field(_) => count.ok_or_else(|| self.error(CodecErrorKind::MissingField))?,
        };

        let len = match usize::try_from(count) {
            Ok(len) if len <= spec.max() => len,
            _ => {
                return Err(self.error(CodecErrorKind::CountExceedsCapacity {
                    count,
                    max: spec.max(),
                }));
            }
        };

        let slots = match spec.layout() {
            ListLayout::Exact => len,
            ListLayout::FixedCapacity => spec.max(),
        };
        let size = spec.element().fixed_size();
        if let Some(size) = size {
            self.reader
                .require(slots * size)
                .map_err(|k| self.error(k))?;
        }

        let value = match spec.element() {
            ElementSpec::Octet => {
                let bytes = self.reader.take(len).map_err(|k| self.error(k))?;
                Value::Bytes(Bytes::copy_from_slice(bytes))
            }
            ElementSpec::Scalar(kind) => {
                let spec = ScalarSpec::new(*kind);
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    let raw = self.reader.read_scalar(*kind).map_err(|k| self.error(k))?;
                    items.push(Value::from_raw(&spec, raw));
                }
                Value::List(items)
            }
            ElementSpec::Record(schema) => {
                let mut items = Vec::with_capacity(len);
                for index in 0..len {
                    self.path.push_index(index);
                    items.push(Value::Record(self.record(schema)?));
                    self.path.pop();
                }
                Value::List(items)
            }
        };

        if let Some(size) = size {
            self.reader
                .skip((slots - len) * size)
                .map_err(|k| self.error(k))?;
        }
        Ok(value)
    }
}
