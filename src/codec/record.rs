//! Record assembler
//!
//! Walks a [`RecordSchema`] in field order and dispatches each field to its
//! codec. The mask, union and list codecs extend [`Encoder`] and [`Decoder`]
//! in their own modules.
//!
//! ```text
//!   Record ──encode_record──► bytes ──decode_record──► Decoded { record, diagnostics }
//! ```

use bytes::Bytes;
use tracing::{instrument, trace};

use crate::protocol::metrics::Metrics;
use crate::schema::{CountSource, FieldKind, RecordSchema, ScalarSpec};

use super::list::list_len;
use super::wire::{WireReader, WireWriter};
use super::{CodecError, CodecErrorKind, Diagnostic, DiagnosticKind, FieldPath, Record, Value};

/// Decoded record plus the recoverable events seen while decoding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Value tree, fields in schema order
    pub record: Record,
    /// Unknown selectors and reserved mask bits, in wire order
    pub diagnostics: Vec<Diagnostic>,
}

impl Decoded {
    /// Whether decoding recovered from anything
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Encode `record` as the payload described by `schema`
///
/// Masks and count fields may be omitted from `record`; they are derived from
/// the optional fields present and the list lengths. Nothing is returned on
/// error, so a failed encode never leaks a partial payload.
#[instrument(level = "debug", skip_all, fields(record = schema.name()))]
pub fn encode_record(schema: &RecordSchema, record: &Record) -> super::Result<Bytes> {
    let mut encoder = Encoder {
        writer: WireWriter::with_capacity(schema.fixed_size().unwrap_or(64)),
        path: FieldPath::new(),
    };
    encoder.path.push_field(schema.name());
    encoder.record(schema, record)?;

    let bytes = encoder.writer.into_bytes();
    trace!(len = bytes.len(), "record encoded");
    Ok(bytes)
}

/// Decode a payload that must consist of exactly one `schema` record
#[instrument(level = "debug", skip_all, fields(record = schema.name(), len = bytes.len()))]
pub fn decode_record(schema: &RecordSchema, bytes: &[u8]) -> super::Result<Decoded> {
    let (decoded, consumed) = decode_prefix(schema, bytes)?;
    if consumed != bytes.len() {
        let mut path = FieldPath::new();
        path.push_field(schema.name());
        return Err(CodecError::new(
            path,
            consumed,
            CodecErrorKind::TrailingBytes {
                extra: bytes.len() - consumed,
            },
        ));
    }
    Ok(decoded)
}

/// Decode one `schema` record from the front of `bytes`
///
/// Returns the record and the number of bytes it occupied. Used where a
/// record is followed by data outside the schema, such as a NAK's
/// diagnostic text.
pub fn decode_prefix(schema: &RecordSchema, bytes: &[u8]) -> super::Result<(Decoded, usize)> {
    let mut decoder = Decoder {
        reader: WireReader::new(bytes),
        path: FieldPath::new(),
        diagnostics: Vec::new(),
    };
    decoder.path.push_field(schema.name());
    let record = decoder.record(schema)?;
    let consumed = decoder.reader.offset();

    if !decoder.diagnostics.is_empty() {
        Metrics::record_diagnostics(decoder.diagnostics.len());
    }
    trace!(consumed, diagnostics = decoder.diagnostics.len(), "record decoded");

    Ok((
        Decoded {
            record,
            diagnostics: decoder.diagnostics,
        },
        consumed,
    ))
}

/// Encoding state: output buffer and the path of the field being written
pub(crate) struct Encoder {
    pub(super) writer: WireWriter,
    pub(super) path: FieldPath,
}

impl Encoder {
    pub(super) fn error(&self, kind: CodecErrorKind) -> CodecError {
        CodecError::new(self.path.clone(), self.writer.len(), kind)
    }

    pub(super) fn record(&mut self, schema: &RecordSchema, record: &Record) -> super::Result<()> {
        for field in schema.fields() {
            let name = field.name();
            let value = record.get(name);
            self.path.push_field(name);

            match field.kind() {
                FieldKind::Scalar(spec) => self.scalar(schema, name, spec, record)?,
                FieldKind::Bytes(len) => match value {
                    Some(Value::Bytes(bytes)) if bytes.len() == *len => {
                        self.writer.put_slice(bytes);
                    }
                    Some(Value::Bytes(bytes)) => {
                        return Err(self.error(CodecErrorKind::LengthMismatch {
                            expected: *len,
                            got: bytes.len(),
                        }));
                    }
                    None => return Err(self.error(CodecErrorKind::MissingField)),
                    Some(_) => {
                        return Err(self.error(CodecErrorKind::TypeMismatch { expected: "bytes" }));
                    }
                },
                FieldKind::AsciiZ(len) => self.asciiz(*len, value)?,
                FieldKind::Mask(width) => self.mask(schema, name, *width, record)?,
                FieldKind::Optional(opt) => match value {
                    None | Some(Value::Absent) => {}
                    Some(Value::Record(sub)) => self.record(opt.record(), sub)?,
                    Some(_) => {
                        return Err(self.error(CodecErrorKind::TypeMismatch { expected: "record" }));
                    }
                },
                FieldKind::Union(spec) => self.union(spec, value)?,
                FieldKind::List(spec) => self.list(spec, value)?,
                FieldKind::Record(sub_schema) => match value {
                    Some(Value::Record(sub)) => self.record(sub_schema, sub)?,
                    None => return Err(self.error(CodecErrorKind::MissingField)),
                    Some(_) => {
                        return Err(self.error(CodecErrorKind::TypeMismatch { expected: "record" }));
                    }
                },
            }

            self.path.pop();
        }
        Ok(())
    }

    fn scalar(
        &mut self,
        schema: &RecordSchema,
        name: &str,
        spec: &ScalarSpec,
        record: &Record,
    ) -> super::Result<()> {
        let value = record.get(name);
        let mut derived = None;
        for (list_field, list) in schema.counted_by(name) {
            let len =
                list_len(list, record.get(list_field.name())).map_err(|kind| self.error(kind))?;
            match derived {
                Some(prev) if prev != len => {
                    return Err(self.error(CodecErrorKind::CountMismatch {
                        expected: prev,
                        found: len as u64,
                    }));
                }
                _ => derived = Some(len),
            }
        }

        let raw = match (derived, value) {
            (Some(len), None | Some(Value::Absent)) => len as u64,
            (Some(len), Some(supplied)) => {
                let found = supplied.to_raw(spec).map_err(|kind| self.error(kind))?;
                if found != len as u64 {
                    return Err(self.error(CodecErrorKind::CountMismatch {
                        expected: len,
                        found,
                    }));
                }
                found
            }
            (None, None) if spec.absent().is_some() => Value::Absent
                .to_raw(spec)
                .map_err(|kind| self.error(kind))?,
            (None, None) => return Err(self.error(CodecErrorKind::MissingField)),
            (None, Some(value)) => value.to_raw(spec).map_err(|kind| self.error(kind))?,
        };

        self.writer.put_scalar(spec.kind(), raw);
        Ok(())
    }

    fn asciiz(&mut self, len: usize, value: Option<&Value>) -> super::Result<()> {
        let text = match value {
            Some(Value::Text(text)) => text,
            None => return Err(self.error(CodecErrorKind::MissingField)),
            Some(_) => return Err(self.error(CodecErrorKind::TypeMismatch { expected: "text" })),
        };
        if text.contains('\0') {
            return Err(self.error(CodecErrorKind::InvalidText));
        }
        if text.len() >= len {
            return Err(self.error(CodecErrorKind::StringTooLong {
                len: text.len(),
                max: len.saturating_sub(1),
            }));
        }
        self.writer.put_slice(text.as_bytes());
        self.writer.put_zeros(len - text.len());
        Ok(())
    }
}

/// Decoding state: input cursor, field path and collected diagnostics
pub(crate) struct Decoder<'a> {
    pub(super) reader: WireReader<'a>,
    pub(super) path: FieldPath,
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Decoder<'_> {
    pub(super) fn error(&self, kind: CodecErrorKind) -> CodecError {
        CodecError::new(self.path.clone(), self.reader.offset(), kind)
    }

    pub(super) fn diagnose(&mut self, offset: usize, kind: DiagnosticKind) {
        self.diagnostics.push(Diagnostic {
            path: self.path.clone(),
            offset,
            kind,
        });
    }

    pub(super) fn record(&mut self, schema: &RecordSchema) -> super::Result<Record> {
        let mut out = Record::new();
        for field in schema.fields() {
            let name = field.name();
            self.path.push_field(name);

            let value = match field.kind() {
                FieldKind::Scalar(spec) => {
                    let raw = self
                        .reader
                        .read_scalar(spec.kind())
                        .map_err(|kind| self.error(kind))?;
                    Value::from_raw(spec, raw)
                }
                FieldKind::Bytes(len) => {
                    let bytes = self.reader.take(*len).map_err(|kind| self.error(kind))?;
                    Value::Bytes(Bytes::copy_from_slice(bytes))
                }
                FieldKind::AsciiZ(len) => {
                    let bytes = self.reader.take(*len).map_err(|kind| self.error(kind))?;
                    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                    match std::str::from_utf8(&bytes[..end]) {
                        Ok(text) => Value::Text(text.to_owned()),
                        Err(_) => return Err(self.error(CodecErrorKind::InvalidText)),
                    }
                }
                FieldKind::Mask(width) => self.mask(schema, name, *width)?,
                FieldKind::Optional(opt) => {
                    let present = matches!(
                        out.get(opt.mask()),
                        Some(Value::Mask(mask)) if mask.contains(opt.bit())
                    );
                    if present {
                        Value::Record(self.record(opt.record())?)
                    } else {
                        Value::Absent
                    }
                }
                FieldKind::Union(spec) => self.union(spec)?,
                FieldKind::List(spec) => {
                    let count = match spec.count() {
                        CountSource::Field(count) => out.get_u64(count),
                        CountSource::Inline(_) => None,
                    };
                    self.list(spec, count)?
                }
                FieldKind::Record(sub) => Value::Record(self.record(sub)?),
            };

            trace!(path = %self.path, offset = self.reader.offset(), "field decoded");
            out.push(name, value);
            self.path.pop();
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::{PresenceMask, UnionValue};
    use crate::schema::{ElementSpec, ListSpec, MaskWidth, ScalarKind, UnionLayout, UnionSpec};

    fn tpc() -> Arc<RecordSchema> {
        RecordSchema::builder("Tpc").u8("Rnti").u8("Index").build().unwrap()
    }

    fn pdcch() -> Arc<RecordSchema> {
        RecordSchema::builder("Pdcch")
            .mask("FieldMask", MaskWidth::W8)
            .optional("TpcPucch", "FieldMask", 0, tpc())
            .optional("TpcPusch", "FieldMask", 1, tpc())
            .list(
                "Coresets",
                ListSpec::counted(ScalarKind::U8, 3, ElementSpec::Scalar(ScalarKind::U16)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_mask_derived_from_present_optionals() {
        let record = Record::new().with(
            "TpcPusch",
            Record::new().with("Rnti", 7u8).with("Index", 1u8),
        );
        let bytes = encode_record(&pdcch(), &record).unwrap();
        assert_eq!(&bytes[..], &[0b10, 7, 1, 0]);

        let decoded = decode_record(&pdcch(), &bytes).unwrap();
        assert!(decoded.is_clean());
        assert_eq!(
            decoded.record.get("FieldMask"),
            Some(&Value::Mask(PresenceMask::from_bits(0b10)))
        );
        assert!(decoded.record.get("TpcPucch").unwrap().is_absent());
        assert_eq!(
            decoded.record.get_record("TpcPusch").unwrap().get_u64("Rnti"),
            Some(7)
        );
    }

    #[test]
    fn test_mask_mismatch_rejected() {
        let record = Record::new().with("FieldMask", PresenceMask::from_bits(0b01));
        let err = encode_record(&pdcch(), &record).unwrap_err();
        assert_eq!(
            err.kind(),
            &CodecErrorKind::MaskMismatch {
                expected: 0,
                found: 1
            }
        );
        assert_eq!(err.path().to_string(), "Pdcch.FieldMask");
    }

    #[test]
    fn test_reserved_mask_bits_preserved() {
        let bytes = [0b1000_0000, 0];
        let decoded = decode_record(&pdcch(), &bytes).unwrap();
        assert_eq!(decoded.diagnostics.len(), 1);
        assert_eq!(
            decoded.diagnostics[0].kind,
            DiagnosticKind::ReservedMaskBits { bits: 0x80 }
        );

        let again = encode_record(&pdcch(), &decoded.record).unwrap();
        assert_eq!(&again[..], &bytes);
    }

    #[test]
    fn test_list_capacity() {
        let items: Vec<Value> = (0u16..4).map(Value::from).collect();
        let record = Record::new().with("Coresets", items);
        let err = encode_record(&pdcch(), &record).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::CapacityExceeded { len: 4, max: 3 });
        assert_eq!(err.path().to_string(), "Pdcch.Coresets");

        let err = decode_record(&pdcch(), &[0, 4]).unwrap_err();
        assert_eq!(
            err.kind(),
            &CodecErrorKind::CountExceedsCapacity { count: 4, max: 3 }
        );
    }

    #[test]
    fn test_fixed_capacity_padding() {
        let schema = RecordSchema::builder("Tdd")
            .u8("NumSlots")
            .list(
                "Slots",
                ListSpec::counted_by("NumSlots", 4, ElementSpec::Scalar(ScalarKind::U16))
                    .fixed_capacity(),
            )
            .u8("Trailer")
            .build()
            .unwrap();
        assert_eq!(schema.fixed_size(), Some(10));

        let record = Record::new()
            .with("Slots", vec![Value::from(0x0102u16), Value::from(3u16)])
            .with("Trailer", 9u8);
        let bytes = encode_record(&schema, &record).unwrap();
        assert_eq!(&bytes[..], &[2, 0x02, 0x01, 3, 0, 0, 0, 0, 0, 9]);

        let decoded = decode_record(&schema, &bytes).unwrap();
        assert_eq!(decoded.record.get_u64("NumSlots"), Some(2));
        assert_eq!(decoded.record.get("Slots").unwrap().as_list().unwrap().len(), 2);
        assert_eq!(decoded.record.get_u64("Trailer"), Some(9));

        let wrong = record.with("NumSlots", 3u8);
        let err = encode_record(&schema, &wrong).unwrap_err();
        assert_eq!(
            err.kind(),
            &CodecErrorKind::CountMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    fn qcl(layout: UnionLayout) -> Arc<RecordSchema> {
        let ssb = RecordSchema::builder("Ssb").u8("Index").build().unwrap();
        let csi = RecordSchema::builder("Csi").u16("ResourceId").build().unwrap();
        RecordSchema::builder("Qcl")
            .union(
                "RefSig",
                UnionSpec::new(ScalarKind::U8, 0xFF)
                    .variant(1, "Ssb", ssb)
                    .variant(2, "Csi", csi)
                    .layout(layout),
            )
            .u8("After")
            .build()
            .unwrap()
    }

    #[test]
    fn test_overlay_union_pads_to_largest_arm() {
        let schema = qcl(UnionLayout::Overlay);
        let record = Record::new()
            .with(
                "RefSig",
                UnionValue::Variant {
                    tag: 1,
                    record: Record::new().with("Index", 5u8),
                },
            )
            .with("After", 0xAAu8);
        let bytes = encode_record(&schema, &record).unwrap();
        assert_eq!(&bytes[..], &[1, 5, 0, 0xAA]);
        assert_eq!(decode_record(&schema, &bytes).unwrap().record, record);
    }

    #[test]
    fn test_unknown_selector_in_sized_union_is_skipped() {
        let schema = qcl(UnionLayout::Overlay);
        let decoded = decode_record(&schema, &[9, 0x11, 0x22, 0xAA]).unwrap();

        assert_eq!(decoded.record.get_u64("After"), Some(0xAA));
        assert_eq!(decoded.diagnostics.len(), 1);
        assert_eq!(decoded.diagnostics[0].path.to_string(), "Qcl.RefSig");
        assert_eq!(
            decoded.diagnostics[0].kind,
            DiagnosticKind::UnknownSelector { selector: 9 }
        );

        let again = encode_record(&schema, &decoded.record).unwrap();
        assert_eq!(&again[..], &[9, 0x11, 0x22, 0xAA]);
    }

    #[test]
    fn test_unknown_selector_in_packed_union_fails() {
        let schema = qcl(UnionLayout::Packed);
        let err = decode_record(&schema, &[9, 0x11, 0xAA]).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::UnknownSelector { selector: 9 });
        assert_eq!(err.offset(), 1);
    }

    #[test]
    fn test_absent_union_and_error_path() {
        let schema = qcl(UnionLayout::Packed);
        let bytes = encode_record(&schema, &Record::new().with("After", 1u8)).unwrap();
        assert_eq!(&bytes[..], &[0xFF, 1]);

        let err = decode_record(&schema, &[2, 0x01]).unwrap_err();
        assert_eq!(err.path().to_string(), "Qcl.RefSig.Csi.ResourceId");
        assert!(matches!(err.kind(), CodecErrorKind::TruncatedInput { .. }));
    }

    #[test]
    fn test_asciiz_rules() {
        let schema = RecordSchema::builder("Login").asciiz("CliName", 4).build().unwrap();

        let bytes = encode_record(&schema, &Record::new().with("CliName", "abc")).unwrap();
        assert_eq!(&bytes[..], b"abc\0");
        assert_eq!(
            decode_record(&schema, &bytes).unwrap().record.get_str("CliName"),
            Some("abc")
        );

        let err = encode_record(&schema, &Record::new().with("CliName", "abcd")).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::StringTooLong { len: 4, max: 3 });

        let err = encode_record(&schema, &Record::new().with("CliName", "a\0b")).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::InvalidText);
    }

    #[test]
    fn test_trailing_bytes_and_prefix() {
        let schema = RecordSchema::builder("Id").u32("Id").build().unwrap();
        let bytes = [1, 0, 0, 0, b'x'];

        let err = decode_record(&schema, &bytes).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::TrailingBytes { extra: 1 });

        let (decoded, consumed) = decode_prefix(&schema, &bytes).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(decoded.record.get_u64("Id"), Some(1));
    }

    #[test]
    fn test_sentinel_scalar() {
        let schema = RecordSchema::builder("Ue")
            .scalar("Rnti", ScalarSpec::u16().absent_all_ones())
            .build()
            .unwrap();

        let bytes = encode_record(&schema, &Record::new()).unwrap();
        assert_eq!(&bytes[..], &[0xFF, 0xFF]);
        assert!(decode_record(&schema, &bytes).unwrap().record.get("Rnti").unwrap().is_absent());

        let err = encode_record(&schema, &Record::new().with("Rnti", 0xFFFFu16)).unwrap_err();
        assert_eq!(err.kind(), &CodecErrorKind::ReservedValue { raw: 0xFFFF });
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..16)) {
                let _ = decode_record(&pdcch(), &data);
                let _ = decode_record(&qcl(UnionLayout::Overlay), &data);
            }

            #[test]
            fn mask_matches_present_optionals(pucch in any::<bool>(), pusch in any::<bool>(), rnti in any::<u8>()) {
                let tpc_value = Record::new().with("Rnti", rnti).with("Index", 0u8);
                let mut record = Record::new();
                if pucch {
                    record.insert("TpcPucch", tpc_value.clone());
                }
                if pusch {
                    record.insert("TpcPusch", tpc_value);
                }

                let bytes = encode_record(&pdcch(), &record).unwrap();
                let bits = u8::from(pucch) | (u8::from(pusch) << 1);
                prop_assert_eq!(bytes[0], bits);
                prop_assert_eq!(bytes.len(), 2 + 2 * bits.count_ones() as usize);

                let decoded = decode_record(&pdcch(), &bytes).unwrap();
                prop_assert_eq!(decoded.record.get("TpcPucch").unwrap().is_absent(), !pucch);
                prop_assert_eq!(decoded.record.get("TpcPusch").unwrap().is_absent(), !pusch);
            }

            #[test]
            fn union_selector_is_never_reinterpreted(selector in any::<u8>(), payload in any::<u16>()) {
                let [lo, hi] = payload.to_le_bytes();
                let decoded = decode_record(&qcl(UnionLayout::Overlay), &[selector, lo, hi, 0]).unwrap();
                let known = matches!(selector, 1 | 2);
                match decoded.record.get("RefSig") {
                    Some(Value::Union(UnionValue::Variant { tag, .. })) => {
                        prop_assert!(known);
                        prop_assert_eq!(*tag, u64::from(selector));
                    }
                    Some(Value::Union(UnionValue::Absent)) => prop_assert_eq!(selector, 0xFF),
                    Some(Value::Union(UnionValue::Unknown { selector: raw, .. })) => {
                        prop_assert!(!known);
                        prop_assert_eq!(*raw, u64::from(selector));
                    }
                    other => prop_assert!(false, "unexpected value {:?}", other),
                }
            }

            #[test]
            fn octet_list_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..64)) {
                let schema = RecordSchema::builder("L1")
                    .list("Data", ListSpec::counted(ScalarKind::U32, 64, ElementSpec::Octet))
                    .build()
                    .unwrap();
                let record = Record::new().with("Data", data.clone());
                let bytes = encode_record(&schema, &record).unwrap();
                prop_assert_eq!(bytes.len(), 4 + data.len());
                let decoded = decode_record(&schema, &bytes).unwrap();
                prop_assert_eq!(decoded.record.get("Data").unwrap().as_bytes().unwrap().as_ref(), &data[..]);
            }
        }
    }
}
