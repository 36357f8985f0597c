//! Record schemas and their builder
//!
//! A [`RecordSchema`] is validated once, when built, so the codec can assume
//! that masks precede their sub-records, count fields precede their lists and
//! union regions are large enough for every arm.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use super::{
    CountSource, ElementSpec, FieldKind, FieldSpec, ListLayout, ListSpec, MaskWidth,
    OptionalSpec, Result, ScalarSpec, SchemaError, UnionLayout, UnionSpec,
};

/// Ordered, validated description of one record
#[derive(Debug)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
    fixed_size: Option<usize>,
    fingerprint: u64,
}

impl RecordSchema {
    /// Start building a record named `name`
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Record name (first segment of every field path inside it)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in wire order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Encoded size, if no field depends on the value
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        self.fixed_size
    }

    /// Byte offset of field `name`, if every field before it has a fixed size
    #[must_use]
    pub fn fixed_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += field.kind.fixed_size()?;
        }
        None
    }

    /// Stable 64-bit hash of the schema's shape
    ///
    /// Two schemas with equal fingerprints encode identically.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Optional fields governed by the mask named `mask`, in bit order
    pub(crate) fn governed_by<'a>(
        &'a self,
        mask: &'a str,
    ) -> impl Iterator<Item = (&'a FieldSpec, &'a OptionalSpec)> + 'a {
        self.fields.iter().filter_map(move |f| match &f.kind {
            FieldKind::Optional(opt) if opt.mask == mask => Some((f, opt)),
            _ => None,
        })
    }

    /// Lists whose count is held by the field named `count`
    pub(crate) fn counted_by<'a>(
        &'a self,
        count: &'a str,
    ) -> impl Iterator<Item = (&'a FieldSpec, &'a ListSpec)> + 'a {
        self.fields.iter().filter_map(move |f| match &f.kind {
            FieldKind::List(list) if matches!(&list.count, CountSource::Field(c) if c == count) => {
                Some((f, list))
            }
            _ => None,
        })
    }

    fn describe(&self, out: &mut Vec<u8>) {
        put_str(out, &self.name);
        put_u64(out, self.fields.len() as u64);
        for field in &self.fields {
            put_str(out, &field.name);
            match &field.kind {
                FieldKind::Scalar(spec) => {
                    out.push(1);
                    out.push(spec.kind().tag());
                    match spec.absent() {
                        Some(raw) => {
                            out.push(1);
                            put_u64(out, raw);
                        }
                        None => out.push(0),
                    }
                }
                FieldKind::Bytes(len) => {
                    out.push(2);
                    put_u64(out, *len as u64);
                }
                FieldKind::AsciiZ(len) => {
                    out.push(3);
                    put_u64(out, *len as u64);
                }
                FieldKind::Mask(width) => {
                    out.push(4);
                    out.push(width.bits());
                }
                FieldKind::Optional(opt) => {
                    out.push(5);
                    put_str(out, &opt.mask);
                    out.push(opt.bit);
                    put_u64(out, opt.record.fingerprint);
                }
                FieldKind::Union(spec) => {
                    out.push(6);
                    out.push(spec.selector.tag());
                    put_u64(out, spec.absent);
                    match spec.layout {
                        UnionLayout::Overlay => out.push(0),
                        UnionLayout::Reserved(size) => {
                            out.push(1);
                            put_u64(out, size as u64);
                        }
                        UnionLayout::Packed => out.push(2),
                    }
                    put_u64(out, spec.variants.len() as u64);
                    for variant in &spec.variants {
                        put_u64(out, variant.tag);
                        put_str(out, &variant.name);
                        put_u64(out, variant.record.fingerprint);
                    }
                }
                FieldKind::List(list) => {
                    out.push(7);
                    match &list.count {
                        CountSource::Inline(kind) => {
                            out.push(0);
                            out.push(kind.tag());
                        }
                        CountSource::Field(name) => {
                            out.push(1);
                            put_str(out, name);
                        }
                    }
                    put_u64(out, list.max as u64);
                    match &list.element {
                        ElementSpec::Octet => out.push(0),
                        ElementSpec::Scalar(kind) => {
                            out.push(1);
                            out.push(kind.tag());
                        }
                        ElementSpec::Record(record) => {
                            out.push(2);
                            put_u64(out, record.fingerprint);
                        }
                    }
                    out.push(match list.layout {
                        ListLayout::Exact => 0,
                        ListLayout::FixedCapacity => 1,
                    });
                }
                FieldKind::Record(record) => {
                    out.push(8);
                    put_u64(out, record.fingerprint);
                }
            }
        }
    }
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    put_u64(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

/// Builder for [`RecordSchema`]
#[derive(Debug)]
#[must_use]
pub struct RecordBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordBuilder {
    fn push(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    /// Scalar field
    pub fn scalar(self, name: impl Into<String>, spec: ScalarSpec) -> Self {
        self.push(name, FieldKind::Scalar(spec))
    }

    /// Unsigned 8-bit field without sentinel
    pub fn u8(self, name: impl Into<String>) -> Self {
        self.scalar(name, ScalarSpec::u8())
    }

    /// Unsigned 16-bit field without sentinel
    pub fn u16(self, name: impl Into<String>) -> Self {
        self.scalar(name, ScalarSpec::u16())
    }

    /// Unsigned 32-bit field without sentinel
    pub fn u32(self, name: impl Into<String>) -> Self {
        self.scalar(name, ScalarSpec::u32())
    }

    /// Signed 16-bit field without sentinel
    pub fn i16(self, name: impl Into<String>) -> Self {
        self.scalar(name, ScalarSpec::i16())
    }

    /// Fixed-length opaque bytes (spare or reserved areas included)
    pub fn bytes(self, name: impl Into<String>, len: usize) -> Self {
        self.push(name, FieldKind::Bytes(len))
    }

    /// Fixed-length NUL-padded string
    pub fn asciiz(self, name: impl Into<String>, len: usize) -> Self {
        self.push(name, FieldKind::AsciiZ(len))
    }

    /// Presence mask
    pub fn mask(self, name: impl Into<String>, width: MaskWidth) -> Self {
        self.push(name, FieldKind::Mask(width))
    }

    /// Sub-record present iff `bit` of `mask` is set
    pub fn optional(
        self,
        name: impl Into<String>,
        mask: impl Into<String>,
        bit: u8,
        record: Arc<RecordSchema>,
    ) -> Self {
        self.push(
            name,
            FieldKind::Optional(OptionalSpec {
                mask: mask.into(),
                bit,
                record,
            }),
        )
    }

    /// Discriminated union
    pub fn union(self, name: impl Into<String>, spec: UnionSpec) -> Self {
        self.push(name, FieldKind::Union(spec))
    }

    /// Counted list or fixed-capacity array
    pub fn list(self, name: impl Into<String>, spec: ListSpec) -> Self {
        self.push(name, FieldKind::List(spec))
    }

    /// Always-present nested record
    pub fn record(self, name: impl Into<String>, record: Arc<RecordSchema>) -> Self {
        self.push(name, FieldKind::Record(record))
    }

    /// Validate and freeze the schema
    pub fn build(self) -> Result<Arc<RecordSchema>> {
        let record = self.name;
        let err_field = |field: &FieldSpec| (record.clone(), field.name.clone());

        let mut seen: HashMap<&str, &FieldKind> = HashMap::new();
        let mut used_bits: HashMap<&str, Option<u8>> = HashMap::new();

        for field in &self.fields {
            match &field.kind {
                FieldKind::Optional(opt) => {
                    let Some(FieldKind::Mask(width)) = seen.get(opt.mask.as_str()) else {
                        let (record, field) = err_field(field);
                        return Err(SchemaError::UnknownMask {
                            record,
                            field,
                            mask: opt.mask.clone(),
                        });
                    };
                    if opt.bit >= width.bits() {
                        let (record, field) = err_field(field);
                        return Err(SchemaError::BitOutOfRange {
                            record,
                            field,
                            bit: opt.bit,
                            width: width.bits(),
                        });
                    }
                    let last = used_bits.entry(opt.mask.as_str()).or_insert(None);
                    match *last {
                        Some(prev) if prev == opt.bit => {
                            return Err(SchemaError::DuplicateBit {
                                record: record.clone(),
                                mask: opt.mask.clone(),
                                bit: opt.bit,
                            });
                        }
                        Some(prev) if prev > opt.bit => {
                            let (record, field) = err_field(field);
                            return Err(SchemaError::BitOrder { record, field });
                        }
                        _ => *last = Some(opt.bit),
                    }
                }
                FieldKind::Union(spec) => validate_union(&record, field, spec)?,
                FieldKind::List(list) => validate_list(&record, field, list, &seen)?,
                _ => {}
            }

            if seen.insert(field.name.as_str(), &field.kind).is_some() {
                let (record, field) = err_field(field);
                return Err(SchemaError::DuplicateField { record, field });
            }
        }

        let fixed_size = self
            .fields
            .iter()
            .map(|f| f.kind.fixed_size())
            .try_fold(0usize, |acc, size| size.map(|s| acc + s));

        let mut schema = RecordSchema {
            name: record,
            fields: self.fields,
            fixed_size,
            fingerprint: 0,
        };
        let mut descriptor = Vec::with_capacity(64);
        schema.describe(&mut descriptor);
        schema.fingerprint = xxh3_64(&descriptor);

        trace!(
            record = schema.name.as_str(),
            fields = schema.fields.len(),
            fixed_size = ?schema.fixed_size,
            fingerprint = schema.fingerprint,
            "record schema built"
        );
        Ok(Arc::new(schema))
    }
}

fn validate_union(record: &str, field: &FieldSpec, spec: &UnionSpec) -> Result<()> {
    let err = || (record.to_owned(), field.name.clone());

    for (i, variant) in spec.variants.iter().enumerate() {
        if variant.tag > spec.selector.max_unsigned() {
            let (record, field) = err();
            return Err(SchemaError::TagOverflow {
                record,
                field,
                tag: variant.tag,
                kind: spec.selector,
            });
        }
        if variant.tag == spec.absent {
            let (record, field) = err();
            return Err(SchemaError::TagIsSentinel {
                record,
                field,
                tag: variant.tag,
            });
        }
        if spec.variants[..i].iter().any(|v| v.tag == variant.tag) {
            let (record, field) = err();
            return Err(SchemaError::DuplicateTag {
                record,
                field,
                tag: variant.tag,
            });
        }
        if spec.layout == UnionLayout::Packed {
            continue;
        }
        let Some(size) = variant.record.fixed_size() else {
            let (record, field) = err();
            return Err(SchemaError::VariableVariant {
                record,
                field,
                variant: variant.name.clone(),
            });
        };
        if let UnionLayout::Reserved(reserved) = spec.layout {
            if size > reserved {
                let (record, field) = err();
                return Err(SchemaError::VariantTooLarge {
                    record,
                    field,
                    variant: variant.name.clone(),
                    size,
                    reserved,
                });
            }
        }
    }
    Ok(())
}

fn validate_list(
    record: &str,
    field: &FieldSpec,
    list: &ListSpec,
    seen: &HashMap<&str, &FieldKind>,
) -> Result<()> {
    let err = || (record.to_owned(), field.name.clone());

    match &list.count {
        CountSource::Inline(kind) => {
            if list.max as u64 > kind.max_unsigned() {
                let (record, field) = err();
                return Err(SchemaError::CapacityOverflow {
                    record,
                    field,
                    max: list.max,
                    kind: *kind,
                });
            }
        }
        CountSource::Field(name) => {
            let count_kind = match seen.get(name.as_str()) {
                Some(FieldKind::Scalar(spec))
                    if !spec.kind().is_signed() && spec.absent().is_none() =>
                {
                    spec.kind()
                }
                _ => {
                    let (record, field) = err();
                    return Err(SchemaError::InvalidCountField {
                        record,
                        field,
                        count: name.clone(),
                    });
                }
            };
            if list.max as u64 > count_kind.max_unsigned() {
                let (record, field) = err();
                return Err(SchemaError::CapacityOverflow {
                    record,
                    field,
                    max: list.max,
                    kind: count_kind,
                });
            }
        }
    }

    if list.layout == ListLayout::FixedCapacity && list.element.fixed_size().is_none() {
        let (record, field) = err();
        return Err(SchemaError::VariableElement { record, field });
    }
    Ok(())
}
