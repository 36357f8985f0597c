//! In-memory value tree
//!
//! Values own their data: optional sub-records are owned by their parent,
//! lists are vectors, and decoded byte strings are copied out of the input
//! buffer so nothing borrows it after decode returns.

use bytes::Bytes;

use crate::schema::ScalarSpec;

use super::CodecErrorKind;

/// Decoded presence-mask bits, including bits the schema does not know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresenceMask(u32);

impl PresenceMask {
    /// Empty mask
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask from raw bits
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether `bit` is set
    #[must_use]
    pub const fn contains(self, bit: u8) -> bool {
        bit < 32 && self.0 & (1 << bit) != 0
    }

    /// Set `bit`
    #[must_use]
    pub const fn with(self, bit: u8) -> Self {
        debug_assert!(bit < 32, "mask bit out of range");
        Self(self.0 | (1 << bit))
    }

    /// Number of set bits
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Union contents
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnionValue {
    /// A declared arm and its payload
    Variant {
        /// Selector value
        tag: u64,
        /// Arm payload
        record: Record,
    },
    /// The "none" selector
    Absent,
    /// Selector unknown to this schema; region kept verbatim
    Unknown {
        /// Raw selector
        selector: u64,
        /// Raw region bytes
        raw: Bytes,
    },
}

/// One field value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Unsigned integer
    Unsigned(u64),
    /// Signed integer
    Signed(i64),
    /// Absent scalar (sentinel on the wire), absent optional sub-record
    Absent,
    /// Fixed byte array or octet list
    Bytes(Bytes),
    /// ASCIIZ string
    Text(String),
    /// Presence mask
    Mask(PresenceMask),
    /// List of scalars or records
    List(Vec<Value>),
    /// Nested or optional record
    Record(Record),
    /// Discriminated union
    Union(UnionValue),
}

impl Value {
    /// Value as an unsigned integer
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Unsigned(v) => Some(v),
            Self::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Value as a signed integer
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Signed(v) => Some(v),
            Self::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Value as text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Value as a byte string
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Value as a record
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Value as a list
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value is [`Value::Absent`]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Raw bit pattern for a scalar field
    pub(crate) fn to_raw(&self, spec: &ScalarSpec) -> Result<u64, CodecErrorKind> {
        let kind = spec.kind();
        let mask = kind.bit_mask();

        let raw = match *self {
            Self::Absent => return spec.absent().ok_or(CodecErrorKind::AbsentNotAllowed),
            Self::Unsigned(v) => {
                if v > kind.max_unsigned() {
                    return Err(CodecErrorKind::OutOfRange {
                        value: i128::from(v),
                        kind,
                    });
                }
                v
            }
            Self::Signed(v) => {
                let fits = if kind.is_signed() {
                    let max = i128::from(kind.max_unsigned());
                    (-max - 1..=max).contains(&i128::from(v))
                } else {
                    v >= 0 && v.unsigned_abs() <= mask
                };
                if !fits {
                    return Err(CodecErrorKind::OutOfRange {
                        value: i128::from(v),
                        kind,
                    });
                }
                #[allow(clippy::cast_sign_loss)]
                let bits = v as u64;
                bits & mask
            }
            _ => {
                return Err(CodecErrorKind::TypeMismatch {
                    expected: "integer",
                });
            }
        };

        if spec.absent() == Some(raw) {
            return Err(CodecErrorKind::ReservedValue { raw });
        }
        Ok(raw)
    }

    /// Value for a scalar field's raw bit pattern
    pub(crate) fn from_raw(spec: &ScalarSpec, raw: u64) -> Self {
        if spec.absent() == Some(raw) {
            return Self::Absent;
        }
        let kind = spec.kind();
        if kind.is_signed() {
            Self::Signed(kind.sign_extend(raw))
        } else {
            Self::Unsigned(raw)
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty: $($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Self::$variant(<$wide>::from(value))
            }
        })*
    };
}

impl_from_int!(Unsigned, u64: u8, u16, u32, u64);
impl_from_int!(Signed, i64: i8, i16, i32, i64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<PresenceMask> for Value {
    fn from(value: PresenceMask) -> Self {
        Self::Mask(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<UnionValue> for Value {
    fn from(value: UnionValue) -> Self {
        Self::Union(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Ordered field values of one record
///
/// Decoding produces fields in schema order. Records built by hand may omit
/// masks, count fields and absent optionals; the encoder derives them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Field value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Unsigned field by name
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    /// Signed field by name
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Text field by name
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Nested record by name
    #[must_use]
    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(Value::as_record)
    }

    /// Iterate over `(name, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push(&mut self, name: &str, value: Value) {
        self.fields.push((name.to_owned(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    #[test]
    fn test_record_insert_replaces() {
        let mut record = Record::new().with("UeId", 5u32).with("CellId", 1u32);
        record.insert("UeId", 6u32);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get_u64("UeId"), Some(6));
        assert_eq!(record.iter().next().map(|(n, _)| n), Some("UeId"));
    }

    #[test]
    fn test_to_raw_ranges() {
        let u8_spec = ScalarSpec::u8();
        assert_eq!(Value::from(255u8).to_raw(&u8_spec), Ok(0xFF));
        assert!(matches!(
            Value::from(256u16).to_raw(&u8_spec),
            Err(CodecErrorKind::OutOfRange { value: 256, .. })
        ));
        assert!(matches!(
            Value::from(-1i8).to_raw(&u8_spec),
            Err(CodecErrorKind::OutOfRange { value: -1, .. })
        ));

        let i16_spec = ScalarSpec::i16();
        assert_eq!(Value::from(-8i16).to_raw(&i16_spec), Ok(0xFFF8));
        assert_eq!(Value::from(7u8).to_raw(&i16_spec), Ok(7));
        assert!(Value::from(40_000u32).to_raw(&i16_spec).is_err());
    }

    #[test]
    fn test_sentinels() {
        let spec = ScalarSpec::u8().absent_all_ones();
        assert_eq!(Value::Absent.to_raw(&spec), Ok(0xFF));
        assert_eq!(
            Value::from(0xFFu8).to_raw(&spec),
            Err(CodecErrorKind::ReservedValue { raw: 0xFF })
        );
        assert_eq!(Value::from_raw(&spec, 0xFF), Value::Absent);
        assert_eq!(
            Value::Absent.to_raw(&ScalarSpec::u8()),
            Err(CodecErrorKind::AbsentNotAllowed)
        );

        let signed = ScalarSpec::new(ScalarKind::I8).absent_all_ones();
        assert_eq!(Value::from_raw(&signed, 0xFF), Value::Absent);
        assert_eq!(Value::from_raw(&signed, 0xFE), Value::Signed(-2));
    }

    #[test]
    fn test_presence_mask() {
        let mask = PresenceMask::empty().with(0).with(3);
        assert!(mask.contains(3));
        assert!(!mask.contains(1));
        assert!(!mask.contains(40));
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.bits(), 0b1001);
    }
}
