//! Fixed-width integer descriptors

use std::fmt;

/// Width and signedness of a wire integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarKind {
    /// Unsigned 8-bit
    U8,
    /// Unsigned 16-bit
    U16,
    /// Unsigned 32-bit
    U32,
    /// Unsigned 64-bit
    U64,
    /// Signed 8-bit
    I8,
    /// Signed 16-bit
    I16,
    /// Signed 32-bit
    I32,
    /// Signed 64-bit
    I64,
}

impl ScalarKind {
    /// Encoded width in bytes
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
            Self::U64 | Self::I64 => 8,
        }
    }

    /// Whether the integer is two's-complement signed
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// All-ones pattern covering the encoded width
    #[must_use]
    pub const fn bit_mask(self) -> u64 {
        match self.width() {
            8 => u64::MAX,
            w => (1u64 << (w * 8)) - 1,
        }
    }

    /// Largest value usable as a count or selector
    #[must_use]
    pub const fn max_unsigned(self) -> u64 {
        if self.is_signed() {
            self.bit_mask() >> 1
        } else {
            self.bit_mask()
        }
    }

    /// Sign-extend a raw bit pattern of this width
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub const fn sign_extend(self, raw: u64) -> i64 {
        let shift = 64 - self.width() as u32 * 8;
        ((raw << shift) as i64) >> shift
    }

    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 3,
            Self::U64 => 4,
            Self::I8 => 5,
            Self::I16 => 6,
            Self::I32 => 7,
            Self::I64 => 8,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
        };
        write!(f, "{name}")
    }
}

/// A scalar field: its kind plus an optional "absent" sentinel
///
/// Sentinels are stored as raw bit patterns because the catalog is not
/// consistent about them: one 8-bit field uses `0xFF`, another `-1`, a third
/// has none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarSpec {
    kind: ScalarKind,
    absent: Option<u64>,
}

impl ScalarSpec {
    /// Scalar without a sentinel
    #[must_use]
    pub const fn new(kind: ScalarKind) -> Self {
        Self { kind, absent: None }
    }

    /// Unsigned 8-bit scalar
    #[must_use]
    pub const fn u8() -> Self {
        Self::new(ScalarKind::U8)
    }

    /// Unsigned 16-bit scalar
    #[must_use]
    pub const fn u16() -> Self {
        Self::new(ScalarKind::U16)
    }

    /// Unsigned 32-bit scalar
    #[must_use]
    pub const fn u32() -> Self {
        Self::new(ScalarKind::U32)
    }

    /// Signed 16-bit scalar
    #[must_use]
    pub const fn i16() -> Self {
        Self::new(ScalarKind::I16)
    }

    /// Signed 32-bit scalar
    #[must_use]
    pub const fn i32() -> Self {
        Self::new(ScalarKind::I32)
    }

    /// Mark the raw bit pattern `raw` as "absent"
    ///
    /// Bits above the field width are discarded.
    #[must_use]
    pub const fn absent_as(self, raw: u64) -> Self {
        Self {
            kind: self.kind,
            absent: Some(raw & self.kind.bit_mask()),
        }
    }

    /// Mark the all-ones pattern (`0xFF..`, or `-1` when signed) as "absent"
    #[must_use]
    pub const fn absent_all_ones(self) -> Self {
        self.absent_as(u64::MAX)
    }

    /// Scalar kind
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Raw sentinel pattern, if the field has one
    #[must_use]
    pub const fn absent(&self) -> Option<u64> {
        self.absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_and_masks() {
        assert_eq!(ScalarKind::U8.bit_mask(), 0xFF);
        assert_eq!(ScalarKind::I16.bit_mask(), 0xFFFF);
        assert_eq!(ScalarKind::U64.bit_mask(), u64::MAX);
        assert_eq!(ScalarKind::I8.max_unsigned(), 127);
        assert_eq!(ScalarKind::U16.max_unsigned(), 65_535);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(ScalarKind::I8.sign_extend(0xFF), -1);
        assert_eq!(ScalarKind::I16.sign_extend(0xFFF8), -8);
        assert_eq!(ScalarKind::I32.sign_extend(7), 7);
        assert_eq!(ScalarKind::I64.sign_extend(u64::MAX), -1);
    }

    #[test]
    fn test_sentinel_is_truncated_to_width() {
        assert_eq!(ScalarSpec::u8().absent_all_ones().absent(), Some(0xFF));
        assert_eq!(ScalarSpec::i16().absent_all_ones().absent(), Some(0xFFFF));
        assert_eq!(
            ScalarSpec::u32().absent_as(0x1_0000_0001).absent(),
            Some(1)
        );
    }
}
