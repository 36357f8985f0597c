//! Presence-mask codec
//!
//! Encoding and decoding are total. Bits that govern no field in the current
//! schema are kept as-is so a mask written by a newer peer survives a
//! decode/encode cycle unchanged.

use tracing::warn;

use crate::schema::{MaskWidth, RecordSchema};

use super::{CodecErrorKind, DiagnosticKind, PresenceMask, Record, Value};
use super::record::{Decoder, Encoder};

/// Raw wire value of a mask, truncated to its width
#[must_use]
pub fn encode_mask(mask: PresenceMask, width: MaskWidth) -> u64 {
    u64::from(mask.bits()) & width.scalar().bit_mask()
}

/// Mask bits from a raw wire value
#[must_use]
pub fn decode_mask(raw: u64, width: MaskWidth) -> PresenceMask {
    #[allow(clippy::cast_possible_truncation)]
    let bits = (raw & width.scalar().bit_mask()) as u32;
    PresenceMask::from_bits(bits)
}

/// Bits of `mask` that gate an optional field of `schema`
#[must_use]
pub fn governed_bits(schema: &RecordSchema, mask: &str) -> u32 {
    schema
        .governed_by(mask)
        .fold(0, |acc, (_, opt)| acc | (1 << opt.bit()))
}

impl Encoder {
    pub(super) fn mask(
        &mut self,
        schema: &RecordSchema,
        name: &str,
        width: MaskWidth,
        record: &Record,
    ) -> super::Result<()> {
        let mut derived = PresenceMask::empty();
        for (field, opt) in schema.governed_by(name) {
            if matches!(record.get(field.name()), Some(Value::Record(_))) {
                derived = derived.with(opt.bit());
            }
        }

        let governed = governed_bits(schema, name);
        let bits = match record.get(name) {
            None | Some(Value::Absent) => derived.bits(),
            Some(Value::Mask(supplied)) => {
                let found = supplied.bits() & governed;
                if found != derived.bits() {
                    return Err(self.error(CodecErrorKind::MaskMismatch {
                        expected: derived.bits(),
                        found,
                    }));
                }
                supplied.bits()
            }
            Some(_) => {
                return Err(self.error(CodecErrorKind::TypeMismatch { expected: "mask" }));
            }
        };

        self.writer.put_scalar(
            width.scalar(),
            encode_mask(PresenceMask::from_bits(bits), width),
        );
        Ok(())
    }
}

impl Decoder<'_> {
    pub(super) fn mask(
        &mut self,
        schema: &RecordSchema,
        name: &str,
        width: MaskWidth,
    ) -> super::Result<Value> {
        let offset = self.reader.offset();
        let raw = self
            .reader
            .read_scalar(width.scalar())
            .map_err(|kind| self.error(kind))?;
        let mask = decode_mask(raw, width);

        let reserved = mask.bits() & !governed_bits(schema, name);
        if reserved != 0 {
            warn!(path = %self.path, bits = reserved, "reserved mask bits set");
            self.diagnose(offset, DiagnosticKind::ReservedMaskBits { bits: reserved });
        }
        Ok(Value::Mask(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_truncates_to_width() {
        let mask = PresenceMask::from_bits(0x1_0F);
        assert_eq!(encode_mask(mask, MaskWidth::W8), 0x0F);
        assert_eq!(encode_mask(mask, MaskWidth::W16), 0x10F);
        assert_eq!(decode_mask(0xFFFF_FFFF, MaskWidth::W16).bits(), 0xFFFF);
    }

    #[test]
    fn test_decode_is_total() {
        for raw in [0u64, 1, 0x80, 0xFF] {
            assert_eq!(u64::from(decode_mask(raw, MaskWidth::W8).bits()), raw);
        }
    }
}
