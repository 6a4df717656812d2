//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use bytes::Buf;

use crate::errors::FieldError;
use crate::schema::{Endian, FieldDefinition, FieldType, FieldTypeTag};
use crate::value::FieldValue;

/// Decode one field from `buffer` starting at `offset`.
///
/// Returns the value and the offset just past the field. The window is
/// `buffer[offset..offset + field.length]`; numeric types read their natural width
/// from the start of that window.
pub fn decode_field(
    buffer: &[u8],
    offset: usize,
    field: &FieldDefinition,
) -> Result<(FieldValue, usize), FieldError> {
    if offset >= buffer.len() {
        return Err(FieldError::InvalidOffset { offset });
    }
    let available = buffer.len() - offset;
    if field.length > available {
        return Err(FieldError::InsufficientData {
            field: field.name.clone(),
            required: field.length,
            available,
        });
    }
    let next = offset + field.length;
    let window = &buffer[offset..next];

    let field_type = match &field.field_type {
        FieldTypeTag::Known(field_type) => *field_type,
        FieldTypeTag::Unsupported(tag) => return Err(FieldError::UnsupportedType(tag.clone())),
    };
    if let Some(required) = field_type.width() {
        if window.len() < required {
            return Err(FieldError::LengthMismatch {
                field: field.name.clone(),
                field_type,
                declared: window.len(),
                required,
            });
        }
    }

    let value = match field_type {
        // The declared signedness, not the tag, decides how a single byte is read.
        FieldType::Int8 if field.signed => FieldValue::I8(window[0] as i8),
        FieldType::Int8 | FieldType::Uint8 => FieldValue::U8(window[0]),
        FieldType::Int16 => FieldValue::I16(read_u16(window, field.endian) as i16),
        FieldType::Uint16 => FieldValue::U16(read_u16(window, field.endian)),
        FieldType::Int32 => FieldValue::I32(read_u32(window, field.endian) as i32),
        FieldType::Uint32 => FieldValue::U32(read_u32(window, field.endian)),
        FieldType::Float32 => {
            let value = f32::from_bits(read_u32(window, field.endian));
            FieldValue::F32(truncate_f32(value, field.decimals))
        }
        FieldType::Float64 => {
            let value = f64::from_bits(read_u64(window, field.endian));
            FieldValue::F64(truncate_f64(value, field.decimals))
        }
        FieldType::String => FieldValue::Text(decode_text(window)),
        FieldType::Bytes => FieldValue::Bytes(window.to_vec()),
    };
    Ok((value, next))
}

fn read_u16(mut window: &[u8], endian: Endian) -> u16 {
    match endian {
        Endian::Big => window.get_u16(),
        Endian::Little => window.get_u16_le(),
    }
}

fn read_u32(mut window: &[u8], endian: Endian) -> u32 {
    match endian {
        Endian::Big => window.get_u32(),
        Endian::Little => window.get_u32_le(),
    }
}

fn read_u64(mut window: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Big => window.get_u64(),
        Endian::Little => window.get_u64_le(),
    }
}

/// Keep `decimals` digits after the point, dropping the rest (no rounding).
fn truncate_f32(value: f32, decimals: i32) -> f32 {
    if decimals <= 0 {
        return value;
    }
    let scale = 10f32.powi(decimals);
    (value * scale).trunc() / scale
}

fn truncate_f64(value: f64, decimals: i32) -> f64 {
    if decimals <= 0 {
        return value;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).trunc() / scale
}

/// Text up to the first NUL, with surrounding whitespace removed.
fn decode_text(window: &[u8]) -> String {
    let end = window.iter().position(|b| *b == 0).unwrap_or(window.len());
    String::from_utf8_lossy(&window[..end]).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: FieldType, length: usize) -> FieldDefinition {
        FieldDefinition::new("f", field_type, 0, length)
    }

    #[test]
    fn int8_follows_declared_signedness() {
        let buffer = [0xFE];
        let (unsigned, next) = decode_field(&buffer, 0, &field(FieldType::Int8, 1)).unwrap();
        assert_eq!(unsigned, FieldValue::U8(0xFE));
        assert_eq!(next, 1);

        let (signed, _) = decode_field(&buffer, 0, &field(FieldType::Int8, 1).signed()).unwrap();
        assert_eq!(signed, FieldValue::I8(-2));

        let (uint8, _) = decode_field(&buffer, 0, &field(FieldType::Uint8, 1).signed()).unwrap();
        assert_eq!(uint8, FieldValue::U8(0xFE));
    }

    #[test]
    fn multi_byte_integers_respect_endianness() {
        let buffer = [0x09, 0xC4, 0xFF, 0xFF, 0xFF, 0xFE];
        let be = field(FieldType::Uint16, 2).big_endian();
        let le = field(FieldType::Uint16, 2);
        assert_eq!(decode_field(&buffer, 0, &be).unwrap().0, FieldValue::U16(2500));
        assert_eq!(decode_field(&buffer, 0, &le).unwrap().0, FieldValue::U16(0xC409));

        let int32 = FieldDefinition::new("n", FieldType::Int32, 2, 4).big_endian();
        assert_eq!(decode_field(&buffer, 2, &int32).unwrap(), (FieldValue::I32(-2), 6));
        let uint32 = FieldDefinition::new("n", FieldType::Uint32, 2, 4).big_endian();
        assert_eq!(
            decode_field(&buffer, 2, &uint32).unwrap().0,
            FieldValue::U32(0xFFFF_FFFE)
        );
    }

    #[test]
    fn signed_reinterpretation_reads_the_same_bytes() {
        for raw in [0i16, 1, -1, i16::MIN, i16::MAX, 2500] {
            let bytes = raw.to_le_bytes();
            let (value, _) = decode_field(&bytes, 0, &field(FieldType::Int16, 2)).unwrap();
            assert_eq!(value, FieldValue::I16(raw));
            let (unsigned, _) = decode_field(&bytes, 0, &field(FieldType::Uint16, 2)).unwrap();
            assert_eq!(unsigned, FieldValue::U16(raw as u16));
        }
    }

    #[test]
    fn floats_truncate_instead_of_rounding() {
        let bytes = 3.14159f64.to_be_bytes();
        let def = field(FieldType::Float64, 8).big_endian().with_decimals(2);
        assert_eq!(decode_field(&bytes, 0, &def).unwrap().0, FieldValue::F64(3.14));

        let bytes = (-2.789f32).to_le_bytes();
        let def = field(FieldType::Float32, 4).with_decimals(1);
        let FieldValue::F32(value) = decode_field(&bytes, 0, &def).unwrap().0 else {
            panic!("expected f32");
        };
        assert!((value - -2.7).abs() < 1e-6);

        let bytes = 39.90923f32.to_be_bytes();
        let def = field(FieldType::Float32, 4).big_endian();
        assert_eq!(
            decode_field(&bytes, 0, &def).unwrap().0,
            FieldValue::F32(39.90923)
        );
    }

    #[test]
    fn strings_stop_at_nul_and_trim() {
        let buffer = b"  dev01 \0junk";
        let (value, next) = decode_field(buffer, 0, &field(FieldType::String, 13)).unwrap();
        assert_eq!(value, FieldValue::Text("dev01".into()));
        assert_eq!(next, 13);
    }

    #[test]
    fn bytes_are_copied_verbatim() {
        let buffer = [0x00, 0x01, 0x02, 0x03];
        let def = FieldDefinition::new("raw", FieldType::Bytes, 1, 2);
        assert_eq!(
            decode_field(&buffer, 1, &def).unwrap(),
            (FieldValue::Bytes(vec![0x01, 0x02]), 3)
        );
    }

    #[test]
    fn bounds_are_checked() {
        let buffer = [0x01];
        assert_eq!(
            decode_field(&buffer, 0, &field(FieldType::Uint16, 2)),
            Err(FieldError::InsufficientData {
                field: "f".into(),
                required: 2,
                available: 1
            })
        );
        assert_eq!(
            decode_field(&buffer, 1, &field(FieldType::Uint8, 1)),
            Err(FieldError::InvalidOffset { offset: 1 })
        );
        assert!(matches!(
            decode_field(&[1, 2], 0, &field(FieldType::Uint32, 2)),
            Err(FieldError::LengthMismatch { required: 4, .. })
        ));
    }

    #[test]
    fn unsupported_tags_fail_with_their_name() {
        let mut def = field(FieldType::Uint8, 1);
        def.field_type = FieldTypeTag::Unsupported("bcd".into());
        assert_eq!(
            decode_field(&[0x01], 0, &def),
            Err(FieldError::UnsupportedType("bcd".into()))
        );
    }

    #[test]
    fn decoding_is_deterministic() {
        let buffer = [0x12, 0x34, 0x56, 0x78];
        let def = field(FieldType::Float32, 4).big_endian().with_decimals(3);
        assert_eq!(
            decode_field(&buffer, 0, &def).unwrap(),
            decode_field(&buffer, 0, &def).unwrap()
        );
    }
}
