//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use crate::schema::{FieldDefinition, FieldType};
use crate::value::FieldValue;

pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

pub fn sum16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

pub fn sum32(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, b| acc.wrapping_add(u32::from(*b)))
}

/// Check a decoded checksum against the modular byte sum of `buffer[..checksum_offset]`.
///
/// The sum width follows the checksum field type (uint8/uint16/uint32). Any other
/// type is not verified and always passes. A value whose width does not match the
/// field type never passes.
pub fn validate_checksum(
    buffer: &[u8],
    checksum_offset: usize,
    field: &FieldDefinition,
    value: &FieldValue,
) -> bool {
    let covered = &buffer[..checksum_offset.min(buffer.len())];
    match field.field_type.known() {
        Some(FieldType::Uint8) => matches!(value, FieldValue::U8(expected) if sum8(covered) == *expected),
        Some(FieldType::Uint16) => {
            matches!(value, FieldValue::U16(expected) if sum16(covered) == *expected)
        }
        Some(FieldType::Uint32) => {
            matches!(value, FieldValue::U32(expected) if sum32(covered) == *expected)
        }
        _ => true,
    }
}
