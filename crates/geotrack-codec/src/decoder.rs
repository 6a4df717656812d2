//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use indexmap::IndexMap;
use tracing::debug;

use crate::checksum::validate_checksum;
use crate::errors::{CodecError, FieldError, Result};
use crate::field::decode_field;
use crate::result::ParseResult;
use crate::schema::{FieldDefinition, FieldGroup, FormatSchema};
use crate::value::FieldValue;

/// Parse `schema_json` and decode `payload` against it.
///
/// Only a malformed schema or undecodable payload text is returned as an error;
/// field and checksum problems come back as a failed [`ParseResult`].
pub fn decode_message(schema_json: &str, payload: &str) -> Result<ParseResult> {
    let schema = FormatSchema::from_json(schema_json)?;
    decode_with_schema(&schema, payload)
}

/// Decode `payload` against an already parsed schema.
pub fn decode_with_schema(schema: &FormatSchema, payload: &str) -> Result<ParseResult> {
    let result = ParseResult::new(payload);

    let Some(encoding) = schema.payload_encoding() else {
        return Ok(result.fail(format!("unsupported encoding: {}", schema.encoding)));
    };
    let bytes = match encoding.decode(payload) {
        Ok(bytes) => bytes,
        Err(source) => {
            let failed = result.fail(format!("failed to decode data: {source}"));
            return Err(CodecError::MalformedPayload {
                source,
                result: Box::new(failed),
            });
        }
    };

    let mut result = result;
    let outcome = walk(schema, &bytes, &mut result.fields);
    let result = match outcome {
        Ok(()) => result,
        Err(message) => result.fail(message),
    };
    debug!(
        payload_bytes = bytes.len(),
        fields = result.fields.len(),
        success = result.success,
        error = result.error.as_deref().unwrap_or(""),
        "message decoded"
    );
    Ok(result)
}

fn walk(
    schema: &FormatSchema,
    bytes: &[u8],
    fields: &mut IndexMap<String, FieldValue>,
) -> std::result::Result<(), String> {
    let mut view = bytes;

    decode_group(FieldGroup::Header, &schema.header, view, fields)?;

    if let Some(length_field) = &schema.length {
        let (value, next) = decode_one(FieldGroup::Length, length_field, view)?;
        if let Some(declared) = value.as_i64() {
            view = bound_view(view, next, declared)?;
        }
        fields.insert(length_field.name.clone(), value);
    }

    decode_group(FieldGroup::Body, &schema.body, view, fields)?;
    decode_group(FieldGroup::Footer, &schema.footer, view, fields)?;

    if let Some(checksum_field) = &schema.checksum {
        let (value, _) = decode_one(FieldGroup::Checksum, checksum_field, view)?;
        let valid = validate_checksum(view, checksum_field.offset, checksum_field, &value);
        fields.insert(checksum_field.name.clone(), value);
        if !valid {
            return Err("checksum validation failed".to_owned());
        }
    }
    Ok(())
}

fn decode_group(
    group: FieldGroup,
    definitions: &[FieldDefinition],
    view: &[u8],
    fields: &mut IndexMap<String, FieldValue>,
) -> std::result::Result<(), String> {
    for field in definitions {
        let (value, _) = decode_one(group, field, view)?;
        fields.insert(field.name.clone(), value);
    }
    Ok(())
}

fn decode_one(
    group: FieldGroup,
    field: &FieldDefinition,
    view: &[u8],
) -> std::result::Result<(FieldValue, usize), String> {
    decode_field(view, field.offset, field).map_err(|err| describe(group, field, &err))
}

fn describe(group: FieldGroup, field: &FieldDefinition, err: &FieldError) -> String {
    format!("failed to parse {group} field '{}': {err}", field.name)
}

/// Bound the working view to `start + declared` bytes without touching the input.
fn bound_view(view: &[u8], start: usize, declared: i64) -> std::result::Result<&[u8], String> {
    let declared = usize::try_from(declared)
        .map_err(|_| format!("invalid length value: {declared}"))?;
    match start.checked_add(declared) {
        Some(end) if end <= view.len() => Ok(&view[..end]),
        _ => Err(format!(
            "insufficient data for specified length (need {} bytes, have {})",
            declared,
            view.len().saturating_sub(start)
        )),
    }
}
