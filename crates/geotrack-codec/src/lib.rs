//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Schema-driven decoder for binary device messages.
//!
//! A [`FormatSchema`] names typed fields at fixed byte offsets, grouped into header,
//! body and footer, with optional length and checksum fields. [`decode_message`]
//! turns an encoded payload string into a [`ParseResult`]. Every function here is
//! pure and safe to call from any number of threads.

pub mod checksum;
pub mod decoder;
pub mod errors;
pub mod field;
pub mod presets;
pub mod result;
pub mod schema;
pub mod value;

pub use checksum::validate_checksum;
pub use decoder::{decode_message, decode_with_schema};
pub use errors::{CodecError, FieldError, PayloadError, Result};
pub use field::decode_field;
pub use presets::{geo_location_schema, geo_sample_payloads, GeoSample};
pub use result::ParseResult;
pub use schema::{
    Endian, FieldDefinition, FieldGroup, FieldType, FieldTypeTag, FormatSchema, PayloadEncoding,
};
pub use value::FieldValue;
