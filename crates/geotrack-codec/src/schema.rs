//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Declarative message layout as persisted by the configuration store.
//!
//! ```text
//! { "header":[FieldDef...], "body":[FieldDef...], "footer":[FieldDef...],
//!   "checksum": FieldDef|null, "length": FieldDef|null,
//!   "delimiter": string, "encoding": "hex"|"base64"|"ascii"|"" }
//! ```

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::errors::{CodecError, PayloadError, Result};

/// Semantic type of a field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    String,
    Bytes,
}

impl FieldType {
    /// Bytes consumed by numeric types; `None` for text and opaque bytes.
    pub fn width(&self) -> Option<usize> {
        match self {
            FieldType::Int8 | FieldType::Uint8 => Some(1),
            FieldType::Int16 | FieldType::Uint16 => Some(2),
            FieldType::Int32 | FieldType::Uint32 | FieldType::Float32 => Some(4),
            FieldType::Float64 => Some(8),
            FieldType::String | FieldType::Bytes => None,
        }
    }
}

/// Type tag as written in the schema. Unknown tags are kept verbatim so the decoder
/// can report them against the field that declared them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldTypeTag {
    Known(FieldType),
    Unsupported(String),
}

impl FieldTypeTag {
    pub fn known(&self) -> Option<FieldType> {
        match self {
            FieldTypeTag::Known(field_type) => Some(*field_type),
            FieldTypeTag::Unsupported(_) => None,
        }
    }
}

impl From<FieldType> for FieldTypeTag {
    fn from(value: FieldType) -> Self {
        FieldTypeTag::Known(value)
    }
}

/// Byte order of multi-byte fields. Only `"big"` selects big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Endian {
    Big,
    #[default]
    Little,
}

impl From<String> for Endian {
    fn from(value: String) -> Self {
        if value == "big" {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

impl From<Endian> for String {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Big => "big".to_owned(),
            Endian::Little => "little".to_owned(),
        }
    }
}

/// One named field at a fixed position in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldTypeTag,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub endian: Endian,
    #[serde(default)]
    pub signed: bool,
    /// Decimal digits kept for float fields; zero or negative disables truncation.
    #[serde(default)]
    pub decimals: i32,
    /// Informational only.
    #[serde(default)]
    pub unit: String,
}

impl FieldDefinition {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            offset,
            length,
            endian: Endian::default(),
            signed: false,
            decimals: 0,
            unit: String::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn with_decimals(mut self, decimals: i32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Offset of the first byte after this field.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

/// Group a field belongs to; used to label decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldGroup {
    Header,
    Length,
    Body,
    Footer,
    Checksum,
}

/// Text encoding of the payload string handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Hex,
    Base64,
    Ascii,
}

impl PayloadEncoding {
    /// Resolve a schema encoding tag; an empty tag means ASCII.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "hex" => Some(PayloadEncoding::Hex),
            "base64" => Some(PayloadEncoding::Base64),
            "ascii" | "" => Some(PayloadEncoding::Ascii),
            _ => None,
        }
    }

    pub fn decode(&self, payload: &str) -> std::result::Result<Vec<u8>, PayloadError> {
        match self {
            PayloadEncoding::Hex => Ok(hex::decode(payload)?),
            PayloadEncoding::Base64 => Ok(general_purpose::STANDARD.decode(payload)?),
            PayloadEncoding::Ascii => Ok(payload.as_bytes().to_vec()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Complete message layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSchema {
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: Vec<FieldDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<FieldDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub footer: Vec<FieldDefinition>,
    #[serde(default)]
    pub checksum: Option<FieldDefinition>,
    #[serde(default)]
    pub length: Option<FieldDefinition>,
    /// Carried for the configuration store; decoding ignores it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub delimiter: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub encoding: String,
}

impl FormatSchema {
    /// Parse a schema from its persisted JSON text.
    ///
    /// The store sometimes holds the schema double encoded (a JSON string whose content
    /// is the schema object); both shapes are accepted.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let schema: FormatSchema = match value {
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => serde_json::from_value(other)?,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Reject fields that can never be decoded.
    pub fn validate(&self) -> Result<()> {
        for (_, field) in self.fields() {
            if field.length == 0 {
                return Err(CodecError::ZeroLengthField {
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Every field in decode order, labelled with its group.
    pub fn fields(&self) -> impl Iterator<Item = (FieldGroup, &FieldDefinition)> {
        let header = self.header.iter().map(|f| (FieldGroup::Header, f));
        let length = self.length.iter().map(|f| (FieldGroup::Length, f));
        let body = self.body.iter().map(|f| (FieldGroup::Body, f));
        let footer = self.footer.iter().map(|f| (FieldGroup::Footer, f));
        let checksum = self.checksum.iter().map(|f| (FieldGroup::Checksum, f));
        header.chain(length).chain(body).chain(footer).chain(checksum)
    }

    pub fn payload_encoding(&self) -> Option<PayloadEncoding> {
        PayloadEncoding::from_tag(&self.encoding)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_and_double_encoded_forms() {
        let object = json!({
            "header": [{"name": "kind", "type": "uint8", "offset": 0, "length": 1}],
            "body": null,
            "encoding": "hex"
        });
        let direct = FormatSchema::from_json(&object.to_string()).unwrap();
        let nested = FormatSchema::from_json(&Value::String(object.to_string()).to_string()).unwrap();

        assert_eq!(direct, nested);
        assert_eq!(direct.header.len(), 1);
        assert!(direct.body.is_empty());
        assert_eq!(direct.payload_encoding(), Some(PayloadEncoding::Hex));
    }

    #[test]
    fn unknown_type_tags_are_preserved() {
        let schema = FormatSchema::from_json(
            r#"{"body":[{"name":"x","type":"varint","offset":0,"length":1}]}"#,
        )
        .unwrap();
        assert_eq!(
            schema.body[0].field_type,
            FieldTypeTag::Unsupported("varint".to_owned())
        );
    }

    #[test]
    fn endian_defaults_to_little_unless_big() {
        let schema = FormatSchema::from_json(
            r#"{"body":[
                {"name":"a","type":"uint16","offset":0,"length":2,"endian":"big"},
                {"name":"b","type":"uint16","offset":2,"length":2,"endian":"BIG"},
                {"name":"c","type":"uint16","offset":4,"length":2}
            ]}"#,
        )
        .unwrap();
        let endians: Vec<_> = schema.body.iter().map(|f| f.endian).collect();
        assert_eq!(endians, vec![Endian::Big, Endian::Little, Endian::Little]);
    }

    #[test]
    fn structural_errors_are_hard_failures() {
        assert!(matches!(
            FormatSchema::from_json("{not json"),
            Err(CodecError::Schema(_))
        ));
        assert!(matches!(
            FormatSchema::from_json(r#"{"body":[{"name":"x","type":"uint8","offset":-1,"length":1}]}"#),
            Err(CodecError::Schema(_))
        ));
        assert!(matches!(
            FormatSchema::from_json(r#"{"body":[{"name":"x","type":"uint8","offset":0,"length":0}]}"#),
            Err(CodecError::ZeroLengthField { .. })
        ));
    }

    #[test]
    fn encoding_tags_resolve() {
        assert_eq!(PayloadEncoding::from_tag(""), Some(PayloadEncoding::Ascii));
        assert_eq!(PayloadEncoding::from_tag("ascii"), Some(PayloadEncoding::Ascii));
        assert_eq!(PayloadEncoding::from_tag("base64"), Some(PayloadEncoding::Base64));
        assert_eq!(PayloadEncoding::from_tag("ebcdic"), None);
    }

    #[test]
    fn schema_serialises_back_to_persisted_shape() {
        let schema = FormatSchema {
            body: vec![FieldDefinition::new("t", FieldType::Int16, 0, 2).big_endian().signed()],
            encoding: "hex".into(),
            ..FormatSchema::default()
        };
        let value: Value = serde_json::from_str(&schema.to_json().unwrap()).unwrap();
        assert_eq!(value["body"][0]["type"], "int16");
        assert_eq!(value["body"][0]["endian"], "big");
        assert_eq!(FormatSchema::from_value(value).unwrap(), schema);
    }
}
