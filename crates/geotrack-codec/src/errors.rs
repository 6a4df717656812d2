//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use thiserror::Error;

use crate::result::ParseResult;
use crate::schema::FieldType;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Hard failures that abort a decode call without a usable [`ParseResult`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid format configuration: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("invalid format configuration: field '{field}' declares a zero length")]
    ZeroLengthField { field: String },
    /// The payload text is not valid for the declared encoding. The failed result
    /// is carried along so callers can still report it.
    #[error("failed to decode data: {source}")]
    MalformedPayload {
        source: PayloadError,
        result: Box<ParseResult>,
    },
}

impl CodecError {
    /// Failed [`ParseResult`] attached to the error, when there is one.
    pub fn parse_result(&self) -> Option<&ParseResult> {
        match self {
            CodecError::MalformedPayload { result, .. } => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Per-field failures. These never abort a decode; they end the field walk and are
/// reported inside a failed [`ParseResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid offset: {offset}")]
    InvalidOffset { offset: usize },
    #[error("insufficient data for field '{field}' (need {required} bytes, have {available})")]
    InsufficientData {
        field: String,
        required: usize,
        available: usize,
    },
    #[error("field '{field}' declares {declared} bytes but {field_type} needs {required}")]
    LengthMismatch {
        field: String,
        field_type: FieldType,
        declared: usize,
        required: usize,
    },
    #[error("unsupported field type: {0}")]
    UnsupportedType(String),
}
