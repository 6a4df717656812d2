//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::value::FieldValue;

/// Outcome of decoding one payload against a schema.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields decoded so far, in decode order.
    pub fields: IndexMap<String, FieldValue>,
    pub raw_data: String,
    pub timestamp: DateTime<Utc>,
}

impl ParseResult {
    pub fn new(raw_data: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            fields: IndexMap::new(),
            raw_data: raw_data.into(),
            timestamp: Utc::now(),
        }
    }

    /// Mark the result failed, keeping whatever fields were already decoded.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
