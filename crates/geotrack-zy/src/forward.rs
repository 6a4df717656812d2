//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Batches of ZY content forwarded by a supplier platform as JSON instead of raw frames.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::ContentRecord;

/// Forwarded request body. Header values are echoed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardBatch {
    pub supplier: String,
    pub total_len: Option<i64>,
    pub cmd_code: Option<String>,
    pub token: String,
    pub msg_id_len: Option<i64>,
    pub msg_id: String,
    pub content_len: i64,
    /// Hex content used when `data_count` is 1.
    pub content: String,
    /// Hex contents used when `data_count` is above 1.
    pub content_list: Option<Vec<String>>,
    pub data_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardResponse {
    pub total_len: Option<i64>,
    pub cmd_code: Option<String>,
    pub result: String,
}

impl ForwardResponse {
    /// Response for a body that could not be read at all.
    pub fn rejected(err: impl std::fmt::Display) -> Self {
        Self {
            total_len: None,
            cmd_code: None,
            result: err.to_string(),
        }
    }
}

/// Response plus every record that decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardOutcome {
    pub response: ForwardResponse,
    pub records: Vec<ContentRecord>,
}

impl ForwardBatch {
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn process(&self) -> ForwardOutcome {
        let mut records = Vec::new();
        let result = match self.data_count {
            count if count <= 0 => "no data".to_owned(),
            1 if self.content.is_empty() => "no content data".to_owned(),
            1 => match ContentRecord::decode_hex(&self.content) {
                Ok(record) => {
                    debug!(supplier = %self.supplier, device_type = record.device_type, "forwarded content decoded");
                    records.push(record);
                    "success".to_owned()
                }
                Err(err) => format!("parse error: {err}"),
            },
            count => {
                let items = self.content_list.iter().flatten();
                for (index, content) in items.enumerate().filter(|(_, c)| !c.is_empty()) {
                    match ContentRecord::decode_hex(content) {
                        Ok(record) => records.push(record),
                        Err(err) => {
                            warn!(supplier = %self.supplier, index, error = %err, "forwarded content rejected")
                        }
                    }
                }
                format!("processed {}/{count} items", records.len())
            }
        };

        ForwardOutcome {
            response: ForwardResponse {
                total_len: self.total_len,
                cmd_code: self.cmd_code.clone(),
                result,
            },
            records,
        }
    }
}

/// Parse and process a forwarded JSON body, answering malformed bodies with the
/// parse error as the result text.
pub fn process_json(body: &str) -> ForwardOutcome {
    match ForwardBatch::from_json(body) {
        Ok(batch) => batch.process(),
        Err(err) => ForwardOutcome {
            response: ForwardResponse::rejected(err),
            records: Vec::new(),
        },
    }
}
