//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::content::ContentRecord;
use crate::errors::{FrameError, Result};
use crate::frame::{Command, Frame};

/// Alert raised by a `0x03` frame. The device type doubles as the alert type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotice {
    pub alert_type: u8,
    pub level: u8,
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub raw: String,
}

impl AlertNotice {
    pub fn new(device_id: &str, alert_type: u8) -> Self {
        let level = 0;
        Self {
            alert_type,
            level,
            kind: "warning".to_owned(),
            severity: "medium".to_owned(),
            message: format!("Device {device_id} alert: type={alert_type}, level={level}"),
            raw: format!("alert_type={alert_type},alert_level={level}"),
        }
    }
}

/// Routed view of a frame, ready for a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub device_id: String,
    pub command: Command,
    pub received_at: DateTime<Utc>,
    pub record: ContentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertNotice>,
}

/// Route a parsed frame into a [`DeviceReport`] stamped with `received_at`.
///
/// The device id is checked before the command code, and content failures name the
/// command they belonged to.
pub fn route(frame: &Frame, received_at: DateTime<Utc>) -> Result<DeviceReport> {
    let device_id = String::from_utf8_lossy(&frame.msg_id).trim().to_owned();
    if device_id.is_empty() {
        return Err(FrameError::EmptyDeviceId);
    }
    let command = frame.command()?;
    let record = ContentRecord::decode(&frame.content).map_err(|source| FrameError::Content {
        command,
        source: Box::new(source),
    })?;

    let alert = match command {
        Command::Alert => Some(AlertNotice::new(&device_id, record.device_type)),
        Command::Location | Command::Status => None,
    };
    debug!(
        device_id = %device_id,
        command = %command,
        latitude = record.latitude,
        longitude = record.longitude,
        "frame routed"
    );
    Ok(DeviceReport {
        device_id,
        command,
        received_at,
        record,
        alert,
    })
}
