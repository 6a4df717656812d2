//! ---
//! gt_section: "04-networking"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY frame server and device report sinks."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geotrack_zy::{Command, DeviceReport};
use parking_lot::RwLock;
use tracing::{info, warn};

/// Destination for routed device reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Apply the domain action the report calls for.
    async fn apply(&self, report: &DeviceReport) -> anyhow::Result<()>;
}

/// Logs every report and stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn apply(&self, report: &DeviceReport) -> anyhow::Result<()> {
        let record = &report.record;
        match &report.alert {
            Some(alert) => info!(
                device_id = %report.device_id,
                alert_type = alert.alert_type,
                message = %alert.message,
                "device alert"
            ),
            None => info!(
                device_id = %report.device_id,
                command = %report.command,
                latitude = record.latitude,
                longitude = record.longitude,
                altitude = record.altitude,
                voltage = record.voltage,
                reported_at = %record.date_time,
                "device report"
            ),
        }
        Ok(())
    }
}

pub const STATUS_ONLINE: &str = "online";

/// Last known state of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub id: u64,
    pub name: String,
    pub topic: String,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen: DateTime<Utc>,
}

/// Alert persisted against a known device.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAlert {
    pub device_id: u64,
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub raw: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    devices: HashMap<String, DeviceState>,
    alerts: Vec<StoredAlert>,
    next_id: u64,
}

/// Device registry kept in memory, keyed by topic (the device id on the wire).
///
/// Location reports create devices on first sight; status and alert reports only
/// touch devices that already exist.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeviceStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self, topic: &str) -> Option<DeviceState> {
        self.state.read().devices.get(topic).cloned()
    }

    pub fn devices(&self) -> Vec<DeviceState> {
        let mut devices: Vec<_> = self.state.read().devices.values().cloned().collect();
        devices.sort_by_key(|device| device.id);
        devices
    }

    pub fn alerts(&self) -> Vec<StoredAlert> {
        self.state.read().alerts.clone()
    }

    fn record_location(&self, report: &DeviceReport) {
        let mut state = self.state.write();
        let StoreState {
            devices, next_id, ..
        } = &mut *state;
        let device = devices
            .entry(report.device_id.clone())
            .or_insert_with(|| {
                *next_id += 1;
                DeviceState {
                    id: *next_id,
                    name: report.device_id.clone(),
                    topic: report.device_id.clone(),
                    status: STATUS_ONLINE.to_owned(),
                    latitude: 0.0,
                    longitude: 0.0,
                    last_seen: report.received_at,
                }
            });
        device.latitude = report.record.latitude;
        device.longitude = report.record.longitude;
        device.status = STATUS_ONLINE.to_owned();
        device.last_seen = report.received_at;
    }

    fn record_status(&self, report: &DeviceReport) -> bool {
        let mut state = self.state.write();
        match state.devices.get_mut(&report.device_id) {
            Some(device) => {
                device.status = STATUS_ONLINE.to_owned();
                device.last_seen = report.received_at;
                true
            }
            None => false,
        }
    }

    fn record_alert(&self, report: &DeviceReport) -> bool {
        let Some(alert) = &report.alert else {
            return false;
        };
        let mut state = self.state.write();
        let Some(device_id) = state.devices.get(&report.device_id).map(|d| d.id) else {
            return false;
        };
        state.alerts.push(StoredAlert {
            device_id,
            kind: alert.kind.clone(),
            severity: alert.severity.clone(),
            message: alert.message.clone(),
            raw: alert.raw.clone(),
            read: false,
            timestamp: report.received_at,
        });
        true
    }
}

#[async_trait]
impl ReportSink for InMemoryDeviceStore {
    async fn apply(&self, report: &DeviceReport) -> anyhow::Result<()> {
        match report.command {
            Command::Location => {
                self.record_location(report);
                info!(
                    device_id = %report.device_id,
                    latitude = report.record.latitude,
                    longitude = report.record.longitude,
                    "device location updated"
                );
            }
            Command::Status => {
                if self.record_status(report) {
                    info!(device_id = %report.device_id, status = STATUS_ONLINE, "device status updated");
                }
            }
            Command::Alert => {
                if !self.record_alert(report) {
                    warn!(device_id = %report.device_id, "device not found for alert");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use geotrack_zy::{route, Frame, TOKEN_LEN};

    const NORTH_EAST: &str = "11150C151515150254FA0006EBE740112F054E74";

    fn report(cmd: u8, device: &str, at: DateTime<Utc>) -> DeviceReport {
        let content = hex::decode(NORTH_EAST).unwrap();
        let frame = Frame::new(cmd, [0; TOKEN_LEN], device.as_bytes(), &content);
        route(&frame, at).unwrap()
    }

    #[tokio::test]
    async fn location_creates_then_updates() {
        let store = InMemoryDeviceStore::new();
        let first = Utc::now();
        store.apply(&report(0x01, "dev-1", first)).await.unwrap();
        let later = first + Duration::seconds(30);
        store.apply(&report(0x01, "dev-1", later)).await.unwrap();
        store.apply(&report(0x01, "dev-2", later)).await.unwrap();

        let devices = store.devices();
        assert_eq!(devices.len(), 2);
        let device = store.device("dev-1").unwrap();
        assert_eq!(device.id, 1);
        assert_eq!(device.name, "dev-1");
        assert_eq!(device.status, STATUS_ONLINE);
        assert_eq!(device.last_seen, later);
        assert!((device.latitude - 39.123456).abs() < 1e-9);
        assert_eq!(store.device("dev-2").unwrap().id, 2);
    }

    #[tokio::test]
    async fn status_and_alert_need_a_known_device() {
        let store = InMemoryDeviceStore::new();
        let now = Utc::now();
        store.apply(&report(0x02, "ghost", now)).await.unwrap();
        store.apply(&report(0x03, "ghost", now)).await.unwrap();
        assert!(store.devices().is_empty());
        assert!(store.alerts().is_empty());

        store.apply(&report(0x01, "dev-1", now)).await.unwrap();
        let later = now + Duration::seconds(5);
        store.apply(&report(0x02, "dev-1", later)).await.unwrap();
        store.apply(&report(0x03, "dev-1", later)).await.unwrap();

        assert_eq!(store.device("dev-1").unwrap().last_seen, later);
        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].device_id, 1);
        assert_eq!(alerts[0].kind, "warning");
        assert_eq!(alerts[0].message, "Device dev-1 alert: type=17, level=0");
        assert!(!alerts[0].read);
    }

    #[tokio::test]
    async fn tracing_sink_accepts_everything() {
        let sink = TracingSink;
        for cmd in [0x01, 0x02, 0x03] {
            sink.apply(&report(cmd, "dev", Utc::now())).await.unwrap();
        }
    }
}
