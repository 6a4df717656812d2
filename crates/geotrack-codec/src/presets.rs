//! ---
//! gt_section: "02-decoding-engine"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Schema-driven field decoding and checksum validation."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Built-in "device geo-location report" layout and a sample payload generator for it.

use bytes::{BufMut, BytesMut};

use crate::schema::{FieldDefinition, FieldType, FormatSchema};

/// Display name the configuration store uses for [`geo_location_schema`].
pub const GEO_LOCATION_SCHEMA_NAME: &str = "device geo-location report";

/// Total size of a geo-location payload.
pub const GEO_LOCATION_PAYLOAD_LEN: usize = 32;

/// Reference point (Beijing) the sample track is centred on.
pub const GEO_SAMPLE_ORIGIN: (f64, f64) = (39.90923, 116.397428);

const DEVICE_ID_LEN: usize = 8;

/// Hex encoded 32-byte report: message type and device id, then position, motion,
/// timestamp and status.
pub fn geo_location_schema() -> FormatSchema {
    FormatSchema {
        header: vec![
            FieldDefinition::new("message_type", FieldType::Uint8, 0, 1),
            FieldDefinition::new("device_id", FieldType::String, 1, DEVICE_ID_LEN),
        ],
        body: vec![
            FieldDefinition::new("latitude", FieldType::Float32, 9, 4)
                .big_endian()
                .signed()
                .with_unit("deg"),
            FieldDefinition::new("longitude", FieldType::Float32, 13, 4)
                .big_endian()
                .signed()
                .with_unit("deg"),
            FieldDefinition::new("altitude", FieldType::Float32, 17, 4)
                .big_endian()
                .signed()
                .with_unit("m"),
            FieldDefinition::new("speed", FieldType::Float32, 21, 4)
                .big_endian()
                .signed()
                .with_unit("km/h"),
            FieldDefinition::new("direction", FieldType::Uint16, 25, 2)
                .big_endian()
                .with_unit("deg"),
            FieldDefinition::new("timestamp", FieldType::Uint32, 27, 4)
                .big_endian()
                .with_unit("s"),
            FieldDefinition::new("status", FieldType::Uint8, 31, 1),
        ],
        encoding: "hex".to_owned(),
        ..FormatSchema::default()
    }
}

/// One report in the sample track.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSample {
    pub device_id: String,
    pub latitude: f32,
    pub longitude: f32,
    pub altitude: f32,
    pub speed: f32,
    pub direction: u16,
    pub timestamp: u32,
    pub status: u8,
}

impl GeoSample {
    /// The `index`-th point of the track, stepping 0.01 degrees per sample.
    pub fn nth(index: usize, timestamp: u32) -> Self {
        let step = (index as f64 - 5.0) * 0.01;
        Self {
            device_id: format!("device{:02}", index + 1),
            latitude: (GEO_SAMPLE_ORIGIN.0 + step) as f32,
            longitude: (GEO_SAMPLE_ORIGIN.1 + step) as f32,
            altitude: (50.0 + index as f64 * 10.0) as f32,
            speed: (30.0 + index as f64 * 5.0) as f32,
            direction: (index * 36) as u16,
            timestamp,
            status: (index % 3) as u8,
        }
    }

    /// Encode into the [`geo_location_schema`] layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(GEO_LOCATION_PAYLOAD_LEN);
        buf.put_u8(0x01);
        let mut device_id = [0u8; DEVICE_ID_LEN];
        let id = self.device_id.as_bytes();
        let n = id.len().min(DEVICE_ID_LEN);
        device_id[..n].copy_from_slice(&id[..n]);
        buf.put_slice(&device_id);
        buf.put_f32(self.latitude);
        buf.put_f32(self.longitude);
        buf.put_f32(self.altitude);
        buf.put_f32(self.speed);
        buf.put_u16(self.direction);
        buf.put_u32(self.timestamp);
        buf.put_u8(self.status);
        buf.to_vec()
    }
}

/// `count` hex encoded sample payloads stamped with `timestamp`.
pub fn geo_sample_payloads(count: usize, timestamp: u32) -> Vec<String> {
    (0..count)
        .map(|index| hex::encode(GeoSample::nth(index, timestamp).encode()))
        .collect()
}
