//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! The 20-byte telemetry block carried in a frame's content section.
//!
//! ```text
//! [device_type][year][month][day][hour][min][sec][lat:4][lon:4][alt:2][snr][temp][volt]
//! ```
//!
//! Coordinates are sign-magnitude: bit 31 marks south/west and the low 31 bits hold
//! degrees scaled by 1,000,000.

use std::fmt;

use bytes::{Buf, BufMut};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::errors::{FrameError, Result};

pub const CONTENT_LEN: usize = 20;

const SIGN_BIT: u32 = 0x8000_0000;
const COORDINATE_SCALE: f64 = 1_000_000.0;
const ALTITUDE_OFFSET: i32 = 500;
const TEMPERATURE_OFFSET: i16 = 50;
/// Millivolts per voltage step.
const VOLTAGE_STEP_MV: f64 = 50.0;

/// Date and time as sent by the device. No calendar validation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl RawDateTime {
    /// Calendar view of the timestamp, when it names a real instant.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?
            .and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
    }
}

impl fmt::Display for RawDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for RawDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decoded telemetry block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub device_type: u8,
    pub date_time: RawDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters; negative below sea level.
    pub altitude: i32,
    /// Signal-to-noise ratio, nominally -15..=15.
    pub snr: i8,
    /// Degrees Celsius.
    pub temperature: i16,
    pub voltage: f64,
}

impl ContentRecord {
    /// Decode the first [`CONTENT_LEN`] bytes of `content`.
    pub fn decode(content: &[u8]) -> Result<Self> {
        if content.len() < CONTENT_LEN {
            return Err(FrameError::ContentTooShort { len: content.len() });
        }
        let mut buf = &content[..CONTENT_LEN];

        let device_type = buf.get_u8();
        let date_time = RawDateTime {
            year: u16::from(buf.get_u8()) + 2000,
            month: buf.get_u8(),
            day: buf.get_u8(),
            hour: buf.get_u8(),
            minute: buf.get_u8(),
            second: buf.get_u8(),
        };
        let latitude = sign_magnitude(buf.get_u32());
        let longitude = sign_magnitude(buf.get_u32());
        let altitude = i32::from(buf.get_u16()) - ALTITUDE_OFFSET;
        let snr = buf.get_i8();
        let temperature = i16::from(buf.get_i8()) - TEMPERATURE_OFFSET;
        let voltage = f64::from(buf.get_u8()) * VOLTAGE_STEP_MV / 1000.0;

        Ok(Self {
            device_type,
            date_time,
            latitude,
            longitude,
            altitude,
            snr,
            temperature,
            voltage,
        })
    }

    /// Decode the hex text form (either case) used by the forwarding path.
    pub fn decode_hex(text: &str) -> Result<Self> {
        Self::decode(&hex::decode(text)?)
    }

    /// Encode back into the 20-byte block. Values outside the wire ranges saturate.
    pub fn encode(&self) -> [u8; CONTENT_LEN] {
        let mut out = [0u8; CONTENT_LEN];
        let mut buf = &mut out[..];
        buf.put_u8(self.device_type);
        buf.put_u8(self.date_time.year.saturating_sub(2000).min(255) as u8);
        buf.put_u8(self.date_time.month);
        buf.put_u8(self.date_time.day);
        buf.put_u8(self.date_time.hour);
        buf.put_u8(self.date_time.minute);
        buf.put_u8(self.date_time.second);
        buf.put_u32(to_sign_magnitude(self.latitude));
        buf.put_u32(to_sign_magnitude(self.longitude));
        buf.put_u16((self.altitude + ALTITUDE_OFFSET).clamp(0, i32::from(u16::MAX)) as u16);
        buf.put_i8(self.snr);
        buf.put_i8((self.temperature + TEMPERATURE_OFFSET).clamp(-128, 127) as i8);
        buf.put_u8((self.voltage * 1000.0 / VOLTAGE_STEP_MV).round().clamp(0.0, 255.0) as u8);
        out
    }
}

fn sign_magnitude(raw: u32) -> f64 {
    let magnitude = f64::from(raw & !SIGN_BIT) / COORDINATE_SCALE;
    if raw & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn to_sign_magnitude(degrees: f64) -> u32 {
    let magnitude = ((degrees.abs() * COORDINATE_SCALE).round() as u32) & !SIGN_BIT;
    if degrees.is_sign_negative() {
        magnitude | SIGN_BIT
    } else {
        magnitude
    }
}
