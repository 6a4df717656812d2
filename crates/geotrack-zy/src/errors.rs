//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use thiserror::Error;

use crate::frame::Command;

pub type Result<T> = std::result::Result<T, FrameError>;

/// Failures while reading, parsing or routing a ZY frame.
///
/// The display strings are written back verbatim to devices after `ERROR: `.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("packet too short: {len} bytes")]
    TooShort { len: usize },
    #[error("invalid msg_id length")]
    MsgIdOverrun,
    #[error("packet too short for content_len")]
    ContentLenOverrun,
    #[error("invalid content length")]
    ContentOverrun,
    #[error("unknown command code: {0:02X}")]
    UnknownCommand(u8),
    #[error("empty device ID")]
    EmptyDeviceId,
    #[error("content data too short: {len} bytes")]
    ContentTooShort { len: usize },
    #[error("failed to decode hex content: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("failed to parse {command} data: {source}")]
    Content {
        command: Command,
        source: Box<FrameError>,
    },
    #[error("frame transport error: {0}")]
    Io(#[from] std::io::Error),
}
