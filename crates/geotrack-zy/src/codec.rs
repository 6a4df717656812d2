//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Stream framing for ZY connections.
//!
//! TCP gives no message boundaries, so the decoder buffers until the
//! `msg_id_len`/`content_len` prefixes describe a whole frame and then hands out
//! exactly that many bytes.

use std::fmt;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::errors::FrameError;
use crate::frame::{CONTENT_LEN_FIELD, FIXED_HEADER_LEN};

/// Reply written back after each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success,
    Error(String),
}

impl Reply {
    pub fn error(err: impl fmt::Display) -> Self {
        Reply::Error(err.to_string())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Success => f.write_str("SUCCESS"),
            Reply::Error(message) => write!(f, "ERROR: {message}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZyFrameCodec;

impl ZyFrameCodec {
    /// Size of the complete frame at the front of `buf`, once enough is buffered to tell.
    fn frame_len(buf: &[u8]) -> Option<usize> {
        let msg_id_len = usize::from(*buf.get(FIXED_HEADER_LEN - 1)?);
        let content_len_at = FIXED_HEADER_LEN + msg_id_len;
        let prefix = buf.get(content_len_at..content_len_at + CONTENT_LEN_FIELD)?;
        let content_len = usize::from(u16::from_be_bytes([prefix[0], prefix[1]]));
        Some(content_len_at + CONTENT_LEN_FIELD + content_len)
    }
}

impl Decoder for ZyFrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = Self::frame_len(buf) else {
            return Ok(None);
        };
        if buf.len() < len {
            buf.reserve(len - buf.len());
            return Ok(None);
        }
        Ok(Some(buf.split_to(len)))
    }

    /// A truncated frame left at EOF is yielded once so the parser can report it.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(buf.split_to(buf.len())))
        }
    }
}

impl Encoder<Reply> for ZyFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let text = reply.to_string();
        buf.reserve(text.len());
        buf.put_slice(text.as_bytes());
        Ok(())
    }
}
