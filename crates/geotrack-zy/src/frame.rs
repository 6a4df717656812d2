//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Wire layout of a ZY frame (big-endian):
//!
//! ```text
//! [total_len:4][cmd:1][token:19][msg_id_len:1][msg_id:n][content_len:2][content:m]
//! ```

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use strum::Display;

use crate::errors::{FrameError, Result};

/// Smallest buffer accepted by [`Frame::parse`].
pub const MIN_FRAME_LEN: usize = 30;
pub const TOKEN_LEN: usize = 19;
/// Bytes before the message id: total_len, cmd, token and msg_id_len.
pub const FIXED_HEADER_LEN: usize = 4 + 1 + TOKEN_LEN + 1;
pub const CONTENT_LEN_FIELD: usize = 2;

/// Command carried in byte 4 of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Location = 0x01,
    Status = 0x02,
    Alert = 0x03,
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x01 => Ok(Command::Location),
            0x02 => Ok(Command::Status),
            0x03 => Ok(Command::Alert),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

/// One parsed ZY frame. Owns copies of its variable sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub total_len: u32,
    pub cmd_code: u8,
    pub token: [u8; TOKEN_LEN],
    pub msg_id: Vec<u8>,
    pub content: Vec<u8>,
}

impl Frame {
    /// Build a frame whose `total_len` is its encoded size.
    pub fn new(cmd_code: u8, token: [u8; TOKEN_LEN], msg_id: &[u8], content: &[u8]) -> Self {
        let total = FIXED_HEADER_LEN + msg_id.len() + CONTENT_LEN_FIELD + content.len();
        Self {
            total_len: total as u32,
            cmd_code,
            token,
            msg_id: msg_id.to_vec(),
            content: content.to_vec(),
        }
    }

    /// Parse a frame from `data`. Bytes past the declared content are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort { len: data.len() });
        }

        let mut head = &data[..FIXED_HEADER_LEN];
        let total_len = head.get_u32();
        let cmd_code = head.get_u8();
        let mut token = [0u8; TOKEN_LEN];
        head.copy_to_slice(&mut token);
        let msg_id_len = usize::from(head.get_u8());

        let msg_id_end = FIXED_HEADER_LEN + msg_id_len;
        if msg_id_end > data.len() {
            return Err(FrameError::MsgIdOverrun);
        }
        let content_start = msg_id_end + CONTENT_LEN_FIELD;
        if content_start > data.len() {
            return Err(FrameError::ContentLenOverrun);
        }
        let content_len = usize::from((&data[msg_id_end..content_start]).get_u16());
        let content_end = content_start + content_len;
        if content_end > data.len() {
            return Err(FrameError::ContentOverrun);
        }

        Ok(Self {
            total_len,
            cmd_code,
            token,
            msg_id: data[FIXED_HEADER_LEN..msg_id_end].to_vec(),
            content: data[content_start..content_end].to_vec(),
        })
    }

    pub fn command(&self) -> Result<Command> {
        Command::try_from(self.cmd_code)
    }

    pub fn msg_id_len(&self) -> usize {
        self.msg_id.len()
    }

    pub fn content_len(&self) -> usize {
        self.content.len()
    }

    /// Serialise back into wire form. Fails when a variable section does not fit its
    /// length prefix.
    pub fn to_bytes(&self) -> Result<BytesMut> {
        let msg_id_len = u8::try_from(self.msg_id.len()).map_err(|_| FrameError::MsgIdOverrun)?;
        let content_len =
            u16::try_from(self.content.len()).map_err(|_| FrameError::ContentOverrun)?;
        let mut buf = BytesMut::with_capacity(
            FIXED_HEADER_LEN + self.msg_id.len() + CONTENT_LEN_FIELD + self.content.len(),
        );
        buf.put_u32(self.total_len);
        buf.put_u8(self.cmd_code);
        buf.put_slice(&self.token);
        buf.put_u8(msg_id_len);
        buf.put_slice(&self.msg_id);
        buf.put_u16(content_len);
        buf.put_slice(&self.content);
        Ok(buf)
    }
}
