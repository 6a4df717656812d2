//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! ZY telemetry protocol: frame parsing, the 20-byte content block, routing into
//! device reports, stream reassembly and the JSON forwarding variant.

pub mod codec;
pub mod content;
pub mod errors;
pub mod forward;
pub mod frame;
pub mod router;

pub use codec::{Reply, ZyFrameCodec};
pub use content::{ContentRecord, RawDateTime, CONTENT_LEN};
pub use errors::{FrameError, Result};
pub use forward::{process_json, ForwardBatch, ForwardOutcome, ForwardResponse};
pub use frame::{Command, Frame, MIN_FRAME_LEN, TOKEN_LEN};
pub use router::{route, AlertNotice, DeviceReport};
