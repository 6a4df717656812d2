//! ---
//! gt_section: "04-networking"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY frame server and device report sinks."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! TCP edge for ZY devices: the frame server and the sinks it feeds.

pub mod server;
pub mod sink;

pub use server::{handle_frame, FrameServerBuilder, FrameServerHandle, DEFAULT_READ_BUFFER};
pub use sink::{DeviceState, InMemoryDeviceStore, ReportSink, StoredAlert, TracingSink};
