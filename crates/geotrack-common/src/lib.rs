//! ---
//! gt_section: "01-core-functionality"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Shared primitives and utilities for the gateway runtime."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
//! Core shared primitives for the Geotrack workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the frame server and the daemon binary.

pub mod config;
pub mod logging;

pub use config::{AppConfig, FramingMode, LoadedAppConfig, LoggingConfig, ServerConfig};
pub use logging::{init_tracing, LogFormat};
