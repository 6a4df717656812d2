//! ---
//! gt_section: "05-binary"
//! gt_subsection: "binary"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Binary entrypoint for the Geotrack daemon and decoding tools."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use geotrack_codec::{decode_with_schema, geo_sample_payloads, CodecError, FormatSchema};
use geotrack_common::logging::init_tracing;
use geotrack_common::AppConfig;
use geotrack_net::{FrameServerBuilder, InMemoryDeviceStore, ReportSink, TracingSink};
use geotrack_zy::ContentRecord;
use tokio::signal;
use tracing::info;

const DEFAULT_CONFIG: &str = "configs/geotrack.toml";

#[derive(Debug, Parser)]
#[command(author, version, about = "Geotrack decoding gateway", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the ZY frame server until interrupted")]
    Serve {
        #[arg(long, value_enum, default_value_t = SinkKind::Memory, help = "Where routed reports go")]
        sink: SinkKind,
    },
    #[command(about = "Decode a payload against a format schema and print the result")]
    Decode {
        #[arg(long, value_name = "FILE", help = "Format schema JSON")]
        schema: PathBuf,
        #[arg(
            long,
            conflicts_with = "payload_file",
            required_unless_present = "payload_file",
            help = "Encoded payload text"
        )]
        payload: Option<String>,
        #[arg(long, value_name = "FILE", help = "File holding the encoded payload text")]
        payload_file: Option<PathBuf>,
    },
    #[command(about = "Decode a hex ZY content block")]
    Content {
        #[arg(value_name = "HEX")]
        hex: String,
    },
    #[command(about = "Process a forwarded ZY batch JSON file")]
    Forward {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    #[command(about = "Print sample payloads for the geo-location preset")]
    GeoSamples {
        #[arg(long, default_value_t = 10)]
        count: usize,
        #[arg(long, help = "Unix timestamp stamped into every sample (defaults to now)")]
        timestamp: Option<u32>,
        #[arg(long, help = "Print the preset schema before the samples")]
        with_schema: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    /// Keep devices and alerts in memory.
    Memory,
    /// Only log reports.
    Log,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        sink: SinkKind::Memory,
    }) {
        Commands::Serve { sink } => serve(cli.config, sink).await,
        Commands::Decode {
            schema,
            payload,
            payload_file,
        } => decode(&schema, payload, payload_file.as_deref()),
        Commands::Content { hex } => {
            let record = ContentRecord::decode_hex(hex.trim())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Forward { file } => {
            let body = fs::read_to_string(&file)
                .with_context(|| format!("unable to read {}", file.display()))?;
            let outcome = geotrack_zy::process_json(&body);
            println!("{}", serde_json::to_string_pretty(&outcome.response)?);
            Ok(())
        }
        Commands::GeoSamples {
            count,
            timestamp,
            with_schema,
        } => {
            if with_schema {
                let schema = serde_json::to_value(geotrack_codec::geo_location_schema())?;
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp() as u32);
            for payload in geo_sample_payloads(count, timestamp) {
                println!("{payload}");
            }
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>, sink_kind: SinkKind) -> Result<()> {
    let mut candidates = Vec::new();
    if let Some(path) = config_path {
        candidates.push(path);
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    init_tracing("geotrackd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; running with defaults"),
    }

    let sink: Arc<dyn ReportSink> = match sink_kind {
        SinkKind::Memory => Arc::new(InMemoryDeviceStore::new()),
        SinkKind::Log => Arc::new(TracingSink),
    };
    let handle = FrameServerBuilder::from_config(&config.server, sink)
        .spawn()
        .await?;

    info!(address = %handle.local_addr(), "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    handle.shutdown().await
}

fn decode(schema_path: &Path, payload: Option<String>, payload_file: Option<&Path>) -> Result<()> {
    let schema_text = fs::read_to_string(schema_path)
        .with_context(|| format!("unable to read schema {}", schema_path.display()))?;
    let schema = FormatSchema::from_json(&schema_text)
        .with_context(|| format!("invalid schema {}", schema_path.display()))?;

    let payload = match (payload, payload_file) {
        (Some(payload), _) => payload,
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("unable to read payload {}", path.display()))?
            .trim()
            .to_owned(),
        (None, None) => anyhow::bail!("either --payload or --payload-file is required"),
    };

    match decode_with_schema(&schema, &payload) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(err @ CodecError::MalformedPayload { .. }) => {
            if let Some(result) = err.parse_result() {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
