//! ---
//! gt_section: "01-core-functionality"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Shared primitives and utilities for the gateway runtime."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "GEOTRACK_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static WRITER_GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Output format of the stdout log stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the global subscriber for a gateway process.
///
/// The filter comes from `GEOTRACK_LOG`, then `RUST_LOG`, then `info`. Stdout
/// follows `config.format`. Every event is also written as JSON to a daily file
/// named `<prefix>.log` under `config.directory`, with thread ids so that
/// interleaved connection tasks can be told apart.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(rolling::daily(&config.directory, log_file_name(prefix)));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = WRITER_GUARDS.set((file_guard, stdout_guard));

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer(config.format, stdout_writer))
        .with(
            fmt::layer()
                .json()
                .with_thread_ids(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(file_writer),
        )
        .try_init()
        .is_ok();

    if installed {
        info!(
            service = %service_name,
            log_file = %config.directory.join(log_file_name(prefix)).display(),
            format = ?config.format,
            "tracing initialised"
        );
    }
    Ok(())
}

fn stdout_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let timer = fmt::time::UtcTime::rfc_3339();
    match format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_target(false)
            .with_timer(timer)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_timer(timer).with_writer(writer).boxed(),
    }
}

fn env_filter() -> EnvFilter {
    let directive = resolve_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive {directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

/// First non-blank directive of `GEOTRACK_LOG` and `RUST_LOG`, else the default.
fn resolve_directive(gateway: Option<String>, rust_log: Option<String>) -> String {
    [gateway, rust_log]
        .into_iter()
        .flatten()
        .map(|directive| directive.trim().to_owned())
        .find(|directive| !directive.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_owned())
}

fn log_file_name(prefix: &str) -> String {
    let stem = Path::new(prefix)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(prefix);
    format!("{stem}.log")
}
