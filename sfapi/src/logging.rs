//! # Logging
//!
//! Three sinks: the console, the application log file and the audit log
//! file. The audit file only receives events emitted on
//! [`AUDIT_TARGET`](sfapi_core::service::AUDIT_TARGET), whatever the
//! configured log level.
use std::path::Path;

use anyhow::Context;
use sfapi_core::service::AUDIT_TARGET;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Keeps the file writers alive. Dropping it flushes buffered events, so it
/// must live until the process exits.
pub struct LogGuard {
    _app: WorkerGuard,
    _audit: WorkerGuard,
}

pub fn init(dir: &Path, file: &str, audit_file: &str, level: &str) -> anyhow::Result<LogGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;

    let (app_writer, app_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    let (audit_writer, audit_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, audit_file));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(env_filter(level)?);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(app_writer)
        .with_filter(env_filter(level)?);

    let audit_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(audit_writer)
        .with_filter(Targets::new().with_target(AUDIT_TARGET, tracing::Level::INFO));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(audit_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(LogGuard {
        _app: app_guard,
        _audit: audit_guard,
    })
}

/// `RUST_LOG` when set, `level` otherwise.
fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'")),
    }
}
