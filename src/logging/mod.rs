pub mod config;

pub use config::{ConsoleOutput, LoggingConfig};

use crate::cli::Command;
use crate::Result;
use anyhow::Context;
use std::env;
use std::fs::{create_dir_all, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Guard that keeps the file sink flushing for the duration of the command.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging framework for the provided CLI command.
///
/// Configures the filter, console sink, and optional non-blocking file sink.
/// Errors when invoked more than once per process unless tests explicitly
/// reset the guard.
pub fn init(command: &Command) -> Result<LoggingGuard> {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(anyhow::anyhow!("logging already initialized"));
    }

    let workspace_root = resolve_workspace_path(command);
    let config = LoggingConfig::load(workspace_root.as_deref())?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .context("failed to configure tracing level")?;

    let console_writer = match config.console_output {
        ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
        ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
        ConsoleOutput::None => BoxMakeWriter::new(io::sink),
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(console_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let (file_layer, file_guard) = if config.enable_file {
        let log_file = log_file_path(&config, workspace_root.as_deref())?;
        if let Some(parent) = log_file.parent() {
            create_dir_all(parent).with_context(|| {
                format!("failed to create log directory {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("failed to open log file {}", log_file.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(BoxMakeWriter::new(move || non_blocking.clone()))
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn resolve_workspace_path(command: &Command) -> Option<PathBuf> {
    command
        .config_path()
        .and_then(|path| path.parent().map(|p| p.to_path_buf()))
        .or_else(|| env::current_dir().ok())
}

fn log_file_path(config: &LoggingConfig, workspace_root: Option<&std::path::Path>) -> Result<PathBuf> {
    let base = match &config.log_dir {
        Some(custom) if custom.is_absolute() => custom.clone(),
        Some(custom) => workspace_root
            .map(|w| w.join(custom))
            .unwrap_or_else(|| custom.clone()),
        None => workspace_root
            .map(|w| w.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs")),
    };
    Ok(base.join("shiplog.log"))
}

#[cfg(test)]
/// Reset the initialization guard so tests can reconfigure logging.
pub fn reset_for_tests() {
    LOGGER_INITIALIZED.store(false, Ordering::SeqCst);
}
