//! Logging initialization
//!
//! Diagnostics go to stderr so stdout carries only calculation results.
//! One formatting layer per destination (stderr, optional log file), each
//! JSON or human-readable, under a shared `EnvFilter` that `RUST_LOG`
//! overrides.

use std::io::{self, IsTerminal};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writer alive; buffered lines are flushed
/// when it is dropped.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging from `config`. Must be called once, before any
/// session is created.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    let mut layers = vec![format_layer(config.json, io::stderr().is_terminal(), io::stderr)];

    let file_guard = if config.file_enabled {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
        layers.push(format_layer(config.json, false, writer));
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()?;

    tracing::debug!(
        level = %config.level,
        json = config.json,
        file = config.file_enabled,
        "Logging initialized"
    );

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.level.to_ascii_lowercase();
        EnvFilter::new(format!(
            "physcalc={level},physcalc_engine={level},physcalc_units={level}"
        ))
    })
}

fn format_layer<W>(json: bool, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_target(true).with_ansi(ansi).with_writer(writer);
    if json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.boxed()
    }
}

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// `<file_directory>/<file_prefix>[.<date>].log`, rotated as configured.
fn file_appender(config: &LoggingConfig) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.file_directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.file_directory.display()
        )
    })?;
    RollingFileAppender::builder()
        .rotation(rotation(&config.file_rotation))
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.file_directory)
        .with_context(|| {
            format!(
                "Failed to open log file in {}",
                config.file_directory.display()
            )
        })
}
