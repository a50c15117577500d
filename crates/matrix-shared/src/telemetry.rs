//! Telemetry setup

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingSettings};
use crate::constants::DEFAULT_LOG_FILE_PREFIX;
use crate::error::AppError;

/// RUST_LOG wins over the configured level
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter, AppError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| AppError::TelemetryError(format!("invalid log level '{}': {}", settings.level, e))),
    }
}

pub fn init_telemetry(settings: &LoggingSettings) -> Result<(), AppError> {
    let filter = build_filter(settings)?;

    let file_appender = match &settings.file_dir {
        Some(dir) => Some(
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(DEFAULT_LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| AppError::TelemetryError(e.to_string()))?,
        ),
        None => None,
    };

    let result = match settings.format {
        LogFormat::Json => {
            let file_layer = file_appender.map(|appender| {
                fmt::layer()
                    .json()
                    .with_writer(appender)
                    .with_target(true)
                    .with_level(true)
            });

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(file_layer)
                .try_init()
        }
        LogFormat::Pretty => {
            let file_layer = file_appender.map(|appender| {
                fmt::layer()
                    .with_writer(appender)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false) // No colors in file
            });

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(file_layer)
                .try_init()
        }
    };

    result.map_err(|e| AppError::TelemetryError(e.to_string()))
}
