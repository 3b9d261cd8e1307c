//! Logging system configuration and initialization
//!
//! - console output and/or a non-blocking log file
//! - the previous log file is rotated to a timestamped name on startup
//! - optional JSON output for the file layer
//! - timestamps in Moscow time (UTC+3)
//! - `RUST_LOG` overrides the configured filter

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Mutex;
use tracing::dispatcher::DefaultGuard;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime, MakeWriter},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::domain::constants::site;
pub use crate::infrastructure::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "santech-crawler.log";

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

fn moscow_offset() -> FixedOffset {
    FixedOffset::east_opt(site::MSK_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Time formatter for Moscow time (UTC+3)
struct MskTimeFormatter;

impl FormatTime for MskTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now().with_timezone(&moscow_offset());
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %Z"))
    }
}

/// Console logging for the current thread while the configuration loads.
/// Drop the guard before calling [`init_logging_with_config`].
pub fn bootstrap_logging() -> DefaultGuard {
    bootstrap_logging_with_writer(std::io::stderr)
}

fn bootstrap_logging_with_writer<W>(writer: W) -> DefaultGuard
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = fmt::fmt()
        .with_writer(writer)
        .with_timer(MskTimeFormatter)
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Rename an existing log file to `{stem}.{timestamp}.log`.
/// Returns the new file name when a file was rotated.
pub fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<Option<String>> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(None);
    }

    let metadata = std::fs::metadata(&log_file_path).map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let datetime: DateTime<Utc> = file_time.into();
    let local = datetime.with_timezone(&moscow_offset());

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, local.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;

    Ok(Some(timestamped_name))
}

/// Filter from `RUST_LOG`, or from the configured level and module filters.
///
/// Below TRACE, dependency chatter (sqlx, reqwest, hyper, html5ever) is held at
/// warn unless the config says otherwise.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(&config.level);
    if config.level.to_lowercase().contains("trace") {
        return filter;
    }

    let mut module_filters: Vec<_> = config.module_filters.iter().collect();
    module_filters.sort();
    for (module, level) in module_filters {
        match format!("{module}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log filter {module}={level}: {e}"),
        }
    }
    filter
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut rotated = None;

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e))?;
        rotated = rotate_existing_log_file(&config.log_dir, LOG_FILE_NAME)?;

        let file_appender = rolling::never(&config.log_dir, LOG_FILE_NAME);
        let (file_writer, file_guard) = non_blocking(file_appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(MskTimeFormatter)
            .with_ansi(false);
        if config.json_format {
            layers.push(
                file_layer
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .boxed(),
            );
        } else {
            layers.push(file_layer.with_target(false).boxed());
        }
    }

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(MskTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    Registry::default()
        .with(build_env_filter(config))
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {:?}", config.log_dir.join(LOG_FILE_NAME));
    }
    if let Some(name) = rotated {
        info!("Rotated existing log file to: {}", name);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== santech crawler ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
