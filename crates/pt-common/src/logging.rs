//! `tracing` setup for the project tracking binaries
//!
//! Console output goes to **stderr**; stdout is left to the server payloads.
//! A daily-rotated log file can be added through `LOG_OUTPUT=file|both`.
//!
//! Level names follow `tracing`, plus `warning`, `critical` and `notset`.
//!
//! ```no_run
//! use pt_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::with_level(LogLevel::Debug).merge_env().unwrap_or_default();
//! init_logging(&config).ok();
//! tracing::info!(route = "projects", "Request sent");
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Always appended so HTTP and HTML parsing internals stay quiet.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "html5ever=error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_str() {
            "trace" | "notset" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" | "critical" | "fatal" => Self::Error,
            _ => return Err(anyhow!("Invalid log level: {}", s)),
        })
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_str() {
            "console" | "stderr" => Self::Console,
            "file" => Self::File,
            "both" | "all" => Self::Both,
            _ => return Err(anyhow!("Invalid log output: {}", s)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_str() {
            "text" | "pretty" => Self::Text,
            "json" => Self::Json,
            _ => return Err(anyhow!("Invalid log format: {}", s)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory of the rotated log files
    pub log_dir: PathBuf,
    /// File name prefix, e.g. `pt_cli` gives `pt_cli.2026-10-17`
    pub log_file_prefix: String,
    /// Extra comma-separated `EnvFilter` directives
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "pt_cli".to_string(),
            filter_directives: None,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Overlay `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` and `LOG_FILTER`.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level.parse()?;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.format = format.parse()?;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            self.filter_directives = Some(filter);
        }
        Ok(self)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::builder()
            .with_default_directive(Level::from(self.level).into())
            .from_env_lossy();

        let extra = self.filter_directives.as_deref().unwrap_or_default();
        DEFAULT_DIRECTIVES
            .iter()
            .copied()
            .chain(extra.split(',').map(str::trim).filter(|d| !d.is_empty()))
            .try_fold(base, |filter, directive| {
                let directive = directive
                    .parse()
                    .with_context(|| format!("Failed to parse filter directive '{}'", directive))?;
                Ok(filter.add_directive(directive))
            })
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Only the first call in a process succeeds.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(false).without_time();
        layers.push(match config.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        });
    }

    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        layers.push(file_layer(config)?);
    }

    tracing_subscriber::registry().with(layers).with(filter).try_init()?;
    Ok(())
}

fn file_layer(config: &LogConfig) -> Result<BoxedLayer> {
    std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop; the process logs until exit.
    std::mem::forget(guard);

    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    Ok(match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    })
}
