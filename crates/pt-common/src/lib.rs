//! Project Tracking Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the project tracking client binaries.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup driven by CLI flags and
//!   environment variables. Console output always goes to stderr so that
//!   stdout stays reserved for server payloads.
//!
//! # Example
//!
//! ```no_run
//! use pt_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::with_level(LogLevel::Debug);
//! init_logging(&config).ok();
//! tracing::debug!("logging ready");
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput};
