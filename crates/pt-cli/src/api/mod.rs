//! API client module
//!
//! HTTP client, response classification and request types for the project
//! tracking server.

pub mod classifier;
pub mod client;
pub mod endpoints;
pub mod types;

pub use classifier::{ApiResponse, ResponseClassifier, WarningSink};
pub use client::{ClientOptions, RouteClient};
pub use types::*;
