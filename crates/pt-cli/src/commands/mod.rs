//! CLI command implementations
//!
//! Each command group has its own module. Commands write their result to the
//! given writer; `main` adds the trailing newline.

pub mod digest;
pub mod info;
pub mod ingest;
pub mod input;
pub mod modify;
pub mod route;
