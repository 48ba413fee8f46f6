//! API route builders
//!
//! Routes are paths relative to the server root; [`route_url`] joins them.

use std::fmt;

/// Read-oriented project routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    ReadsetFile,
    PairFile,
    Unanalyzed,
    Delivery,
}

impl Digest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadsetFile => "readset_file",
            Self::PairFile => "pair_file",
            Self::Unanalyzed => "unanalyzed",
            Self::Delivery => "delivery",
        }
    }
}

/// Write-oriented project routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    RunProcessing,
    Transfer,
    GenPipes,
    Delivery,
}

impl Ingest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunProcessing => "run_processing",
            Self::Transfer => "transfer",
            Self::GenPipes => "genpipes",
            Self::Delivery => "delivery",
        }
    }
}

/// Record modification operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Edit,
    Delete,
    Undelete,
    Deprecate,
    Undeprecate,
    Curate,
}

impl Modification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Undelete => "undelete",
            Self::Deprecate => "deprecate",
            Self::Undeprecate => "undeprecate",
            Self::Curate => "curate",
        }
    }

    /// Whether the operation understands the cascade options
    pub fn cascades(&self) -> bool {
        !matches!(self, Self::Edit)
    }
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join the server root and a route
pub fn route_url(base_url: &str, route: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), route.trim_start_matches('/'))
}

/// Normalize a user supplied route: `//` collapsed, leading and trailing `/` removed
pub fn clean_route(raw: &str) -> String {
    raw.replace("//", "/").trim_matches('/').to_string()
}

/// Route listing every API route
pub fn help_path() -> &'static str {
    "help"
}

/// Route listing every project
pub fn projects_path() -> &'static str {
    "projects"
}

/// Build a digest route
pub fn digest_path(project: &str, digest: Digest) -> String {
    format!("project/{}/digest_{}", project, digest.as_str())
}

/// Build an ingest route
pub fn ingest_path(project: &str, ingest: Ingest) -> String {
    format!("project/{}/ingest_{}", project, ingest.as_str())
}

/// Build a modification route
pub fn modification_path(project: &str, op: Modification) -> String {
    format!("project/{}/modification/{}", project, op.as_str())
}
