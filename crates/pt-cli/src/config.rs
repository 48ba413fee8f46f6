//! Configuration management for the project tracking CLI
//!
//! Settings are layered: built-in defaults, then `connect.yaml` files, then
//! command-line flags. Files are discovered at
//! `~/.config/pt_cli/connect.yaml` and `./connect.yaml`; any file may chain
//! to another one through its `config_file` key.

use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default project tracking server.
pub const DEFAULT_URL_ROOT: &str = "https://c3g-portal.sd4h.ca";

/// Default session file location.
pub const DEFAULT_SESSION_FILE: &str = "~/.pt_cli";

/// Default project.
pub const DEFAULT_PROJECT: &str = "moh-q";

/// Default request timeout in seconds.
/// Can be overridden via the PT_CLI_TIMEOUT_SECS environment variable.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Authenticate-then-replay cycles allowed per request.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 1;

/// Config files looked up on every start, in order.
pub const CONFIG_SEARCH_PATHS: &[&str] = &["~/.config/pt_cli/connect.yaml", "./connect.yaml"];

/// One `connect.yaml` file. Every key is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub url_root: Option<String>,
    pub session_file: Option<String>,
    pub project: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub max_auth_attempts: Option<u32>,
    pub config_file: Option<String>,
}

impl ConfigFile {
    /// Parse a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Effective CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub url_root: String,
    pub session_file: PathBuf,
    pub project: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: u64,
    pub max_auth_attempts: u32,
    /// Files that contributed to this configuration, in load order
    pub loaded_from: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_root: DEFAULT_URL_ROOT.to_string(),
            session_file: expand_tilde(DEFAULT_SESSION_FILE),
            project: DEFAULT_PROJECT.to_string(),
            user: None,
            password: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            loaded_from: Vec::new(),
        }
    }
}

impl Config {
    /// Load defaults merged with every discovered config file
    pub fn discover() -> Result<Self> {
        Self::load_chain(CONFIG_SEARCH_PATHS.iter().map(|p| expand_tilde(p)))
    }

    /// Load defaults merged with the given files and whatever they chain to.
    ///
    /// A referenced `config_file` is read right after the file naming it, so
    /// its keys win over the referencing file. Missing files are skipped and
    /// no file is read twice.
    pub fn load_chain(paths: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut config = Self::default();
        let mut queue: VecDeque<PathBuf> = paths.into_iter().collect();
        let mut seen = HashSet::new();

        while let Some(path) = queue.pop_front() {
            if !path.is_file() || !seen.insert(path.clone()) {
                continue;
            }

            debug!(path = %path.display(), "Loading config file");
            let file = ConfigFile::load(&path)?;
            if let Some(ref next) = file.config_file {
                queue.push_front(expand_tilde(next));
            }
            config.merge(file);
            config.loaded_from.push(path);
        }

        if let Some(timeout) = std::env::var("PT_CLI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = timeout;
        }

        if config.max_auth_attempts == 0 {
            return Err(CliError::config("max_auth_attempts must be at least 1"));
        }

        Ok(config)
    }

    /// Overlay the keys present in `file`
    pub fn merge(&mut self, file: ConfigFile) {
        if let Some(url_root) = file.url_root {
            self.url_root = url_root;
        }
        if let Some(session_file) = file.session_file {
            self.session_file = expand_tilde(&session_file);
        }
        if let Some(project) = file.project {
            self.project = project;
        }
        if file.user.is_some() {
            self.user = file.user;
        }
        if file.password.is_some() {
            self.password = file.password;
        }
        if let Some(timeout) = file.timeout {
            self.timeout = timeout;
        }
        if let Some(attempts) = file.max_auth_attempts {
            self.max_auth_attempts = attempts;
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, url_root: Option<&str>, project: Option<&str>) {
        if let Some(url_root) = url_root {
            self.url_root = url_root.to_string();
        }
        if let Some(project) = project {
            self.project = project.to_string();
        }
    }

    /// Server root with a scheme and without a trailing slash
    pub fn base_url(&self) -> Result<String> {
        normalize_url_root(&self.url_root)
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Key/value lines shown by `--info`, password redacted
    pub fn info_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("url_root", self.url_root.clone()),
            ("session_file", self.session_file.display().to_string()),
            ("project", self.project.clone()),
            ("user", self.user.clone().unwrap_or_else(|| "None".to_string())),
            (
                "password",
                if self.password.is_some() { "********" } else { "None" }.to_string(),
            ),
            ("timeout", self.timeout.to_string()),
            ("max_auth_attempts", self.max_auth_attempts.to_string()),
        ]
    }
}

/// Add `http://` to scheme-less roots and drop trailing slashes
pub fn normalize_url_root(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CliError::config("url_root is empty"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| CliError::config(format!("Invalid url_root '{}': {}", raw, e)))?;
    if parsed.host_str().is_none() {
        return Err(CliError::config(format!("url_root '{}' has no host", raw)));
    }

    Ok(candidate)
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
