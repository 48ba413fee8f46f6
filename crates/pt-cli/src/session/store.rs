//! Session file persistence
//!
//! The session file holds the cookies of the last authenticated session so
//! later invocations skip the login round-trip. It is rewritten atomically and
//! is readable by the owner only.

use super::jar::{CookieMap, SecureNames};
use crate::error::{CliError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current on-disk format version
pub const SESSION_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub version: u32,
    pub base_url: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub cookies: CookieMap,
    #[serde(default, skip_serializing_if = "SecureNames::is_empty")]
    pub secure: SecureNames,
}

impl SessionData {
    /// Empty session bound to `base_url`
    pub fn fresh(base_url: &str) -> Self {
        Self {
            version: SESSION_FORMAT_VERSION,
            base_url: base_url.to_string(),
            saved_at: Utc::now(),
            cookies: CookieMap::new(),
            secure: SecureNames::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the session file
    pub fn load(&self) -> Result<SessionData> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CliError::SessionNotFound(self.path.clone()));
            }
            Err(e) => return Err(CliError::corrupt_session(&self.path, e.to_string())),
        };

        let data: SessionData = serde_json::from_str(&content)
            .map_err(|e| CliError::corrupt_session(&self.path, e.to_string()))?;

        if data.version != SESSION_FORMAT_VERSION {
            return Err(CliError::corrupt_session(
                &self.path,
                format!("unsupported version {}", data.version),
            ));
        }

        Ok(data)
    }

    /// Load the stored session for `base_url`, or start a fresh one.
    ///
    /// A missing, unreadable or foreign session never stops the command.
    pub fn load_or_fresh(&self, base_url: &str) -> SessionData {
        match self.load() {
            Ok(data) if data.base_url == base_url => {
                debug!(path = %self.path.display(), saved_at = %data.saved_at, "Restored session");
                data
            }
            Ok(data) => {
                info!(
                    stored = %data.base_url,
                    current = %base_url,
                    "Session belongs to another server, starting fresh"
                );
                SessionData::fresh(base_url)
            }
            Err(CliError::SessionNotFound(_)) => {
                debug!(path = %self.path.display(), "No session file, starting fresh");
                SessionData::fresh(base_url)
            }
            Err(e) => {
                warn!("{}; starting a fresh session", e);
                SessionData::fresh(base_url)
            }
        }
    }

    /// Write `data` to a temporary file next to the target, then rename it over
    /// the target. Readers see either the old or the new file, never a partial one.
    pub fn save(&self, data: &SessionData) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), data)?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file_mut().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample(base_url: &str) -> SessionData {
        let mut data = SessionData::fresh(base_url);
        data.cookies.insert(
            "pt.example.org".to_string(),
            BTreeMap::from([("_oauth2_proxy".to_string(), "abc".to_string())]),
        );
        data
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join(".pt_cli"));
        let data = sample("https://pt.example.org");

        store.save(&data).unwrap();
        assert_eq!(store.load().unwrap(), data);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join(".pt_cli"));
        store.save(&sample("https://pt.example.org")).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("absent"));
        assert!(matches!(store.load(), Err(CliError::SessionNotFound(_))));

        let fresh = store.load_or_fresh("https://pt.example.org");
        assert!(fresh.cookies.is_empty());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pt_cli");
        std::fs::write(&path, b"\x80\x04binary").unwrap();
        let store = SessionStore::new(&path);

        assert!(matches!(store.load(), Err(CliError::CorruptSession { .. })));
        assert!(store.load_or_fresh("https://pt.example.org").cookies.is_empty());
    }

    #[test]
    fn test_unknown_version_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join(".pt_cli"));
        let mut data = sample("https://pt.example.org");
        data.version = 7;
        store.save(&data).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("unsupported version 7"));
    }

    #[test]
    fn test_other_server_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join(".pt_cli"));
        store.save(&sample("https://pt.example.org")).unwrap();

        let data = store.load_or_fresh("http://localhost:5000");
        assert_eq!(data.base_url, "http://localhost:5000");
        assert!(data.cookies.is_empty());
    }
}
