//! Authenticated session state shared by every request of one invocation

pub mod jar;
pub mod store;

pub use jar::{CookieMap, SecureNames, SessionJar};
pub use store::{SessionData, SessionStore, SESSION_FORMAT_VERSION};

use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// The cookie jar of the running process together with where it is persisted.
///
/// Built once by the top-level command runner and handed to the client; there
/// is no process-wide session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    base_url: String,
    jar: Arc<SessionJar>,
    store: SessionStore,
}

impl SessionContext {
    /// Restore the stored session for `base_url`, or start an empty one
    pub fn open(store: SessionStore, base_url: &str) -> Self {
        let data = store.load_or_fresh(base_url);
        Self {
            base_url: base_url.to_string(),
            jar: Arc::new(SessionJar::from_cookies(data.cookies, data.secure)),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn jar(&self) -> Arc<SessionJar> {
        Arc::clone(&self.jar)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Write the current cookies to the session file
    pub fn persist(&self) -> Result<()> {
        let data = SessionData {
            version: SESSION_FORMAT_VERSION,
            base_url: self.base_url.clone(),
            saved_at: Utc::now(),
            cookies: self.jar.snapshot(),
            secure: self.jar.secure_names(),
        };
        self.store.save(&data)?;
        self.jar.mark_saved();
        Ok(())
    }

    /// Persist only if cookies changed since the last save
    pub fn persist_if_changed(&self) -> Result<()> {
        if self.jar.has_changed() {
            self.persist()
        } else {
            debug!("Session unchanged, not saving");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    #[test]
    fn test_cookies_survive_a_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pt_cli");
        let base = "https://pt.example.org";
        let origin = Url::parse("https://pt.example.org/project/moh/digest_readset_file").unwrap();

        let first = SessionContext::open(SessionStore::new(&path), base);
        first.jar().apply_set_cookie("_oauth2_proxy=tok; Path=/", &origin);
        first.persist_if_changed().unwrap();
        assert!(!first.jar().has_changed());

        let second = SessionContext::open(SessionStore::new(&path), base);
        assert_eq!(second.jar().get(&origin, "_oauth2_proxy").as_deref(), Some("tok"));
    }

    #[test]
    fn test_secure_flag_survives_a_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pt_cli");
        let base = "https://pt.example.org";

        let first = SessionContext::open(SessionStore::new(&path), base);
        first
            .jar()
            .apply_set_cookie("_oauth2_proxy=tok; Secure", &Url::parse("https://pt.example.org/").unwrap());
        first.persist().unwrap();

        let second = SessionContext::open(SessionStore::new(&path), base);
        let plain = Url::parse("http://pt.example.org/projects").unwrap();
        assert!(second.jar().header_for(&plain).is_none());
    }

    #[test]
    fn test_unchanged_session_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pt_cli");
        let ctx = SessionContext::open(SessionStore::new(&path), "https://pt.example.org");

        ctx.persist_if_changed().unwrap();
        assert!(!path.exists());
    }
}
