//! Cookie jar backing the HTTP client
//!
//! reqwest calls into the jar on every request and redirect hop, so cookies
//! set by the identity provider and by the API proxy are both captured. The
//! jar is flat enough to serialize as-is into the session file.

use chrono::{DateTime, Utc};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::trace;
use url::Url;

/// Cookies grouped by scope.
///
/// A scope is either an exact host (`pt.example.org`) or, for cookies that
/// carried a `Domain` attribute, the domain with a leading dot
/// (`.example.org`), which also matches every subdomain.
pub type CookieMap = BTreeMap<String, BTreeMap<String, String>>;

/// Names of the `Secure` cookies of each scope. They are only sent over https.
pub type SecureNames = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
struct Contents {
    cookies: CookieMap,
    secure: SecureNames,
}

impl Contents {
    fn is_secure(&self, scope: &str, name: &str) -> bool {
        self.secure.get(scope).is_some_and(|names| names.contains(name))
    }

    /// Record the flag of `name`, true when it differs from before
    fn set_secure(&mut self, scope: &str, name: &str, secure: bool) -> bool {
        if secure {
            return self.secure.entry(scope.to_string()).or_default().insert(name.to_string());
        }
        let removed = self.secure.get_mut(scope).is_some_and(|names| names.remove(name));
        if self.secure.get(scope).is_some_and(BTreeSet::is_empty) {
            self.secure.remove(scope);
        }
        removed
    }

    /// Cookies of the scopes matching `url`, `Secure` ones only over https
    fn visible<'a>(&'a self, url: &Url) -> impl Iterator<Item = (&'a str, &'a str, &'a str)> + 'a {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let https = url.scheme() == "https";
        self.cookies
            .iter()
            .filter(move |(scope, _)| scope_matches(scope, &host))
            .flat_map(|(scope, jar)| {
                jar.iter()
                    .map(move |(name, value)| (scope.as_str(), name.as_str(), value.as_str()))
            })
            .filter(move |(scope, name, _)| https || !self.is_secure(scope, name))
    }
}

#[derive(Debug, Default)]
pub struct SessionJar {
    contents: RwLock<Contents>,
    changed: AtomicBool,
}

impl SessionJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cookies(cookies: CookieMap, secure: SecureNames) -> Self {
        Self {
            contents: RwLock::new(Contents { cookies, secure }),
            changed: AtomicBool::new(false),
        }
    }

    /// Copy of the current cookies
    pub fn snapshot(&self) -> CookieMap {
        self.read().cookies.clone()
    }

    /// Copy of the `Secure` flags
    pub fn secure_names(&self) -> SecureNames {
        self.read().secure.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().cookies.values().all(BTreeMap::is_empty)
    }

    /// True when a response modified the jar since the last [`mark_saved`](Self::mark_saved)
    pub fn has_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    pub fn mark_saved(&self) {
        self.changed.store(false, Ordering::SeqCst);
    }

    /// Value of a cookie visible to `url`
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        self.read()
            .visible(url)
            .find(|(_, candidate, _)| *candidate == name)
            .map(|(_, _, value)| value.to_string())
    }

    /// Apply one `Set-Cookie` header received from `url`
    pub fn apply_set_cookie(&self, header: &str, url: &Url) {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return;
        };
        let Some(cookie) = ParsedCookie::parse(header) else {
            trace!(header, "Ignoring unparsable Set-Cookie");
            return;
        };

        let scope = match cookie.domain {
            Some(ref domain) if domain_allowed(domain, &host) => format!(".{}", domain),
            Some(ref domain) => {
                trace!(domain = %domain, host = %host, "Rejecting cookie for foreign domain");
                return;
            }
            None => host,
        };
        if cookie.secure && url.scheme() != "https" {
            trace!(name = %cookie.name, "Rejecting Secure cookie set over http");
            return;
        }

        let mut contents = self.write();
        let flag_changed = contents.set_secure(&scope, &cookie.name, cookie.secure && !cookie.expired);
        let value_changed = if cookie.expired {
            let removed = contents
                .cookies
                .get_mut(&scope)
                .and_then(|jar| jar.remove(&cookie.name))
                .is_some();
            if contents.cookies.get(&scope).is_some_and(BTreeMap::is_empty) {
                contents.cookies.remove(&scope);
            }
            removed
        } else {
            let previous = contents
                .cookies
                .entry(scope)
                .or_default()
                .insert(cookie.name, cookie.value.clone());
            previous.as_deref() != Some(cookie.value.as_str())
        };
        if flag_changed || value_changed {
            self.changed.store(true, Ordering::SeqCst);
        }
    }

    /// `Cookie` header value for a request to `url`
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let contents = self.read();

        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
        // Host-only scopes sort after their dotted domain, so they win on name clashes.
        for (scope, name, value) in contents.visible(url) {
            trace!(scope = %scope, name = %name, "Attaching cookie");
            merged.insert(name, value);
        }

        if merged.is_empty() {
            return None;
        }

        Some(
            merged
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Contents> {
        self.contents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Contents> {
        self.contents.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            if let Ok(raw) = header.to_str() {
                self.apply_set_cookie(raw, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|value| HeaderValue::from_str(&value).ok())
    }
}

fn scope_matches(scope: &str, host: &str) -> bool {
    match scope.strip_prefix('.') {
        Some(domain) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => host == scope,
    }
}

fn domain_allowed(domain: &str, host: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

struct ParsedCookie {
    name: String,
    value: String,
    domain: Option<String>,
    secure: bool,
    expired: bool,
}

impl ParsedCookie {
    fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim().trim_matches('"').to_string();

        let mut domain = None;
        let mut secure = false;
        let mut expired = value.is_empty();
        let mut max_age_seen = false;

        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    domain = Some(val.trim_start_matches('.').to_ascii_lowercase());
                }
                "secure" => secure = true,
                "max-age" => {
                    max_age_seen = true;
                    expired |= val.parse::<i64>().map(|age| age <= 0).unwrap_or(false);
                }
                // Max-Age takes precedence over Expires
                "expires" if !max_age_seen => {
                    if let Ok(when) = DateTime::parse_from_rfc2822(val) {
                        expired |= when.with_timezone(&Utc) <= Utc::now();
                    }
                }
                _ => {}
            }
        }

        Some(Self {
            name: name.to_string(),
            value,
            domain,
            secure,
            expired,
        })
    }
}
