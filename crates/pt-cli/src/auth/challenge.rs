//! Identity provider login page detection and parsing

use crate::error::{CliError, Result};
use regex::Regex;
use url::Url;

/// Substring of the effective URL that marks a login redirect
pub const REDIRECT_MARKER: &str = "redirect_uri";

/// Query parameters the login form must carry
pub const CHALLENGE_PARAMS: [&str; 4] = ["session_code", "execution", "client_id", "tab_id"];

/// True when a response ended up on the identity provider instead of the API
pub fn is_challenge(effective_url: &Url) -> bool {
    effective_url.as_str().contains(REDIRECT_MARKER)
}

/// Login form parameters recovered from a challenge page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginChallenge {
    pub session_code: String,
    pub execution: String,
    pub client_id: String,
    pub tab_id: String,
    /// Form target, without its query string
    pub post_url: String,
}

impl LoginChallenge {
    /// Parse a challenge page.
    ///
    /// Parameters are read from the form `action` URL when the page has one,
    /// otherwise from anywhere in the body. Every parameter and the post URL
    /// must be found.
    pub fn extract(body: &str) -> Result<Self> {
        let action_re = Regex::new(r#"action\s*=\s*["'](https?://[^"']+)["']"#)
            .map_err(anyhow::Error::from)?;
        let bare_url_re = Regex::new(r#"(https?://[^?"'\s<>]+)\?"#).map_err(anyhow::Error::from)?;

        let action = action_re
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace("&amp;", "&"));

        let (scope, post_url) = match action {
            Some(ref action) => {
                let target = action.split('?').next().unwrap_or(action).to_string();
                (action.as_str(), Some(target))
            }
            None => (
                body,
                bare_url_re
                    .captures(body)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            ),
        };

        let [session_code, execution, client_id, tab_id] = CHALLENGE_PARAMS;
        Ok(Self {
            session_code: find_param(scope, session_code)?,
            execution: find_param(scope, execution)?,
            client_id: find_param(scope, client_id)?,
            tab_id: find_param(scope, tab_id)?,
            post_url: post_url
                .filter(|u| !u.is_empty())
                .ok_or_else(|| CliError::malformed_challenge("no login form URL"))?,
        })
    }

    /// Query string pairs for the login submission
    pub fn query(&self) -> [(&'static str, &str); 4] {
        [
            ("session_code", self.session_code.as_str()),
            ("execution", self.execution.as_str()),
            ("client_id", self.client_id.as_str()),
            ("tab_id", self.tab_id.as_str()),
        ]
    }
}

fn find_param(haystack: &str, key: &str) -> Result<String> {
    let re = Regex::new(&format!(r#"\b{}=([^&"'<>\s]+)"#, regex::escape(key)))
        .map_err(anyhow::Error::from)?;
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| CliError::malformed_challenge(format!("missing '{}'", key)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const KEYCLOAK_PAGE: &str = r#"<html><body>
<form id="kc-form-login" onsubmit="login.disabled = true; return true;"
      action="https://idp.example.org/realms/c3g/login-actions/authenticate?session_code=SC1&amp;execution=EX2&amp;client_id=pt-proxy&amp;tab_id=TB3" method="post">
  <input id="username" name="username" type="text"/>
  <input id="password" name="password" type="password"/>
</form>
<a href="https://idp.example.org/realms/c3g/login-actions/reset-credentials?client_id=other&amp;tab_id=zzz">Forgot?</a>
</body></html>"#;

    #[test]
    fn test_extract_from_form_action() {
        let challenge = LoginChallenge::extract(KEYCLOAK_PAGE).unwrap();
        assert_eq!(
            challenge,
            LoginChallenge {
                session_code: "SC1".into(),
                execution: "EX2".into(),
                client_id: "pt-proxy".into(),
                tab_id: "TB3".into(),
                post_url: "https://idp.example.org/realms/c3g/login-actions/authenticate".into(),
            }
        );
    }

    #[test]
    fn test_extract_from_plain_text() {
        let body = "session_code=X&execution=Y&client_id=Z&tab_id=W&foo https://host/path?a=b";
        let challenge = LoginChallenge::extract(body).unwrap();
        assert_eq!(challenge.session_code, "X");
        assert_eq!(challenge.execution, "Y");
        assert_eq!(challenge.client_id, "Z");
        assert_eq!(challenge.tab_id, "W");
        assert_eq!(challenge.post_url, "https://host/path");
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = "session_code=X&execution=Y&client_id=Z https://host/path?";
        let err = LoginChallenge::extract(body).unwrap_err();
        assert!(matches!(err, CliError::MalformedChallenge(ref m) if m.contains("tab_id")));
    }

    #[test]
    fn test_missing_url_is_malformed() {
        let body = "session_code=X&execution=Y&client_id=Z&tab_id=W&";
        assert!(matches!(
            LoginChallenge::extract(body),
            Err(CliError::MalformedChallenge(_))
        ));
    }

    #[test]
    fn test_query_pairs_keep_order() {
        let challenge = LoginChallenge::extract(KEYCLOAK_PAGE).unwrap();
        let keys: Vec<_> = challenge.query().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, CHALLENGE_PARAMS);
    }

    #[test]
    fn test_is_challenge() {
        let login = Url::parse("https://idp.example.org/auth?redirect_uri=https%3A%2F%2Fpt").unwrap();
        let api = Url::parse("https://pt.example.org/projects").unwrap();
        assert!(is_challenge(&login));
        assert!(!is_challenge(&api));
    }
}
