//! Login credentials

use crate::error::{CliError, Result};
use std::fmt;
use std::io::IsTerminal;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Form body of the login submission
    pub fn form(&self) -> [(&'static str, &str); 3] {
        [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("credentialId", ""),
        ]
    }
}

/// Where credentials come from
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    preset: Option<Credentials>,
    interactive: bool,
}

impl CredentialSource {
    /// Use `user`/`password` when both are configured, and prompt when stdin is a terminal
    pub fn new(user: Option<String>, password: Option<String>) -> Self {
        let preset = match (user, password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        };
        Self {
            preset,
            interactive: std::io::stdin().is_terminal(),
        }
    }

    pub fn preset(credentials: Credentials) -> Self {
        Self {
            preset: Some(credentials),
            interactive: false,
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Credentials for login attempt number `attempt` (1-based).
    ///
    /// Preset credentials are only tried once; a retry means they were rejected.
    pub async fn resolve(&self, attempt: u32) -> Result<Credentials> {
        if attempt == 1 {
            if let Some(ref credentials) = self.preset {
                return Ok(credentials.clone());
            }
        }

        if !self.interactive {
            return Err(CliError::auth_failed(if self.preset.is_some() {
                "configured credentials were rejected"
            } else {
                "no user/password configured and stdin is not a terminal"
            }));
        }

        tokio::task::spawn_blocking(prompt)
            .await
            .map_err(|e| anyhow::anyhow!("Credential prompt task panicked: {}", e))?
    }
}

fn prompt() -> Result<Credentials> {
    use inquire::{Password, PasswordDisplayMode, Text};

    let username = Text::new("Username:").prompt()?;
    let password = Password::new("Password:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Hidden)
        .prompt()?;

    Ok(Credentials::new(username, password))
}
