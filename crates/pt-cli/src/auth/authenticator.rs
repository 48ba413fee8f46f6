//! Login exchange against the identity provider
//!
//! The authenticator walks `Unauthenticated -> ChallengeDetected ->
//! CredentialsResolved -> Authenticated`. A rejected password is not visible
//! in the login response itself; the caller notices it when the replayed
//! request lands on the challenge again and reports it through
//! [`Authenticator::reject`].

use super::challenge::LoginChallenge;
use super::credentials::CredentialSource;
use crate::error::{CliError, Result};
use crate::session::SessionContext;
use reqwest::Client;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    ChallengeDetected,
    CredentialsResolved,
    Authenticated,
    Failed,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ChallengeDetected => "challenge-detected",
            Self::CredentialsResolved => "credentials-resolved",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct Authenticator {
    http: Client,
    credentials: CredentialSource,
    state: AuthState,
    logins: u32,
}

impl Authenticator {
    pub fn new(http: Client, credentials: CredentialSource) -> Self {
        Self {
            http,
            credentials,
            state: AuthState::Unauthenticated,
            logins: 0,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Logins submitted so far by this process
    pub fn logins(&self) -> u32 {
        self.logins
    }

    /// Answer the challenge page `page` and store the resulting session.
    pub async fn authenticate(&mut self, page: &str, session: &SessionContext) -> Result<()> {
        self.transition(AuthState::ChallengeDetected);

        let challenge = LoginChallenge::extract(page).inspect_err(|_| self.transition(AuthState::Failed))?;
        debug!(post_url = %challenge.post_url, client_id = %challenge.client_id, "Parsed login challenge");

        let credentials = match self.credentials.resolve(self.logins + 1).await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.transition(AuthState::Failed);
                return Err(e);
            }
        };
        self.transition(AuthState::CredentialsResolved);

        self.logins += 1;
        info!(user = %credentials.username, "Logging in");
        let response = self
            .http
            .post(&challenge.post_url)
            .query(&challenge.query())
            .form(&credentials.form())
            .send()
            .await?;

        let status = response.status();
        debug!(%status, url = %response.url(), "Login submitted");
        if status.is_client_error() || status.is_server_error() {
            self.transition(AuthState::Failed);
            return Err(CliError::auth_failed(format!(
                "identity provider answered {} to the login",
                status
            )));
        }

        self.transition(AuthState::Authenticated);
        if let Err(e) = session.persist() {
            warn!("Could not save session: {}", e);
        }
        Ok(())
    }

    /// The replayed request was challenged again after the last allowed login
    pub fn reject(&mut self, attempts: u32) -> CliError {
        self.transition(AuthState::Failed);
        CliError::auth_failed(format!(
            "still redirected to the login page after {} attempt(s); check your user and password",
            attempts
        ))
    }

    fn transition(&mut self, next: AuthState) {
        debug!(from = %self.state, to = %next, "Authentication state");
        self.state = next;
    }
}
