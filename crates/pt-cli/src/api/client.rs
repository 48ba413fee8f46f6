//! HTTP client for the project tracking API
//!
//! Every request carries the session cookies. When a response lands on the
//! identity provider instead of the API, the client logs in and replays the
//! request, at most `max_auth_attempts` times.

use crate::api::classifier::{ApiResponse, ResponseClassifier, WarningSink};
use crate::api::endpoints;
use crate::api::types::RequestBody;
use crate::auth::{is_challenge, Authenticator, CredentialSource};
use crate::config::{DEFAULT_MAX_AUTH_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
use crate::error::{CliError, Result};
use crate::progress::Progress;
use crate::session::SessionContext;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Client settings that do not come from the session
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_auth_attempts: u32,
    pub credentials: CredentialSource,
    pub warnings: WarningSink,
    pub progress: Progress,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            credentials: CredentialSource::default(),
            warnings: WarningSink::Stderr,
            progress: Progress::disabled(),
        }
    }
}

pub struct RouteClient {
    http: Client,
    session: SessionContext,
    auth: Authenticator,
    classifier: ResponseClassifier,
    progress: Progress,
    max_auth_attempts: u32,
}

impl RouteClient {
    /// Create a client bound to `session`
    pub fn new(session: SessionContext, options: ClientOptions) -> Result<Self> {
        let http = Client::builder()
            .cookie_provider(session.jar())
            .timeout(options.timeout)
            .user_agent(concat!("pt_cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            auth: Authenticator::new(http.clone(), options.credentials),
            http,
            session,
            classifier: ResponseClassifier::new(options.warnings),
            progress: options.progress,
            max_auth_attempts: options.max_auth_attempts,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// GET a route
    pub async fn get(&mut self, route: &str) -> Result<ApiResponse> {
        self.request(Method::GET, route, None).await
    }

    /// POST `body` to a route
    pub async fn post(&mut self, route: &str, body: &RequestBody) -> Result<ApiResponse> {
        self.request(Method::POST, route, Some(body)).await
    }

    async fn request(
        &mut self,
        method: Method,
        route: &str,
        body: Option<&RequestBody>,
    ) -> Result<ApiResponse> {
        let url = endpoints::route_url(self.session.base_url(), route);
        let mut attempts = 0;

        loop {
            let reply = self.send(&method, &url, body).await?;

            if !is_challenge(&reply.url) {
                if (reply.status.is_client_error() || reply.status.is_server_error())
                    && reply.body.trim().is_empty()
                {
                    return Err(CliError::bad_request(format!("{} {} returned {}", method, route, reply.status)));
                }
                return self.classifier.classify(&reply.body);
            }

            if attempts >= self.max_auth_attempts {
                return Err(self.auth.reject(attempts));
            }
            attempts += 1;

            info!(route, attempt = attempts, "Authentication required");
            self.auth.authenticate(&reply.body, &self.session).await?;
            // A challenged request never reached the API.
            debug!(%method, route, "Replaying request");
        }
    }

    async fn send(&self, method: &Method, url: &str, body: Option<&RequestBody>) -> Result<Reply> {
        let mut request = self.http.request(method.clone(), url);
        request = match body {
            Some(RequestBody::Raw(text)) => request.body(text.clone()),
            Some(RequestBody::Json(value)) => request.json(value),
            None => request,
        };

        let spinner = self.progress.start(&format!("{} {}", method, url));
        let response = request.send().await;
        spinner.finish_and_clear();
        let response = response?;

        let status = response.status();
        let effective = response.url().clone();
        debug!(%method, %url, %status, effective = %effective, "Response received");

        Ok(Reply {
            status,
            url: effective,
            body: response.text().await?,
        })
    }
}

struct Reply {
    status: reqwest::StatusCode,
    url: Url,
    body: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{AuthState, Credentials};
    use crate::session::SessionStore;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(dir: &TempDir, server: &MockServer, credentials: CredentialSource) -> RouteClient {
        let session = SessionContext::open(SessionStore::new(dir.path().join(".pt_cli")), &server.uri());
        RouteClient::new(
            session,
            ClientOptions {
                credentials,
                ..ClientOptions::default()
            },
        )
        .unwrap()
    }

    fn preset() -> CredentialSource {
        CredentialSource::preset(Credentials::new("jane", "pw"))
    }

    async fn mount_login_flow(server: &MockServer, verb: &str, route: &str, set_cookie: Option<&str>) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/auth?redirect_uri=back", server.uri())),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<form action="{}/login-actions/authenticate?session_code=S&amp;execution=E&amp;client_id=C&amp;tab_id=T"></form>"#,
                server.uri()
            )))
            .mount(server)
            .await;

        let login = ResponseTemplate::new(200);
        let login = match set_cookie {
            Some(cookie) => login.insert_header("set-cookie", cookie),
            None => login,
        };
        Mock::given(method("POST"))
            .and(path("/login-actions/authenticate"))
            .respond_with(login)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_get_classifies_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "moh-q"}])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let response = client.get("projects").await.unwrap();
        assert_eq!(response, ApiResponse::Json(json!([{"name": "moh-q"}])));
        assert_eq!(client.authenticator().logins(), 0);
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/project/moh-q/digest_pair_file"))
            .and(body_json(json!({"location_endpoint": "beluga"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let body = RequestBody::Json(json!({"location_endpoint": "beluga"}));
        let response = client.post("project/moh-q/digest_pair_file", &body).await.unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_redirect_triggers_login_and_replay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("cookie", "_oauth2_proxy=tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"DB_ACTION_OUTPUT": ["moh-q"]})),
            )
            .with_priority(1)
            .mount(&server)
            .await;
        mount_login_flow(&server, "GET", "/projects", Some("_oauth2_proxy=tok; Path=/")).await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let response = client.get("projects").await.unwrap();

        assert_eq!(response, ApiResponse::Json(json!(["moh-q"])));
        assert_eq!(client.authenticator().state(), AuthState::Authenticated);
        assert_eq!(client.authenticator().logins(), 1);

        let saved = SessionStore::new(dir.path().join(".pt_cli")).load().unwrap();
        assert!(saved.cookies.values().any(|jar| jar.contains_key("_oauth2_proxy")));
    }

    #[tokio::test]
    async fn test_post_replayed_with_body_after_login() {
        let server = MockServer::start().await;
        let route = "/project/moh-q/ingest_run_processing";
        let body = json!({"run_name": "RUN1", "readsets": ["S1_RS1"]});
        Mock::given(method("POST"))
            .and(path(route))
            .and(header("cookie", "_oauth2_proxy=tok"))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"DB_ACTION_OUTPUT": [{"id": 7}]})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        mount_login_flow(&server, "POST", route, Some("_oauth2_proxy=tok; Path=/")).await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let response = client
            .post("project/moh-q/ingest_run_processing", &RequestBody::Json(body))
            .await
            .unwrap();

        assert_eq!(response, ApiResponse::Json(json!([{"id": 7}])));
        assert_eq!(client.authenticator().logins(), 1);
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_after_bounded_retries() {
        let server = MockServer::start().await;
        mount_login_flow(&server, "GET", "/projects", None).await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let err = client.get("projects").await.unwrap_err();

        assert!(matches!(err, CliError::AuthenticationFailed(_)));
        assert_eq!(client.authenticator().state(), AuthState::Failed);
        assert_eq!(client.authenticator().logins(), 1);
    }

    #[tokio::test]
    async fn test_empty_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/help"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = client(&dir, &server, preset());
        let err = client.get("help").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
