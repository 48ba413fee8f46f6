//! Error types for the project tracking CLI
//!
//! Every variant renders as a single user-facing line. `main` prints it and
//! exits; nothing is retried except the authentication replay in
//! [`crate::api::RouteClient`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// The identity provider login page did not contain the expected form
    #[error("Unrecognized login page: {0}. The identity provider page format may have changed.")]
    MalformedChallenge(String),

    /// Credentials were rejected or could not be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server reported `DB_ACTION_ERROR` or answered with an error page
    #[error("BadRequestError: {0}")]
    BadRequest(String),

    /// The server returned nothing where data was expected
    #[error("EmptyResponseError: {0}")]
    EmptyResponse(String),

    /// Missing or mutually exclusive command-line inputs
    #[error("BadArgumentError: {0}")]
    BadArgument(String),

    /// User supplied JSON could not be decoded
    #[error("JSONDecodeError in {source_name}: {error}")]
    JsonDecode {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },

    /// Session file exists but cannot be used
    #[error("Corrupt session file '{}': {reason}", .path.display())]
    CorruptSession { path: PathBuf, reason: String },

    /// No session file at the given path
    #[error("Session file not found: '{}'", .0.display())]
    SessionNotFound(PathBuf),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check ~/.config/pt_cli/connect.yaml or ./connect.yaml.")]
    Config(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your connection and --url-root.")]
    Http(#[from] reqwest::Error),

    /// YAML parsing failed
    #[error("Failed to parse YAML: {0}. Check the file syntax at the indicated line/column.")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed outside of user input
    #[error("Failed to process JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Writing a delimited manifest failed
    #[error("Failed to write delimited file: {0}")]
    Csv(#[from] csv::Error),

    /// Interactive prompt failed or was cancelled
    #[error("Prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a bad argument error
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        Self::BadArgument(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication failure
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a malformed challenge error
    pub fn malformed_challenge(msg: impl Into<String>) -> Self {
        Self::MalformedChallenge(msg.into())
    }

    /// Create an empty response error, defaulting to the usual explanation
    pub fn empty_response(msg: Option<&str>) -> Self {
        Self::EmptyResponse(
            msg.unwrap_or("Database returned nothing, it's most likely unreachable")
                .to_string(),
        )
    }

    /// Wrap a JSON decoding failure with where the text came from
    pub fn json_decode(source_name: impl Into<String>, error: serde_json::Error) -> Self {
        Self::JsonDecode {
            source_name: source_name.into(),
            error,
        }
    }

    /// Create a corrupt session error
    pub fn corrupt_session(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptSession {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code: usage problems exit 2, everything else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BadArgument(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_single_line() {
        let errors = vec![
            CliError::bad_request("No project named foo"),
            CliError::empty_response(None),
            CliError::bad_argument("Either use --input-json OR --data"),
            CliError::corrupt_session("/tmp/.pt_cli", "unsupported version 7"),
        ];

        for err in errors {
            assert!(!err.to_string().contains('\n'), "{}", err);
        }
    }

    #[test]
    fn test_json_decode_names_source() {
        let parse = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CliError::json_decode("run.json", parse);
        let msg = err.to_string();
        assert!(msg.starts_with("JSONDecodeError in run.json"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::bad_argument("x").exit_code(), 2);
        assert_eq!(CliError::bad_request("x").exit_code(), 1);
        assert_eq!(CliError::auth_failed("x").exit_code(), 1);
    }

    #[test]
    fn test_default_empty_response_message() {
        assert_eq!(
            CliError::empty_response(None).to_string(),
            "EmptyResponseError: Database returned nothing, it's most likely unreachable"
        );
    }
}
