//! Response body classification
//!
//! The server answers with JSON when things go well and with an HTML page
//! when they do not, except that some informational pages are HTML too. Every
//! body is turned into an [`ApiResponse`] here, once; nothing downstream looks
//! at raw text again.

use crate::error::{CliError, Result};
use chrono::Utc;
use scraper::Html;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

pub const ERROR_KEY: &str = "DB_ACTION_ERROR";
pub const WARNING_KEY: &str = "DB_ACTION_WARNING";
pub const OUTPUT_KEY: &str = "DB_ACTION_OUTPUT";

/// Warning log used in quiet mode, relative to the working directory
pub const WARNING_LOG: &str = "warning.log";

const BANNER_MARKERS: [&str; 2] = ["Welcome", "-----"];
const EMPTY_PAGE: &str = "server returned an empty HTML page";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Plain JSON payload
    Json(Value),
    /// Payload accompanied by a non-fatal server warning
    Warning { message: String, payload: Value },
    /// Informational page, markup stripped
    Welcome(String),
    /// JSON string body
    Text(String),
    Empty,
}

impl ApiResponse {
    /// Structured payload, if any
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Json(value) | Self::Warning { payload: value, .. } => Some(value),
            _ => None,
        }
    }

    /// Consume into a JSON value; text bodies become JSON strings
    pub fn into_data(self) -> Option<Value> {
        match self {
            Self::Json(value) | Self::Warning { payload: value, .. } => Some(value),
            Self::Text(text) | Self::Welcome(text) => Some(Value::String(text)),
            Self::Empty => None,
        }
    }

    /// True when there is nothing usable in the response
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Json(value) | Self::Warning { payload: value, .. } => is_falsy(value),
            Self::Text(text) | Self::Welcome(text) => text.is_empty(),
            Self::Empty => true,
        }
    }

    /// Text written to stdout for this response
    pub fn render(&self) -> Result<String> {
        Ok(match self {
            Self::Json(value) | Self::Warning { payload: value, .. } => serde_json::to_string(value)?,
            Self::Welcome(text) | Self::Text(text) => text.clone(),
            Self::Empty => String::new(),
        })
    }
}

/// `null`, `false`, zero, and empty strings, arrays or objects
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Destination of server warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningSink {
    Stderr,
    File(PathBuf),
}

impl WarningSink {
    pub fn for_quiet(quiet: bool) -> Self {
        if quiet {
            Self::File(PathBuf::from(WARNING_LOG))
        } else {
            Self::Stderr
        }
    }

    pub fn emit(&self, message: &str) {
        match self {
            Self::Stderr => warn!("{}", message),
            Self::File(path) => {
                let written = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .and_then(|mut file| {
                        writeln!(file, "{} WARNING: {}", Utc::now().to_rfc3339(), message)
                    });
                if let Err(e) = written {
                    warn!(path = %path.display(), "Could not write warning log ({}): {}", e, message);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    sink: WarningSink,
}

impl ResponseClassifier {
    pub fn new(sink: WarningSink) -> Self {
        Self { sink }
    }

    /// Turn a response body into an [`ApiResponse`].
    ///
    /// `DB_ACTION_ERROR` and unrecognised HTML pages are `BadRequest` errors.
    /// A `DB_ACTION_WARNING` is reported to the sink and removed from the payload.
    pub fn classify(&self, body: &str) -> Result<ApiResponse> {
        if body.trim().is_empty() {
            return Ok(ApiResponse::Empty);
        }

        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(object)) => self.classify_object(object),
            Ok(Value::String(text)) => Ok(ApiResponse::Text(text)),
            Ok(value) => Ok(ApiResponse::Json(value)),
            Err(_) => classify_markup(body),
        }
    }

    fn classify_object(&self, mut object: Map<String, Value>) -> Result<ApiResponse> {
        if let Some(error) = object.get(ERROR_KEY) {
            return Err(CliError::bad_request(value_text(error)));
        }

        let warning = object.remove(WARNING_KEY).map(|w| value_text(&w));
        let payload = match object.remove(OUTPUT_KEY) {
            Some(output) => output,
            None => Value::Object(object),
        };

        Ok(match warning {
            Some(message) => {
                self.sink.emit(&message);
                ApiResponse::Warning { message, payload }
            }
            None => ApiResponse::Json(payload),
        })
    }
}

fn classify_markup(body: &str) -> Result<ApiResponse> {
    let text = strip_markup(body);
    if text.is_empty() {
        Err(CliError::bad_request(EMPTY_PAGE))
    } else if BANNER_MARKERS.iter().any(|marker| text.starts_with(marker)) {
        Ok(ApiResponse::Welcome(text))
    } else {
        Err(CliError::bad_request(text))
    }
}

/// Text content of an HTML document, trimmed
pub fn strip_markup(body: &str) -> String {
    Html::parse_document(body)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
