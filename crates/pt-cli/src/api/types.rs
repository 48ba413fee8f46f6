//! API request types
//!
//! Request payloads are built from typed structs and serialized once, right
//! before they are sent.

use crate::error::{CliError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Body of a POST request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Text passed through untouched (`--data`, `--data-file`, `--input-json`)
    Raw(String),
    Json(Value),
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Decode the body as JSON, naming `source` in the error
    pub fn to_value(&self, source: &str) -> Result<Value> {
        match self {
            Self::Raw(text) => {
                serde_json::from_str(text).map_err(|e| CliError::json_decode(source, e))
            }
            Self::Json(value) => Ok(value.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(text) => text.trim().is_empty(),
            Self::Json(value) => value.is_null(),
        }
    }
}

/// Sample/readset selection for the digest routes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DigestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readset_name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readset_id: Option<Vec<i64>>,
}

impl DigestFilter {
    /// True when at least one sample or readset selector is set
    pub fn has_selection(&self) -> bool {
        self.sample_name.is_some()
            || self.sample_id.is_some()
            || self.readset_name.is_some()
            || self.readset_id.is_some()
    }
}

/// Selection for `digest_unanalyzed`. Every key is sent, unset ones as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnanalyzedFilter {
    pub sample_name: bool,
    pub sample_id: bool,
    pub readset_name: bool,
    pub readset_id: bool,
    pub run_name: Option<String>,
    pub run_id: Option<String>,
    pub experiment_sequencing_technology: Option<String>,
    pub location_endpoint: Option<String>,
}

impl UnanalyzedFilter {
    pub fn has_selection(&self) -> bool {
        self.sample_name || self.sample_id || self.readset_name || self.readset_id
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Extra keys understood by the write routes. Only set flags are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "is_false")]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub cascade: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub cascade_up: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub cascade_down: bool,
}

impl RequestOptions {
    pub fn dry_run(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// `cascade` covers both directions, so it supersedes `cascade_up`/`cascade_down`.
    pub fn with_cascade(mut self, cascade: bool, cascade_up: bool, cascade_down: bool) -> Self {
        self.cascade = cascade;
        self.cascade_up = cascade_up && !cascade;
        self.cascade_down = cascade_down && !cascade;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User payload with the request options merged in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteRequest {
    #[serde(flatten)]
    pub input: Map<String, Value>,
    #[serde(flatten)]
    pub options: RequestOptions,
}

impl WriteRequest {
    /// Attach `options` to `body`.
    ///
    /// Without options the body is sent exactly as given. With options it must
    /// decode to a JSON object.
    pub fn build(body: RequestBody, options: RequestOptions, source: &str) -> Result<RequestBody> {
        if options.is_empty() {
            return Ok(body);
        }

        match body.to_value(source)? {
            Value::Object(input) => RequestBody::json(&Self { input, options }),
            _ => Err(CliError::bad_argument(format!(
                "{} must hold a JSON object to use --dry_run or --cascade options",
                source
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_filter_skips_unset() {
        let filter = DigestFilter {
            location_endpoint: Some("beluga".into()),
            sample_id: Some(vec![1, 3, 4, 5]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"location_endpoint": "beluga", "sample_id": [1, 3, 4, 5]})
        );
        assert!(filter.has_selection());
    }

    #[test]
    fn test_unanalyzed_filter_sends_nulls() {
        let filter = UnanalyzedFilter {
            sample_name: true,
            location_endpoint: Some("abacus".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "sample_name": true,
                "sample_id": false,
                "readset_name": false,
                "readset_id": false,
                "run_name": null,
                "run_id": null,
                "experiment_sequencing_technology": null,
                "location_endpoint": "abacus",
            })
        );
    }

    #[test]
    fn test_cascade_supersedes_directions() {
        let options = RequestOptions::default().with_cascade(true, true, true);
        assert_eq!(serde_json::to_value(options).unwrap(), json!({"cascade": true}));

        let options = RequestOptions::dry_run(true).with_cascade(false, false, true);
        assert_eq!(
            serde_json::to_value(options).unwrap(),
            json!({"dry_run": true, "cascade_down": true})
        );
    }

    #[test]
    fn test_write_request_merges_options() {
        let body = RequestBody::Raw(r#"{"modification": [{"table": "readset", "id": 3}]}"#.into());
        let options = RequestOptions::dry_run(true).with_cascade(true, false, false);

        let merged = WriteRequest::build(body, options, "--data").unwrap();
        assert_eq!(
            merged,
            RequestBody::Json(json!({
                "modification": [{"table": "readset", "id": 3}],
                "dry_run": true,
                "cascade": true,
            }))
        );
    }

    #[test]
    fn test_write_request_without_options_is_untouched() {
        let body = RequestBody::Raw("not even json".into());
        let same = WriteRequest::build(body.clone(), RequestOptions::default(), "--data").unwrap();
        assert_eq!(same, body);
    }

    #[test]
    fn test_write_request_bad_json() {
        let body = RequestBody::Raw("{oops".into());
        let err = WriteRequest::build(body, RequestOptions::dry_run(true), "run.json").unwrap_err();
        assert!(err.to_string().starts_with("JSONDecodeError in run.json"));
    }

    #[test]
    fn test_write_request_requires_object() {
        let body = RequestBody::Raw("[1, 2]".into());
        let err = WriteRequest::build(body, RequestOptions::dry_run(true), "--data").unwrap_err();
        assert!(matches!(err, CliError::BadArgument(_)));
    }
}
