//! Request payload resolution shared by the commands

use crate::api::RequestBody;
use crate::error::{CliError, Result};
use std::path::Path;

const EITHER_INPUT: &str = "Either use --input-json OR general option --data/--data-file from pt_cli";

/// A request body and where it came from, for error messages
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: RequestBody,
    pub source: String,
}

impl Payload {
    pub fn new(body: RequestBody, source: impl Into<String>) -> Self {
        Self {
            body,
            source: source.into(),
        }
    }
}

/// Body given through the global `--data` or `--data-file` option. Empty text counts as absent.
pub fn global_data(data: Option<&str>, data_file: Option<&Path>) -> Result<Option<Payload>> {
    let payload = match (data, data_file) {
        (Some(text), _) => Payload::new(RequestBody::Raw(text.to_string()), "--data"),
        (None, Some(path)) => Payload::new(
            RequestBody::Raw(std::fs::read_to_string(path)?),
            path.display().to_string(),
        ),
        (None, None) => return Ok(None),
    };

    Ok((!payload.body.is_empty()).then_some(payload))
}

/// Contents of an `--input-json` file
pub fn read_input_json(path: &Path) -> Result<Payload> {
    let text = std::fs::read_to_string(path)?;
    Ok(Payload::new(RequestBody::Raw(text), path.display().to_string()))
}

/// Pick the body among the global data and `--input-json`. Exactly one must be given.
pub fn resolve(global: Option<&Payload>, input_json: Option<&Path>, command: &str) -> Result<Payload> {
    match (global, input_json) {
        (Some(_), Some(_)) => Err(CliError::bad_argument(EITHER_INPUT)),
        (Some(payload), None) => Ok(payload.clone()),
        (None, Some(path)) => read_input_json(path),
        (None, None) => Err(CliError::bad_argument(format!(
            "Data inputs is needed for the \"{}\" subcommand. {}",
            command, EITHER_INPUT
        ))),
    }
}

/// Like [`resolve`], but `None` when neither source is given
pub fn resolve_optional(global: Option<&Payload>, input_json: Option<&Path>) -> Result<Option<Payload>> {
    match (global, input_json) {
        (Some(_), Some(_)) => Err(CliError::bad_argument(EITHER_INPUT)),
        (Some(payload), None) => Ok(Some(payload.clone())),
        (None, Some(path)) => read_input_json(path).map(Some),
        (None, None) => Ok(None),
    }
}

/// Expand an id list: `"1,3-5"` gives `[1, 3, 4, 5]`.
///
/// Ranges are inclusive and may be written high to low.
pub fn unroll(list: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();

    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((first, last)) if !first.is_empty() => {
                let first = parse_id(first, list)?;
                let last = parse_id(last, list)?;
                ids.extend(first.min(last)..=first.max(last));
            }
            _ => ids.push(parse_id(part, list)?),
        }
    }

    Ok(ids)
}

/// Unroll every value of a repeated id option. `None` when the option was not given.
pub fn unroll_all(values: &[String]) -> Result<Option<Vec<i64>>> {
    if values.is_empty() {
        return Ok(None);
    }

    let mut ids = Vec::new();
    for value in values {
        ids.extend(unroll(value)?);
    }
    Ok(Some(ids))
}

fn parse_id(raw: &str, list: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::bad_argument(format!("'{}' in '{}' is not a valid id", raw.trim(), list)))
}
