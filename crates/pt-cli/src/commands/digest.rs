//! `pt_cli digest` commands
//!
//! Read-only queries whose answers are written as GenPipes manifests or JSON.

use super::input::{self, Payload};
use crate::api::endpoints::{self, Digest};
use crate::api::{ApiResponse, DigestFilter, RequestBody, UnanalyzedFilter};
use crate::context::ProjectContext;
use crate::error::{CliError, Result};
use crate::manifest::ManifestKind;
use crate::{DeliveryArgs, PairFileArgs, ReadsetFileArgs, SelectionArgs, UnanalyzedArgs};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

const SELECTION_REQUIRED: &str =
    "Either use --input-json OR --sample_<name|id>/--readset_<name|id> + --endpoint arguments.";

/// Write a GenPipes readset file
pub async fn readset_file(ctx: &mut ProjectContext, args: &ReadsetFileArgs) -> Result<()> {
    let payload = selection_payload(ctx.data(), &args.selection)?;
    let response = post(ctx, Digest::ReadsetFile, &payload).await?;
    let rows = expect_rows(response)?;
    ManifestKind::Readset.save(&rows, &args.output)?;
    Ok(())
}

/// Write a GenPipes pair file
pub async fn pair_file(ctx: &mut ProjectContext, args: &PairFileArgs) -> Result<()> {
    let payload = selection_payload(ctx.data(), &args.selection)?;

    let selection = payload.body.to_value(&payload.source)?;
    for message in odd_selection_warnings(&selection) {
        warn!("{}", message);
    }

    let response = post(ctx, Digest::PairFile, &payload).await?;
    let rows = expect_rows(response)?;
    ManifestKind::Pair.save(&rows, &args.output)?;
    Ok(())
}

/// Report samples or readsets that were never analyzed
pub async fn unanalyzed(ctx: &mut ProjectContext, args: &UnanalyzedArgs, out: &mut dyn Write) -> Result<()> {
    let payload = match ctx.data() {
        Some(payload) => payload.clone(),
        None => Payload::new(RequestBody::json(&unanalyzed_filter(args)?)?, "command line"),
    };

    let response = post(ctx, Digest::Unanalyzed, &payload).await?;
    emit_json(response, args.output.as_deref(), "Unanalyzed", out)
}

/// Report delivery information for the selected samples or readsets
pub async fn delivery(ctx: &mut ProjectContext, args: &DeliveryArgs, out: &mut dyn Write) -> Result<()> {
    let payload = selection_payload(ctx.data(), &args.selection)?;
    let response = post(ctx, Digest::Delivery, &payload).await?;
    emit_json(response, args.output.as_deref(), "Delivery", out)
}

async fn post(ctx: &mut ProjectContext, digest: Digest, payload: &Payload) -> Result<ApiResponse> {
    let route = endpoints::digest_path(ctx.project(), digest);
    debug!(route = %route, source = %payload.source, "Posting digest request");
    ctx.client().post(&route, &payload.body).await
}

/// Body for the selection-based digests: global data, `--input-json`, or the selectors
pub fn selection_payload(global: Option<&Payload>, args: &SelectionArgs) -> Result<Payload> {
    if let Some(payload) = input::resolve_optional(global, args.input_json.as_deref())? {
        if has_selectors(args) {
            warn!("Sample/readset selectors are ignored when a JSON input is given");
        }
        return Ok(payload);
    }

    let filter = digest_filter(args)?;
    if !filter.has_selection() || filter.location_endpoint.is_none() {
        return Err(CliError::bad_argument(SELECTION_REQUIRED));
    }
    Ok(Payload::new(RequestBody::json(&filter)?, "command line"))
}

/// Filter built from the selector flags
pub fn digest_filter(args: &SelectionArgs) -> Result<DigestFilter> {
    Ok(DigestFilter {
        location_endpoint: args.endpoint.clone(),
        sample_name: non_empty(&args.sample_name),
        sample_id: input::unroll_all(&args.sample_id)?,
        readset_name: non_empty(&args.readset_name),
        readset_id: input::unroll_all(&args.readset_id)?,
    })
}

fn unanalyzed_filter(args: &UnanalyzedArgs) -> Result<UnanalyzedFilter> {
    let filter = UnanalyzedFilter {
        sample_name: args.sample_name,
        sample_id: args.sample_id,
        readset_name: args.readset_name,
        readset_id: args.readset_id,
        run_name: args.run_name.clone(),
        run_id: args.run_id.clone(),
        experiment_sequencing_technology: args.experiment_sequencing_technology.clone(),
        location_endpoint: args.endpoint.clone(),
    };

    if !filter.has_selection() {
        return Err(CliError::bad_argument(
            "Use at least one of the following --sample_<name|id>/--readset_<name|id> argument.",
        ));
    }
    if filter.location_endpoint.is_none() {
        return Err(CliError::bad_argument("--endpoint is required for \"unanalyzed\""));
    }
    Ok(filter)
}

/// Pair files pair samples two by two; an odd selection cannot be paired.
pub fn odd_selection_warnings(selection: &Value) -> Vec<String> {
    ["sample_name", "sample_id", "readset_name", "readset_id"]
        .iter()
        .filter(|key| {
            selection
                .get(**key)
                .and_then(Value::as_array)
                .is_some_and(|values| values.len() % 2 == 1)
        })
        .map(|key| {
            format!(
                "An odd amount of '{}' has been given, the pair file won't be properly formatted for GenPipes!",
                key
            )
        })
        .collect()
}

fn expect_rows(response: ApiResponse) -> Result<Value> {
    if response.is_empty() {
        return Err(CliError::empty_response(None));
    }
    response.into_data().ok_or_else(|| CliError::empty_response(None))
}

fn emit_json(response: ApiResponse, output: Option<&Path>, label: &str, out: &mut dyn Write) -> Result<()> {
    let Some(path) = output else {
        write!(out, "{}", response.render()?)?;
        return Ok(());
    };

    let data = expect_rows(response)?;
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &data)?;
    writer.flush()?;
    info!("{} file written to {}", label, path.display());
    Ok(())
}

fn has_selectors(args: &SelectionArgs) -> bool {
    !(args.sample_name.is_empty()
        && args.sample_id.is_empty()
        && args.readset_name.is_empty()
        && args.readset_id.is_empty())
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
