//! `pt_cli ingest` commands

use super::input;
use crate::api::endpoints::{self, Ingest};
use crate::api::{RequestOptions, WriteRequest};
use crate::context::ProjectContext;
use crate::error::Result;
use crate::WriteArgs;
use std::io::Write;
use tracing::info;

/// Push a run processing, transfer, GenPipes or delivery record
pub async fn run(ctx: &mut ProjectContext, kind: Ingest, args: &WriteArgs, out: &mut dyn Write) -> Result<()> {
    let payload = input::resolve(ctx.data(), args.input_json.as_deref(), kind.as_str())?;
    let body = WriteRequest::build(payload.body, RequestOptions::dry_run(args.dry_run), &payload.source)?;

    let route = endpoints::ingest_path(ctx.project(), kind);
    if args.dry_run {
        info!(route = %route, "Dry run, nothing will be written");
    }
    let response = ctx.client().post(&route, &body).await?;

    write!(out, "{}", response.render()?)?;
    Ok(())
}
