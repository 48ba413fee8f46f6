//! `pt_cli help`, `pt_cli route` and `pt_cli projects`
//!
//! Thin wrappers writing the server answer to stdout.

use crate::api::endpoints;
use crate::context::ProjectContext;
use crate::error::Result;
use std::io::Write;
use tracing::debug;

/// List every route the server exposes
pub async fn help(ctx: &mut ProjectContext, out: &mut dyn Write) -> Result<()> {
    let response = ctx.client().get(endpoints::help_path()).await?;
    write!(out, "{}", response.render()?)?;
    Ok(())
}

/// Call any route: POST when global data is given, GET otherwise
pub async fn route(ctx: &mut ProjectContext, url: &str, out: &mut dyn Write) -> Result<()> {
    let route = endpoints::clean_route(url);
    let data = ctx.data().cloned();

    let response = match data {
        Some(payload) => {
            debug!("POST to {}", route);
            ctx.client().post(&route, &payload.body).await?
        }
        None => {
            debug!("GET from {}", route);
            ctx.client().get(&route).await?
        }
    };

    write!(out, "{}", response.render()?)?;
    Ok(())
}

/// List all projects
pub async fn projects(ctx: &mut ProjectContext, out: &mut dyn Write) -> Result<()> {
    let response = ctx.client().get(endpoints::projects_path()).await?;
    write!(out, "{}", response.render()?)?;
    Ok(())
}
