//! `pt_cli edit|delete|undelete|deprecate|undeprecate|curate`

use super::input;
use crate::api::endpoints::{self, Modification};
use crate::api::{RequestOptions, WriteRequest};
use crate::context::ProjectContext;
use crate::error::Result;
use crate::{CascadeArgs, WriteArgs};
use std::io::Write;
use tracing::info;

/// Apply a modification to database records
pub async fn run(
    ctx: &mut ProjectContext,
    op: Modification,
    args: &WriteArgs,
    cascade: Option<&CascadeArgs>,
    out: &mut dyn Write,
) -> Result<()> {
    let payload = input::resolve(ctx.data(), args.input_json.as_deref(), op.as_str())?;

    let mut options = RequestOptions::dry_run(args.dry_run);
    if let Some(cascade) = cascade.filter(|_| op.cascades()) {
        options = options.with_cascade(cascade.cascade, cascade.cascade_up, cascade.cascade_down);
    }
    let body = WriteRequest::build(payload.body, options, &payload.source)?;

    let route = endpoints::modification_path(ctx.project(), op);
    info!(operation = %op, dry_run = args.dry_run, "Sending modification");
    let response = ctx.client().post(&route, &body).await?;

    write!(out, "{}", response.render()?)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::RequestBody;
    use crate::commands::input::Payload;
    use crate::commands::test_support::context;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_delete_with_cascade() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/project/moh-q/modification/delete"))
            .and(body_json(json!({
                "modification": [{"table": "sample", "id": [4]}],
                "cascade": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"DB_ACTION_OUTPUT": "Deleted 1 sample"})))
            .expect(1)
            .mount(&server)
            .await;

        let data = Payload::new(
            RequestBody::Raw(r#"{"modification": [{"table": "sample", "id": [4]}]}"#.into()),
            "--data",
        );
        let (_dir, mut ctx) = context(&server, Some(data));
        let args = WriteArgs {
            input_json: None,
            dry_run: false,
        };
        let cascade = CascadeArgs {
            cascade: true,
            cascade_up: true,
            cascade_down: false,
        };

        let mut out: Vec<u8> = Vec::new();
        run(&mut ctx, Modification::Delete, &args, Some(&cascade), &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#""Deleted 1 sample""#);
    }

    #[tokio::test]
    async fn test_edit_sends_data_untouched() {
        let server = MockServer::start().await;
        let raw = r#"{"modification": [{"table": "readset", "column": "name", "new": "x"}]}"#;
        Mock::given(method("POST"))
            .and(path("/project/moh-q/modification/edit"))
            .and(wiremock::matchers::body_string(raw))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (_dir, mut ctx) = context(&server, Some(Payload::new(RequestBody::Raw(raw.into()), "--data")));
        let args = WriteArgs {
            input_json: None,
            dry_run: false,
        };
        run(&mut ctx, Modification::Edit, &args, None, &mut Vec::<u8>::new())
            .await
            .unwrap();
    }
}
