//! Per-invocation state handed to every command

use crate::api::RouteClient;
use crate::commands::input::Payload;
use crate::error::Result;

/// The project being worked on, the client talking to its server, and the
/// global `--data`/`--data-file` body, if any.
pub struct ProjectContext {
    project: String,
    client: RouteClient,
    data: Option<Payload>,
}

impl ProjectContext {
    pub fn new(project: impl Into<String>, client: RouteClient, data: Option<Payload>) -> Self {
        Self {
            project: project.into(),
            client,
            data,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    pub fn client(&mut self) -> &mut RouteClient {
        &mut self.client
    }

    /// Save the session if this invocation changed it
    pub fn finish(&self) -> Result<()> {
        self.client.session().persist_if_changed()
    }
}
