//! Command polling client.

use crate::models::{Command, CommandResult};
use crate::Result;
use concerto_core::ids::CommandId;
use concerto_core::{AuthMode, Payload, ServiceClient, SessionConfig, StatusCheck};
use reqwest::StatusCode;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("concerto-agent/", env!("CARGO_PKG_VERSION"));

/// Client for the command polling endpoints.
#[derive(Debug, Clone)]
pub struct PollingClient {
    inner: ServiceClient,
}

impl PollingClient {
    /// Wrap an existing command polling session.
    #[must_use]
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Build a command polling session for `config`.
    ///
    /// Fails with `ConfigurationIncomplete` when the polling token or server
    /// id is missing.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let inner = ServiceClient::builder(config.clone(), AuthMode::CommandPolling)
            .with_user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner })
    }

    /// Tell the platform this agent is alive.
    pub async fn ping(&self) -> Result<()> {
        self.inner
            .post("/command_polling/pings", Some(&Payload::new()))
            .await?
            .check_status()
    }

    /// Fetch the next queued command, if any.
    ///
    /// An empty queue is answered with `204 No Content` or an empty body.
    pub async fn next_command(&self) -> Result<Option<Command>> {
        let response = self
            .inner
            .get("/command_polling/command", Some(&Payload::new()))
            .await?;
        let status = response.checked(StatusCheck::Enforce)?;

        if status == StatusCode::NO_CONTENT || response.body().iter().all(u8::is_ascii_whitespace)
        {
            debug!("No command queued");
            return Ok(None);
        }
        let command: Command = response.decode()?;
        info!(command = %command.id, "Command received");
        Ok(Some(command))
    }

    /// Report the outcome of a command.
    pub async fn report_result(&self, id: &CommandId, result: &CommandResult) -> Result<Command> {
        let path = format!("/command_polling/commands/{id}");
        let command = self.inner.put_json(&path, result).await?.into_inner();
        info!(command = %id, exit_code = result.exit_code, "Command result reported");
        Ok(command)
    }
}
