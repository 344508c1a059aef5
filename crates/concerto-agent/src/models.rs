//! Agent data models for command polling and brownfield import.

use chrono::{DateTime, Utc};
use concerto_core::ids::{CommandId, ServerId};
use serde::{Deserialize, Serialize};

/// A script queued for the agent to run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    /// Command id.
    pub id: CommandId,
    /// Shell script to execute.
    pub script: String,
    /// Parameters exported as environment variables.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Seconds the command may run before it is killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Outcome of a command, reported back once it has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResult {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// When the command started.
    pub started_at: DateTime<Utc>,
    /// When the command finished.
    pub finished_at: DateTime<Utc>,
}

impl CommandResult {
    /// Whether the command exited cleanly.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Import settings the brownfield agent runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrownfieldSettings {
    /// Cloud account the import runs against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,
    /// Whether to also import volumes.
    #[serde(default)]
    pub import_volumes: bool,
    /// Whether to also import firewall rules.
    #[serde(default)]
    pub import_firewall: bool,
}

/// A server as seen by the brownfield agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterServerRequest {
    /// Provider-side instance id.
    pub provider_id: String,
    /// Host name.
    pub name: String,
    /// Fully qualified domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Public IP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Private IP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

/// A server record created or matched by a brownfield registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportedServer {
    /// Concerto server id.
    pub id: ServerId,
    /// Provider-side instance id.
    pub provider_id: String,
    /// Host name.
    pub name: String,
    /// Current server state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
