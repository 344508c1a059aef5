//! Cloud models: servers and server plans.

use chrono::{DateTime, Utc};
use concerto_core::ids::{PlanId, ServerId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Registered but never booted.
    Commissioning,
    /// Stopped.
    Inactive,
    /// Booting.
    Booting,
    /// Running the bootstrap scripts.
    Bootstrapping,
    /// Up and configured.
    Operational,
    /// Shutting down.
    Stopping,
    /// Being removed.
    Decommissioning,
    /// Anything this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerState {
    /// Whether the server is up (booted or still configuring).
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Booting | Self::Bootstrapping | Self::Operational)
    }
}

/// A server as returned by the cloud endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    /// Server id.
    pub id: ServerId,
    /// Server name.
    pub name: String,
    /// Fully qualified domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Current state.
    pub state: ServerState,
    /// Public IP, once assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Template the server was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Plan the server runs on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_plan_id: Option<PlanId>,
    /// Cloud account used to provision the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,
    /// SSH profile ids applied to the server.
    #[serde(default)]
    pub ssh_profile_ids: Vec<String>,
    /// Firewall profile applied to the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_profile_id: Option<String>,
    /// Label ids attached to the server.
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Resource type reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Body for `POST /cloud/servers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateServerRequest {
    /// Server name.
    pub name: String,
    /// Template to build from.
    pub template_id: String,
    /// Plan to run on.
    pub server_plan_id: PlanId,
    /// Cloud account to provision with.
    pub cloud_account_id: String,
    /// SSH profiles to apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_profile_ids: Vec<String>,
    /// Firewall profile to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_profile_id: Option<String>,
    /// Subnet to attach to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// Body for `PUT /cloud/servers/{id}`. Only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateServerRequest {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New fully qualified domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

/// Size and location of servers provisioned from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerPlan {
    /// Plan id.
    pub id: PlanId,
    /// Plan name.
    pub name: String,
    /// Memory in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Number of CPUs (fractional for shared plans).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
    /// Root disk size in GiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<u64>,
    /// Location the plan provisions in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Cloud provider offering the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider_id: Option<String>,
    /// Provider-side flavour name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavour_name: Option<String>,
}
