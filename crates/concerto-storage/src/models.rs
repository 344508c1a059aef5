//! Storage data models for volumes.

use chrono::{DateTime, Utc};
use concerto_core::ids::{PlanId, ServerId, VolumeId};
use serde::{Deserialize, Serialize};

/// Query parameters supported by `/storage/volumes`.
#[derive(Debug, Default, Clone)]
pub struct VolumeListParams {
    /// Filter by storage plan.
    pub storage_plan_id: Option<PlanId>,
    /// Filter by the server the volume is attached to.
    pub attached_server_id: Option<ServerId>,
    /// Filter by label.
    pub label_id: Option<String>,
}

impl VolumeListParams {
    /// Convert the params into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(plan) = &self.storage_plan_id {
            pairs.push(("storage_plan_id", plan.to_string()));
        }
        if let Some(server) = &self.attached_server_id {
            pairs.push(("attached_server_id", server.to_string()));
        }
        if let Some(label) = &self.label_id {
            pairs.push(("label_id", label.clone()));
        }

        pairs
    }
}

/// Lifecycle state of a volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    /// Being created at the provider.
    Creating,
    /// Created and not attached.
    Detached,
    /// Being attached to a server.
    Attaching,
    /// Attached to a server.
    Attached,
    /// Being detached from its server.
    Detaching,
    /// Being removed.
    Decommissioning,
    /// The provider reported a failure.
    Error,
    /// Anything this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A block volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    /// Volume id.
    pub id: VolumeId,
    /// Volume name.
    pub name: String,
    /// Size in GiB.
    pub size: u64,
    /// Current state.
    pub state: VolumeState,
    /// Storage plan the volume was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_plan_id: Option<PlanId>,
    /// Server the volume is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_server_id: Option<ServerId>,
    /// Device name inside the server, once attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Provider-side volume id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_volume_id: Option<String>,
    /// Label ids attached to the volume.
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Resource type reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl Volume {
    /// Whether the volume is attached, or on its way to being attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached_server_id.is_some()
            || matches!(self.state, VolumeState::Attaching | VolumeState::Attached)
    }
}

/// Request body for creating a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateVolumeRequest {
    /// Volume name.
    pub name: String,
    /// Size in GiB.
    pub size: u64,
    /// Storage plan to create from.
    pub storage_plan_id: PlanId,
    /// Cloud account to create with.
    pub cloud_account_id: String,
}

/// Request body for updating a volume. Only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateVolumeRequest {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Request body for attaching a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct AttachVolumeRequest {
    pub(crate) attached_server_id: ServerId,
}
