//! Blueprint models: scripts, script attachments and cookbook versions.

use chrono::{DateTime, Utc};
use concerto_core::ids::{AttachmentId, CookbookVersionId, ScriptId};
use serde::{Deserialize, Serialize};

/// A reusable script that can be run on servers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Script {
    /// Script id.
    pub id: ScriptId,
    /// Script name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Script source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Names of the parameters the script expects.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Resource type reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Label ids attached to the script.
    #[serde(default)]
    pub label_ids: Vec<String>,
}

/// Body for `POST /blueprint/scripts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateScriptRequest {
    /// Script name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Script source.
    pub code: String,
    /// Parameter names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
}

/// Body for `PUT /blueprint/scripts/{id}`. Only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateScriptRequest {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// New parameter names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

/// A file attached to a script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    /// Attachment id.
    pub id: AttachmentId,
    /// File name.
    pub name: String,
    /// Whether the file content has been uploaded.
    #[serde(default)]
    pub uploaded: bool,
    /// Pre-signed URL to upload the content to (only on creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    /// Owning script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<ScriptId>,
    /// Resource type reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Body for `POST /blueprint/scripts/{id}/attachments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateAttachmentRequest {
    /// File name shown for the attachment.
    pub name: String,
}

/// Lifecycle of an uploaded cookbook version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CookbookVersionState {
    /// Placeholder created, content not processed yet.
    Pending,
    /// Content is being processed.
    Processing,
    /// Ready for use.
    Ready,
    /// Processing failed.
    Error,
    /// Anything this client does not know about.
    #[serde(other)]
    Unknown,
}

/// An uploaded Chef cookbook version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CookbookVersion {
    /// Cookbook version id.
    pub id: CookbookVersionId,
    /// Cookbook name, known once processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cookbook version, known once processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Processing state.
    pub state: CookbookVersionState,
    /// Revision id of the stored content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    /// Recipes found in the cookbook.
    #[serde(default)]
    pub recipes: Vec<String>,
    /// Pre-signed URL to upload the tarball to (only on creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    /// Processing error, when `state` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Resource type reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Body for `POST /blueprint/cookbook_versions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateCookbookVersionRequest {
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn script_defaults_missing_lists() {
        let script: Script = serde_json::from_value(json!({
            "id": "5aabb7521de0240abb000007",
            "name": "bootstrap"
        }))
        .unwrap();
        assert!(script.parameters.is_empty());
        assert!(script.label_ids.is_empty());
    }

    #[test]
    fn create_script_request_skips_empty_fields() {
        let request = CreateScriptRequest {
            name: "bootstrap".into(),
            code: "echo hi".into(),
            ..CreateScriptRequest::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "bootstrap", "code": "echo hi"})
        );
    }

    #[test]
    fn cookbook_state_tolerates_new_values() {
        let version: CookbookVersion = serde_json::from_value(json!({
            "id": "cb1",
            "state": "archived",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(version.state, CookbookVersionState::Unknown);
        assert!(version.created_at.is_some());
    }
}
