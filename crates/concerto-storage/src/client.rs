//! Asynchronous storage client implementation.

use crate::models::{
    AttachVolumeRequest, CreateVolumeRequest, UpdateVolumeRequest, Volume, VolumeListParams,
};
use crate::Result;
use concerto_core::ids::{ServerId, VolumeId};
use concerto_core::{AuthMode, ServiceClient, SessionConfig};
use tracing::info;
use url::form_urlencoded;

const USER_AGENT: &str = concat!("concerto-storage/", env!("CARGO_PKG_VERSION"));

/// Asynchronous client for the storage endpoints.
#[derive(Debug, Clone)]
pub struct StorageClient {
    inner: ServiceClient,
}

impl StorageClient {
    /// Wrap an existing session.
    #[must_use]
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Build a certificate-authenticated session for `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let inner = ServiceClient::builder(config.clone(), AuthMode::Certificate)
            .with_user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner })
    }

    /// List volumes.
    pub async fn list_volumes(&self, params: &VolumeListParams) -> Result<Vec<Volume>> {
        let path = with_query("/storage/volumes", &params.to_pairs());
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Fetch a volume.
    pub async fn get_volume(&self, id: &VolumeId) -> Result<Volume> {
        let path = format!("/storage/volumes/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Create a volume.
    pub async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
        Ok(self
            .inner
            .post_json("/storage/volumes", request)
            .await?
            .into_inner())
    }

    /// Update a volume.
    pub async fn update_volume(
        &self,
        id: &VolumeId,
        request: &UpdateVolumeRequest,
    ) -> Result<Volume> {
        let path = format!("/storage/volumes/{id}");
        Ok(self.inner.put_json(&path, request).await?.into_inner())
    }

    /// Attach a volume to a server.
    pub async fn attach_volume(&self, id: &VolumeId, server: &ServerId) -> Result<Volume> {
        let path = format!("/storage/volumes/{id}/attached_server");
        let request = AttachVolumeRequest {
            attached_server_id: server.clone(),
        };
        let volume: Volume = self.inner.post_json(&path, &request).await?.into_inner();
        info!(volume = %id, server = %server, "Volume attach requested");
        Ok(volume)
    }

    /// Detach a volume from its server.
    pub async fn detach_volume(&self, id: &VolumeId) -> Result<()> {
        let path = format!("/storage/volumes/{id}/attached_server");
        self.inner.delete_checked(&path).await?;
        info!(volume = %id, "Volume detach requested");
        Ok(())
    }

    /// Delete a volume.
    pub async fn delete_volume(&self, id: &VolumeId) -> Result<()> {
        let path = format!("/storage/volumes/{id}");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// Drop the volume record while leaving the provider-side volume alone.
    pub async fn discard_volume(&self, id: &VolumeId) -> Result<()> {
        let path = format!("/storage/volumes/{id}/discard");
        self.inner.delete_checked(&path).await.map(|_| ())
    }
}

fn with_query(path: &str, pairs: &[(&'static str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())))
        .finish();
    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VolumeState;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StorageClient {
        let config = SessionConfig::new(server.uri()).with_brownfield_token("bf");
        StorageClient::new(ServiceClient::new(&config, AuthMode::Brownfield).unwrap())
    }

    #[test]
    fn query_is_encoded() {
        let pairs = vec![("label_id", "a b".to_string())];
        assert_eq!(
            with_query("/storage/volumes", &pairs),
            "/storage/volumes?label_id=a+b"
        );
        assert_eq!(with_query("/storage/volumes", &[]), "/storage/volumes");
    }

    #[tokio::test]
    async fn list_volumes_with_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/volumes"))
            .and(query_param("attached_server_id", "s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "v1", "name": "data", "size": 20, "state": "attached", "attached_server_id": "s1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let params = VolumeListParams {
            attached_server_id: Some(ServerId::parse("s1").unwrap()),
            ..VolumeListParams::default()
        };
        let volumes = client(&server).list_volumes(&params).await.unwrap();
        assert_eq!(volumes.len(), 1);
        assert!(volumes[0].is_attached());
    }

    #[tokio::test]
    async fn attach_volume_posts_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/volumes/v1/attached_server"))
            .and(body_json(json!({"attached_server_id": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "v1", "name": "data", "size": 20, "state": "attaching",
                "attached_server_id": "s1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let volume = client(&server)
            .attach_volume(
                &VolumeId::parse("v1").unwrap(),
                &ServerId::parse("s1").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(volume.state, VolumeState::Attaching);
    }

    #[tokio::test]
    async fn detach_volume_ignores_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/volumes/v1/attached_server"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .detach_volume(&VolumeId::parse("v1").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_attached_volume_fails() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/volumes/v1"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": "Volume is attached to a server"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_volume(&VolumeId::parse("v1").unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP request failed: (409) [Volume is attached to a server]"
        );
    }

    #[tokio::test]
    async fn update_volume_renames() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/volumes/v1"))
            .and(body_json(json!({"name": "logs"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "v1", "name": "logs", "size": 20, "state": "detached"
            })))
            .mount(&server)
            .await;

        let request = UpdateVolumeRequest {
            name: Some("logs".into()),
        };
        let volume = client(&server)
            .update_volume(&VolumeId::parse("v1").unwrap(), &request)
            .await
            .unwrap();
        assert_eq!(volume.name, "logs");
        assert_eq!(volume.state, VolumeState::Detached);
    }
}
