//! Asynchronous cloud client implementation.

use crate::models::{CreateServerRequest, Server, ServerPlan, UpdateServerRequest};
use crate::Result;
use concerto_core::ids::{PlanId, ServerId};
use concerto_core::{AuthMode, ServiceClient, SessionConfig};
use serde_json::json;
use tracing::debug;

const USER_AGENT: &str = concat!("concerto-cloud/", env!("CARGO_PKG_VERSION"));

/// Asynchronous client for the cloud endpoints.
#[derive(Debug, Clone)]
pub struct CloudClient {
    inner: ServiceClient,
}

impl CloudClient {
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

    /// List servers.
    pub async fn list_servers(&self) -> Result<Vec<Server>> {
        Ok(self.inner.get_json("/cloud/servers").await?.into_inner())
    }

    /// Fetch a single server.
    pub async fn get_server(&self, id: &ServerId) -> Result<Server> {
        let path = format!("/cloud/servers/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Create a server (it starts out commissioning).
    pub async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        Ok(self
            .inner
            .post_json("/cloud/servers", request)
            .await?
            .into_inner())
    }

    /// Update a server.
    pub async fn update_server(
        &self,
        id: &ServerId,
        request: &UpdateServerRequest,
    ) -> Result<Server> {
        let path = format!("/cloud/servers/{id}");
        Ok(self.inner.put_json(&path, request).await?.into_inner())
    }

    /// Boot a server.
    pub async fn boot_server(&self, id: &ServerId) -> Result<Server> {
        self.action(id, "boot").await
    }

    /// Shut a server down.
    pub async fn shutdown_server(&self, id: &ServerId) -> Result<Server> {
        self.action(id, "shutdown").await
    }

    /// Mark a server inactive without contacting the provider. Used to
    /// recover servers whose provider-side instance is already gone.
    pub async fn override_server(&self, id: &ServerId) -> Result<Server> {
        self.action(id, "override").await
    }

    /// Decommission and delete a server.
    pub async fn delete_server(&self, id: &ServerId) -> Result<()> {
        let path = format!("/cloud/servers/{id}");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// Drop the server record while leaving the provider-side instance alone.
    pub async fn discard_server(&self, id: &ServerId) -> Result<()> {
        let path = format!("/cloud/servers/{id}/discard");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// List server plans.
    pub async fn list_server_plans(&self) -> Result<Vec<ServerPlan>> {
        Ok(self.inner.get_json("/cloud/server_plans").await?.into_inner())
    }

    /// Fetch a single server plan.
    pub async fn get_server_plan(&self, id: &PlanId) -> Result<ServerPlan> {
        let path = format!("/cloud/server_plans/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    async fn action(&self, id: &ServerId, action: &str) -> Result<Server> {
        debug!(server = %id, action, "Server action");
        let path = format!("/cloud/servers/{id}/{action}");
        Ok(self.inner.put_json(&path, &json!({})).await?.into_inner())
    }
}
