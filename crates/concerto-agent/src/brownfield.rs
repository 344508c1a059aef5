//! Brownfield import client.

use crate::models::{BrownfieldSettings, ImportedServer, RegisterServerRequest};
use crate::Result;
use concerto_core::{AuthMode, Payload, ServiceClient, SessionConfig, StatusCheck, Upserted};
use tracing::info;

const USER_AGENT: &str = concat!("concerto-agent/", env!("CARGO_PKG_VERSION"));

/// Client for the brownfield import endpoints.
#[derive(Debug, Clone)]
pub struct BrownfieldClient {
    inner: ServiceClient,
}

impl BrownfieldClient {
    /// Wrap an existing brownfield session.
    #[must_use]
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Build a brownfield session for `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let inner = ServiceClient::builder(config.clone(), AuthMode::Brownfield)
            .with_user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner })
    }

    /// Fetch the import settings.
    pub async fn settings(&self) -> Result<BrownfieldSettings> {
        let response = self
            .inner
            .get("/brownfield/settings", Some(&Payload::new()))
            .await?;
        Ok(response
            .check_and_decode(StatusCheck::Enforce)?
            .into_inner())
    }

    /// Register a discovered server.
    ///
    /// The platform answers `200` when it already knew the server and `201`
    /// when it created a record for it.
    pub async fn register_server(
        &self,
        request: &RegisterServerRequest,
    ) -> Result<Upserted<ImportedServer>> {
        let upserted = self
            .inner
            .post_json("/brownfield/servers", request)
            .await?
            .into_upserted();
        info!(
            provider_id = %request.provider_id,
            created = upserted.was_created(),
            "Brownfield server registered"
        );
        Ok(upserted)
    }

    /// Register every discovered server, stopping at the first failure.
    pub async fn register_servers(
        &self,
        requests: &[RegisterServerRequest],
    ) -> Result<Vec<Upserted<ImportedServer>>> {
        let mut registered = Vec::with_capacity(requests.len());
        for request in requests {
            registered.push(self.register_server(request).await?);
        }
        Ok(registered)
    }
}
