//! Session configuration for Concerto clients.
//!
//! A [`SessionConfig`] is what the (external) configuration loader hands the
//! transport: the API endpoint plus whichever credential material this process
//! has. [`SessionConfig::credentials`] turns it into exactly one
//! [`Credentials`] value for the [`AuthMode`] the caller asks for.

use crate::credentials::{CertificatePaths, Credentials};
use crate::ids::ServerId;
use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Request timeout applied to every call made through a session.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credential mode a session authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Mutual TLS with a client certificate (end-user mode).
    Certificate,
    /// Brownfield import agent token.
    Brownfield,
    /// Command polling agent token plus the owning server id.
    CommandPolling,
}

impl AuthMode {
    /// Short lowercase name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Brownfield => "brownfield",
            Self::CommandPolling => "command-polling",
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for one Concerto session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Base URL of the Concerto API (e.g. `https://clients.concerto.io:886`)
    #[validate(url)]
    #[serde(default)]
    pub api_endpoint: String,

    /// Client certificate material for mutual TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificatePaths>,

    /// Brownfield import token
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_secret"
    )]
    pub brownfield_token: Option<SecretString>,

    /// Command polling token
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_secret"
    )]
    pub command_polling_token: Option<SecretString>,

    /// Server this process runs on, sent alongside the polling token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(SecretString::from))
}

impl SessionConfig {
    /// Create a configuration for the given endpoint with no credentials.
    #[must_use]
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the mutual TLS material.
    #[must_use]
    pub fn with_certificate(
        mut self,
        ca_cert: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        self.certificate = Some(CertificatePaths::new(ca_cert, cert, key));
        self
    }

    /// Set the brownfield import token.
    #[must_use]
    pub fn with_brownfield_token(mut self, token: impl Into<String>) -> Self {
        self.brownfield_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the command polling token and the server it belongs to.
    #[must_use]
    pub fn with_command_polling(
        mut self,
        token: impl Into<String>,
        server_id: impl Into<String>,
    ) -> Self {
        self.command_polling_token = Some(SecretString::from(token.into()));
        self.server_id = Some(server_id.into());
        self
    }

    /// Request timeout for sessions built from this configuration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        REQUEST_TIMEOUT
    }

    /// Parse and validate the API endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationIncomplete`] when the endpoint is empty and
    /// [`Error::WebServiceConfigurationFailed`] when it is not a valid URL.
    pub fn parse_endpoint(&self) -> Result<Url, Error> {
        if self.api_endpoint.trim().is_empty() {
            return Err(Error::ConfigurationIncomplete(
                "api_endpoint is not set".to_string(),
            ));
        }
        self.validate()?;
        Url::parse(&self.api_endpoint).map_err(|e| {
            Error::WebServiceConfigurationFailed(format!("Invalid API endpoint: {e}"))
        })
    }

    /// Returns true when every field `mode` needs is populated.
    #[must_use]
    pub fn is_ready(&self, mode: AuthMode) -> bool {
        self.parse_endpoint().is_ok() && self.credentials(mode).is_ok()
    }

    /// Resolve the credential material for `mode`.
    ///
    /// Only checks presence; files are not touched until the credentials are
    /// loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationIncomplete`] naming the first missing field.
    pub fn credentials(&self, mode: AuthMode) -> Result<Credentials, Error> {
        match mode {
            AuthMode::Certificate => {
                let paths = self.certificate.as_ref().ok_or_else(|| {
                    Error::ConfigurationIncomplete("certificate is not set".to_string())
                })?;
                paths.ensure_complete()?;
                Ok(Credentials::Certificate(paths.clone()))
            }
            AuthMode::Brownfield => {
                let token = required_secret(self.brownfield_token.as_ref(), "brownfield_token")?;
                Ok(Credentials::Brownfield { token })
            }
            AuthMode::CommandPolling => {
                let token = required_secret(
                    self.command_polling_token.as_ref(),
                    "command_polling_token",
                )?;
                let server_id = self
                    .server_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        Error::ConfigurationIncomplete("server_id is not set".to_string())
                    })
                    .and_then(|id| {
                        ServerId::parse(id).map_err(|_| {
                            Error::ConfigurationIncomplete(format!("server_id `{id}` is invalid"))
                        })
                    })?;
                Ok(Credentials::CommandPolling { token, server_id })
            }
        }
    }
}

fn required_secret(value: Option<&SecretString>, field: &str) -> Result<SecretString, Error> {
    match value {
        Some(secret) if !secret.expose_secret().trim().is_empty() => Ok(secret.clone()),
        _ => Err(Error::ConfigurationIncomplete(format!("{field} is not set"))),
    }
}
