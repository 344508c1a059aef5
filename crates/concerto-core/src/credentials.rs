//! Credential loading.
//!
//! End-user sessions authenticate with mutual TLS: a CA bundle that is the
//! only trust root, and a client certificate/key pair. Agent sessions
//! (brownfield import, command polling) talk to an operator-controlled
//! endpoint without certificate verification and identify themselves with a
//! token header on write requests instead.

use crate::error::{Error, Result};
use crate::ids::ServerId;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Certificate, Client, ClientBuilder, Identity};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Header carrying the brownfield import token.
pub const BROWNFIELD_TOKEN_HEADER: &str = "X-Concerto-Brownfield-Token";
/// Header carrying the command polling token.
pub const COMMAND_POLLING_TOKEN_HEADER: &str = "X-IMCO-Command-Polling-Token";
/// Header carrying the id of the server a polling agent runs on.
pub const SERVER_ID_HEADER: &str = "X-IMCO-server-ID";

const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_PRIVATE_KEY_MARKER: &str = "PRIVATE KEY-----";

/// Paths to the mutual TLS material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePaths {
    /// CA bundle that signs the server certificate
    pub ca_cert: PathBuf,
    /// Client certificate (PEM)
    pub cert: PathBuf,
    /// Client private key (PEM)
    pub key: PathBuf,
}

impl CertificatePaths {
    /// Create a new set of certificate paths.
    #[must_use]
    pub fn new(
        ca_cert: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ca_cert: ca_cert.into(),
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// Checks that all three paths are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationIncomplete`] naming the first empty path.
    pub fn ensure_complete(&self) -> Result<()> {
        for (field, path) in [
            ("ca_cert", &self.ca_cert),
            ("cert", &self.cert),
            ("key", &self.key),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigurationIncomplete(format!(
                    "certificate.{field} is not set"
                )));
            }
        }
        Ok(())
    }
}

/// Credential material for exactly one authentication mode.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Mutual TLS.
    Certificate(CertificatePaths),
    /// Brownfield import agent.
    Brownfield {
        /// Import token
        token: SecretString,
    },
    /// Command polling agent.
    CommandPolling {
        /// Polling token
        token: SecretString,
        /// Server the agent runs on
        server_id: ServerId,
    },
}

impl Credentials {
    /// Load the credential material and apply it to `builder`.
    ///
    /// Certificate mode reads the three PEM files; agent modes do no I/O and
    /// disable server certificate verification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialLoadFailed`] naming the file that could not be
    /// read or parsed.
    pub fn configure(&self, builder: ClientBuilder) -> Result<ClientBuilder> {
        match self {
            Self::Certificate(paths) => {
                let ca = load_ca_certificate(&paths.ca_cert)?;
                let identity = load_identity(&paths.cert, &paths.key)?;
                Ok(builder
                    .use_rustls_tls()
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(ca)
                    .identity(identity))
            }
            Self::Brownfield { .. } | Self::CommandPolling { .. } => {
                warn!(mode = self.mode_name(), "TLS verification disabled for agent session");
                Ok(builder.danger_accept_invalid_certs(true))
            }
        }
    }

    /// Headers echoed on every request that carries a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebServiceConfigurationFailed`] if a token is not a valid
    /// header value.
    pub fn side_channel_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        match self {
            Self::Certificate(_) => Ok(Vec::new()),
            Self::Brownfield { token } => Ok(vec![(
                HeaderName::from_static("x-concerto-brownfield-token"),
                sensitive_value(token.expose_secret(), BROWNFIELD_TOKEN_HEADER)?,
            )]),
            Self::CommandPolling { token, server_id } => Ok(vec![
                (
                    HeaderName::from_static("x-imco-command-polling-token"),
                    sensitive_value(token.expose_secret(), COMMAND_POLLING_TOKEN_HEADER)?,
                ),
                (
                    HeaderName::from_static("x-imco-server-id"),
                    sensitive_value(server_id.as_str(), SERVER_ID_HEADER)?,
                ),
            ]),
        }
    }

    const fn mode_name(&self) -> &'static str {
        match self {
            Self::Certificate(_) => "certificate",
            Self::Brownfield { .. } => "brownfield",
            Self::CommandPolling { .. } => "command-polling",
        }
    }
}

fn sensitive_value(value: &str, header: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|_| {
        Error::WebServiceConfigurationFailed(format!("{header} contains invalid characters"))
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    debug!("loading PEM material from {}", path.display());
    std::fs::read(path).map_err(|err| Error::credential(path, err.to_string()))
}

fn contains_marker(pem: &[u8], marker: &str) -> bool {
    String::from_utf8_lossy(pem).contains(marker)
}

fn load_ca_certificate(path: &Path) -> Result<Certificate> {
    let pem = read_pem(path)?;
    if !contains_marker(&pem, PEM_CERTIFICATE_MARKER) {
        return Err(Error::credential(path, "no PEM certificate found"));
    }
    let parse = || {
        Certificate::from_pem(&pem).map_err(|err| {
            Error::credential(path, format!("invalid CA certificate: {}", error_chain(&err)))
        })
    };
    check_with_rustls(
        Client::builder().add_root_certificate(parse()?),
        path,
        "CA certificate",
    )?;
    parse()
}

fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity> {
    let cert = read_pem(cert_path)?;
    if !contains_marker(&cert, PEM_CERTIFICATE_MARKER) {
        return Err(Error::credential(cert_path, "no PEM certificate found"));
    }

    let key = read_pem(key_path)?;
    if !contains_marker(&key, PEM_PRIVATE_KEY_MARKER) {
        return Err(Error::credential(key_path, "no PEM private key found"));
    }

    // The certificate DER is only parsed by rustls when it is used as a trust
    // anchor, so check it that way before pairing it with the key.
    let as_anchor = Certificate::from_pem(&cert).map_err(|err| {
        Error::credential(
            cert_path,
            format!("invalid client certificate: {}", error_chain(&err)),
        )
    })?;
    check_with_rustls(
        Client::builder().add_root_certificate(as_anchor),
        cert_path,
        "client certificate",
    )?;

    let mut pem = cert;
    pem.push(b'\n');
    pem.extend_from_slice(&key);
    let parse = || {
        Identity::from_pem(&pem).map_err(|err| {
            Error::credential(
                key_path,
                format!("invalid client key pair: {}", error_chain(&err)),
            )
        })
    };
    check_with_rustls(Client::builder().identity(parse()?), key_path, "client key pair")?;
    parse()
}

/// reqwest defers parsing of rustls material until the client is built.
fn check_with_rustls(builder: ClientBuilder, path: &Path, what: &str) -> Result<()> {
    builder
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .build()
        .map(drop)
        .map_err(|err| {
            Error::credential(path, format!("invalid {what}: {}", error_chain(&err)))
        })
}

/// Render an error with all of its sources, outermost first.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
