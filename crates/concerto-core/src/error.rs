//! Error types for Concerto operations.
//!
//! Every failure the transport can produce is folded into one [`Error`] enum:
//! configuration and credential problems raised before any network I/O,
//! transport failures, normalized HTTP failures, and encode/decode problems.

use std::path::PathBuf;
use thiserror::Error;

/// Prefix carried by every transport-level failure.
pub const TRANSPORT_ERROR_PREFIX: &str = "Cannot execute request";

/// Main error type for Concerto operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The HTTP client could not be configured (bad endpoint URL, TLS backend failure).
    #[error("Web service configuration failed: {0}")]
    WebServiceConfigurationFailed(String),

    /// A field required by the selected credential mode is missing.
    #[error("Configuration is incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// A CA, certificate or key file could not be read or parsed.
    #[error("Cannot load credentials from {}: {reason}", path.display())]
    CredentialLoadFailed {
        /// File that failed
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Connection, DNS, TLS handshake or timeout failure.
    #[error("Cannot execute request: {0}")]
    Transport(String),

    /// The server answered with a status of 300 or above.
    #[error("HTTP request failed: ({status}) [{message}]")]
    HttpFailure {
        /// Numeric HTTP status
        status: u16,
        /// Message extracted from the error payload
        message: String,
    },

    /// A request body could not be serialized.
    #[error("Cannot encode request body: {0}")]
    Encode(String),

    /// A response body could not be decoded into the expected type.
    #[error("Cannot decode response: {0}")]
    Decode(String),

    /// The response was well-formed HTTP but lacked something we need.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local file I/O failed during a transfer.
    #[error("I/O error on {}: {message}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// A request path or URL could not be resolved against the endpoint.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Malformed resource identifier.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// A multi-step workflow failed and its compensating action failed too.
    #[error("{original} (compensation failed: {compensation})")]
    Compensation {
        /// The failure that triggered compensation
        original: Box<Error>,
        /// The failure of the compensating action
        compensation: Box<Error>,
    },
}

/// Specialized result type for Concerto operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WebServiceConfigurationFailed(_) => "WEB_SERVICE_CONFIGURATION_FAILED",
            Self::ConfigurationIncomplete(_) => "CONFIGURATION_INCOMPLETE",
            Self::CredentialLoadFailed { .. } => "CREDENTIAL_LOAD_FAILED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::HttpFailure { .. } => "HTTP_FAILURE",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Io { .. } => "IO_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidId(_) => "INVALID_ID",
            Self::Compensation { .. } => "COMPENSATION_FAILED",
        }
    }

    /// HTTP status of a normalized server failure, if this is one.
    ///
    /// For [`Error::Compensation`] this is the status of the original failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpFailure { status, .. } => Some(*status),
            Self::Compensation { original, .. } => original.status(),
            _ => None,
        }
    }

    /// Returns true for failures raised before any network I/O could happen.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::WebServiceConfigurationFailed(_)
                | Self::ConfigurationIncomplete(_)
                | Self::CredentialLoadFailed { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn credential(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CredentialLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::WebServiceConfigurationFailed(err.to_string())
    }
}
