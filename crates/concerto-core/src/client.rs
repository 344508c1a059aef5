//! Transport session and request executor.
//!
//! A [`ServiceClient`] wraps one long-lived HTTP client configured from a
//! [`SessionConfig`]. It is cheap to clone, holds no per-request state, and
//! never retries: every call performs exactly one request and hands the
//! outcome back to the caller.

use crate::config::{AuthMode, SessionConfig};
use crate::credentials::error_chain;
use crate::error::{Error, Result};
use crate::response::{Decoded, RawResponse, StatusCheck};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Default user agent sent with every request.
pub const USER_AGENT: &str = concat!("concerto-core/", env!("CARGO_PKG_VERSION"));

/// Untyped JSON request body.
pub type Payload = Map<String, Value>;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    config: SessionConfig,
    mode: AuthMode,
    user_agent: String,
}

impl ServiceClientBuilder {
    /// Create a builder for `config` authenticating with `mode`.
    #[must_use]
    pub fn new(config: SessionConfig, mode: AuthMode) -> Self {
        Self {
            config,
            mode,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the configuration, load credentials and build the client.
    ///
    /// No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the endpoint or the mode's credential
    /// fields are missing, and [`Error::CredentialLoadFailed`] when certificate
    /// material cannot be loaded.
    pub fn build(self) -> Result<ServiceClient> {
        let base_url = self.config.parse_endpoint()?;
        let credentials = self.config.credentials(self.mode)?;

        let builder = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.config.timeout());
        let http = credentials.configure(builder)?.build().map_err(|err| {
            Error::WebServiceConfigurationFailed(format!(
                "Failed to build HTTP client: {}",
                error_chain(&err)
            ))
        })?;

        let transfer = Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.config.timeout())
            .build()
            .map_err(|err| {
                Error::WebServiceConfigurationFailed(format!(
                    "Failed to build transfer client: {}",
                    error_chain(&err)
                ))
            })?;

        let side_channel = credentials.side_channel_headers()?;

        info!(endpoint = %base_url, mode = %self.mode, "Concerto session ready");

        Ok(ServiceClient {
            inner: Arc::new(Inner {
                http,
                transfer,
                base_url,
                mode: self.mode,
                side_channel,
            }),
        })
    }
}

struct Inner {
    http: Client,
    transfer: Client,
    base_url: Url,
    mode: AuthMode,
    side_channel: Vec<(HeaderName, HeaderValue)>,
}

/// Authenticated client for the Concerto API.
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("mode", &self.inner.mode)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Build a client directly from the configuration.
    ///
    /// # Errors
    ///
    /// See [`ServiceClientBuilder::build`].
    pub fn new(config: &SessionConfig, mode: AuthMode) -> Result<Self> {
        ServiceClientBuilder::new(config.clone(), mode).build()
    }

    /// Start a builder.
    #[must_use]
    pub fn builder(config: SessionConfig, mode: AuthMode) -> ServiceClientBuilder {
        ServiceClientBuilder::new(config, mode)
    }

    /// Endpoint every request path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Credential mode of this session.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.inner.mode
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    pub(crate) fn transfer_http(&self) -> &Client {
        &self.inner.transfer
    }

    /// Append `path` to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the result is not a valid URL.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{path}`: {err}")))
    }

    /// Issue one request and read the whole response.
    ///
    /// When `body` is present it is JSON-encoded before anything is sent, the
    /// JSON content type is set, and the session's agent token headers are
    /// attached. Bodiless requests carry no token headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] for bodies that cannot be serialized and
    /// [`Error::Transport`] when the request cannot be completed. HTTP error
    /// statuses are not errors at this level.
    pub async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let encoded = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| Error::Encode(err.to_string()))?;
        let url = self.url_for(path)?;

        let mut request = self.inner.http.request(method.clone(), url);
        if let Some(bytes) = encoded {
            request = request.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
            for (name, value) in &self.inner.side_channel {
                request = request.header(name.clone(), value.clone());
            }
            request = request.body(bytes);
        }

        debug!(%method, path, "Sending Concerto request");
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(%method, path, status = status.as_u16(), bytes = body.len(), "Concerto response");

        Ok(RawResponse::new(status, headers, body))
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::execute`].
    pub async fn get(&self, path: &str, body: Option<&Payload>) -> Result<RawResponse> {
        self.execute(Method::GET, path, body).await
    }

    /// `POST path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::execute`].
    pub async fn post(&self, path: &str, body: Option<&Payload>) -> Result<RawResponse> {
        self.execute(Method::POST, path, body).await
    }

    /// `PUT path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::execute`].
    pub async fn put(&self, path: &str, body: Option<&Payload>) -> Result<RawResponse> {
        self.execute(Method::PUT, path, body).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::execute`].
    pub async fn delete(&self, path: &str, body: Option<&Payload>) -> Result<RawResponse> {
        self.execute(Method::DELETE, path, body).await
    }

    /// Execute, check the status per `check`, and decode the body.
    ///
    /// # Errors
    ///
    /// Transport, encode, normalized HTTP and decode errors.
    pub async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        check: StatusCheck,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(method, path, body)
            .await?
            .check_and_decode(check)
    }

    /// Execute and check the status per `check`, discarding the body.
    ///
    /// # Errors
    ///
    /// Transport, encode and normalized HTTP errors.
    pub async fn call_discarding<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        check: StatusCheck,
    ) -> Result<StatusCode>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body).await?.checked(check)
    }

    /// `GET path`, failing on status >= 300, decoding the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Decoded<T>> {
        self.call::<Payload, T>(Method::GET, path, None, StatusCheck::Enforce)
            .await
    }

    /// `POST path` with a JSON body, failing on status >= 300, decoding the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, Some(body), StatusCheck::Enforce)
            .await
    }

    /// `PUT path` with a JSON body, failing on status >= 300, decoding the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call`].
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PUT, path, Some(body), StatusCheck::Enforce)
            .await
    }

    /// `DELETE path`, failing on status >= 300, decoding the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call`].
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<Decoded<T>> {
        self.call::<Payload, T>(Method::DELETE, path, None, StatusCheck::Enforce)
            .await
    }

    /// `PUT path` with a JSON body, failing on status >= 300, ignoring the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call_discarding`].
    pub async fn put_checked<B>(&self, path: &str, body: &B) -> Result<StatusCode>
    where
        B: Serialize + ?Sized,
    {
        self.call_discarding(Method::PUT, path, Some(body), StatusCheck::Enforce)
            .await
    }

    /// `DELETE path`, failing on status >= 300, ignoring the body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::call_discarding`].
    pub async fn delete_checked(&self, path: &str) -> Result<StatusCode> {
        self.call_discarding::<Payload>(Method::DELETE, path, None, StatusCheck::Enforce)
            .await
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    Error::Transport(error_chain(&err))
}
