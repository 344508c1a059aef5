//! Response checking and decoding.
//!
//! Concerto services report failures in one of three shapes: a single
//! `"error"` string, an `"errors"` object mapping field names to message
//! lists, or plain text. [`ErrorPayload`] classifies a body once and renders
//! it into the message carried by [`Error::HttpFailure`].

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Separator placed between fields of a field-error payload.
pub const FIELD_SEPARATOR: &str = " # ";

/// Whether a status of 300 or above should be turned into an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCheck {
    /// Fail on any status >= 300.
    #[default]
    Enforce,
    /// Hand the status back untouched.
    Skip,
}

impl From<bool> for StatusCheck {
    fn from(enforce: bool) -> Self {
        if enforce {
            Self::Enforce
        } else {
            Self::Skip
        }
    }
}

/// A server error body, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPayload {
    /// `{"error": "..."}`
    Single(String),
    /// `{"errors": {"field": ["...", ...]}}`
    Fields(BTreeMap<String, Vec<String>>),
    /// Anything else, kept verbatim.
    Raw(String),
}

impl ErrorPayload {
    /// Classify an error body.
    #[must_use]
    pub fn classify(body: &[u8]) -> Self {
        let raw = || Self::Raw(String::from_utf8_lossy(body).into_owned());

        let Ok(Value::Object(object)) = serde_json::from_slice::<Value>(body) else {
            return raw();
        };

        // An empty map carries no message of its own.
        if let Some(Value::Object(fields)) = object.get("errors").filter(|errors| {
            errors.as_object().is_some_and(|fields| !fields.is_empty())
        }) {
            let fields = fields
                .iter()
                .map(|(field, messages)| (field.clone(), messages_of(messages)))
                .collect();
            return Self::Fields(fields);
        }

        match object.get("error") {
            Some(Value::String(message)) => Self::Single(message.clone()),
            _ => raw(),
        }
    }

    /// Render the payload as a single line.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Single(message) | Self::Raw(message) => message.clone(),
            Self::Fields(fields) => fields
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
                .collect::<Vec<_>>()
                .join(FIELD_SEPARATOR),
        }
    }

    /// Build the normalized error for `status`.
    #[must_use]
    pub fn into_error(self, status: StatusCode) -> Error {
        Error::HttpFailure {
            status: status.as_u16(),
            message: self.message(),
        }
    }
}

// Servers sometimes send a bare string where a list is expected.
fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_text).collect(),
        other => vec![value_text(other)],
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn a status and body into a normalized error when the status is >= 300.
///
/// # Errors
///
/// Returns [`Error::HttpFailure`] carrying the status and the extracted message.
pub fn check_status(status: StatusCode, body: &[u8]) -> Result<()> {
    if status.as_u16() >= 300 {
        return Err(ErrorPayload::classify(body).into_error(status));
    }
    Ok(())
}

/// Body, status and headers of a completed request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Assemble a response from its parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning its body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Fail with a normalized error if the status is 300 or above.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpFailure`].
    pub fn check_status(&self) -> Result<()> {
        check_status(self.status, &self.body)
    }

    /// Decode the body as JSON without looking at the status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is empty or does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }

    /// Apply `check`, discarding the body.
    ///
    /// Never decodes, so an empty or non-JSON body is fine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpFailure`] when checking is enforced and the status is >= 300.
    pub fn checked(&self, check: StatusCheck) -> Result<StatusCode> {
        if check == StatusCheck::Enforce {
            self.check_status()?;
        }
        Ok(self.status)
    }

    /// Apply `check`, then decode the body.
    ///
    /// A failed check wins: the body is not decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpFailure`] or [`Error::Decode`].
    pub fn check_and_decode<T: DeserializeOwned>(&self, check: StatusCheck) -> Result<Decoded<T>> {
        let status = self.checked(check)?;
        Ok(Decoded {
            value: self.decode()?,
            status,
        })
    }
}

/// A decoded value together with the status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// Decoded body
    pub value: T,
    /// HTTP status
    pub status: StatusCode,
}

impl<T> Decoded<T> {
    /// Drop the status.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Whether the server reported a newly created resource (201).
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.status == StatusCode::CREATED
    }

    /// Split on 200 (existing) versus 201 (created).
    #[must_use]
    pub fn into_upserted(self) -> Upserted<T> {
        if self.is_created() {
            Upserted::Created(self.value)
        } else {
            Upserted::Existing(self.value)
        }
    }
}

/// Result of an operation that either finds or creates a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    /// The resource already existed.
    Existing(T),
    /// The resource was created by this call.
    Created(T),
}

impl<T> Upserted<T> {
    /// The resource, however it came to be.
    pub fn into_inner(self) -> T {
        match self {
            Self::Existing(value) | Self::Created(value) => value,
        }
    }

    /// Whether this call created the resource.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
