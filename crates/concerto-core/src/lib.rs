//! # concerto-core
//!
//! Shared transport for Concerto API clients.
//!
//! Every resource accessor in the Concerto crates goes through one
//! [`ServiceClient`]: a long-lived HTTP client authenticated either with
//! mutual TLS or with an agent token, which executes single requests,
//! normalizes server error payloads and streams files to and from disk.
//!
//! ## Modules
//!
//! - [`config`] - Session configuration and credential mode selection
//! - [`credentials`] - Loading mutual TLS material and agent token headers
//! - [`client`] - The session and its request executor
//! - [`response`] - Status checking, error payload normalization, decoding
//! - [`transfer`] - File downloads and streamed uploads
//! - [`error`] - Error taxonomy
//! - [`ids`] - Strongly-typed resource identifiers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod response;
pub mod transfer;

// Re-export commonly used types
pub use client::{Payload, ServiceClient, ServiceClientBuilder};
pub use config::{AuthMode, SessionConfig};
pub use error::{Error, Result};
pub use response::{Decoded, RawResponse, StatusCheck, Upserted};
pub use transfer::{Downloaded, FileName};
