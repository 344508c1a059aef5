//! Cloud client and data models for Concerto.
//!
//! Provides typed structures and an asynchronous client for servers and
//! the server plans they are provisioned from.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::CloudClient;
pub use models::{CreateServerRequest, Server, ServerPlan, ServerState, UpdateServerRequest};

/// Convenient result alias that reuses the shared Concerto error type.
pub type Result<T> = concerto_core::Result<T>;
