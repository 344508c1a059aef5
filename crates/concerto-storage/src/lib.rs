//! Storage client and data models for Concerto.
//!
//! Provides typed models and an asynchronous client for block volumes and
//! their attachment to servers.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::StorageClient;
pub use models::{CreateVolumeRequest, UpdateVolumeRequest, Volume, VolumeListParams, VolumeState};

/// Convenient result alias using the shared Concerto error type.
pub type Result<T> = concerto_core::Result<T>;
