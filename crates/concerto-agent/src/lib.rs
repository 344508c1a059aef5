//! Agent-side clients for Concerto.
//!
//! Agents run unattended on managed servers and authenticate with a token
//! instead of a client certificate:
//!
//! - [`PollingClient`] pings the platform, fetches the next queued command
//!   and reports its result (command polling token plus server id).
//! - [`BrownfieldClient`] reads import settings and registers servers found
//!   on existing infrastructure (brownfield token).
//!
//! Agent tokens travel only on requests that carry a JSON body, so every
//! request made here sends one, even reads.

#![deny(missing_docs)]

pub mod brownfield;
pub mod models;
pub mod polling;

pub use brownfield::BrownfieldClient;
pub use models::{
    BrownfieldSettings, Command, CommandResult, ImportedServer, RegisterServerRequest,
};
pub use polling::PollingClient;

/// Convenient result alias using the shared Concerto error type.
pub type Result<T> = concerto_core::Result<T>;
