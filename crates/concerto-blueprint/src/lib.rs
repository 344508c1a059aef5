//! Blueprint client and data models for Concerto.
//!
//! Covers scripts, the files attached to them and uploaded cookbook
//! versions. Uploads are two-phase: a placeholder is created, the content is
//! pushed to the returned upload URL, then the placeholder is finalized. A
//! failure after the placeholder exists deletes it again.

#![deny(missing_docs)]

pub mod client;
pub mod models;
mod saga;

pub use client::BlueprintClient;
pub use models::{
    Attachment, CookbookVersion, CookbookVersionState, CreateAttachmentRequest,
    CreateCookbookVersionRequest, CreateScriptRequest, Script, UpdateScriptRequest,
};

/// Convenient result alias using the shared Concerto error type.
pub type Result<T> = concerto_core::Result<T>;
