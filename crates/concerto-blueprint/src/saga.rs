//! Compensation for two-phase uploads.
//!
//! Uploads create a remote placeholder first, then push the content, then
//! finalize. When a later step fails the placeholder is deleted so no
//! half-created resource is left behind.

use concerto_core::{Error, ServiceClient};
use tracing::{error, warn};

/// Delete the placeholder at `path` after `original` failed.
///
/// Returns the error the caller should surface: `original` when the delete
/// succeeded, [`Error::Compensation`] carrying both failures when it did not.
pub(crate) async fn compensate(client: &ServiceClient, path: &str, original: Error) -> Error {
    warn!(path, error = %original, "Upload failed, deleting placeholder");

    match client.delete_checked(path).await {
        Ok(_) => original,
        Err(compensation) => {
            error!(path, error = %compensation, "Failed to delete placeholder");
            Error::Compensation {
                original: Box::new(original),
                compensation: Box::new(compensation),
            }
        }
    }
}
