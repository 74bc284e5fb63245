//! Best-effort handling of on-disk stage artifacts.

use std::path::Path;
use tracing::{debug, warn};

/// Deletes an artifact, treating "already gone" as success.
///
/// Returns `true` when the file no longer exists afterwards.
pub async fn remove_artifact(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed artifact {:?}", path);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to remove artifact {:?}: {}", path, e);
            false
        }
    }
}
