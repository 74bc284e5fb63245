//! Types for the content catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag appended to an item's title while its media is being processed.
pub const IN_PROGRESS_TAG: &str = "[processing]";

/// A content record, keyed by the source URL it was scraped from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Source URL (primary key).
    pub source_url: String,
    /// Display title. Carries [`IN_PROGRESS_TAG`] while processing.
    pub title: String,
    /// Remote reference of the published media, once known.
    pub remote_ref: Option<String>,
    /// Whether a job is currently processing this item.
    pub in_progress: bool,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Returns `title` with the in-progress tag appended, unless already present.
pub fn tag_title(title: &str) -> String {
    if title.ends_with(IN_PROGRESS_TAG) {
        title.to_string()
    } else if title.is_empty() {
        IN_PROGRESS_TAG.to_string()
    } else {
        format!("{} {}", title, IN_PROGRESS_TAG)
    }
}

/// Returns `title` without a trailing in-progress tag.
pub fn strip_tag(title: &str) -> String {
    title
        .strip_suffix(IN_PROGRESS_TAG)
        .map(|t| t.trim_end().to_string())
        .unwrap_or_else(|| title.to_string())
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}
