//! Content catalog - the database of media items the pipeline writes back to.
//!
//! When a job starts the source item is tagged as in progress. After a
//! successful publish the remote reference is recorded and the tag is
//! cleared. A failed write is a persistence failure on the job, distinct
//! from a media failure.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

/// Trait for content catalog storage.
pub trait ContentCatalog: Send + Sync {
    /// Insert an item or update its title.
    fn upsert_item(&self, source_url: &str, title: &str) -> Result<(), CatalogError>;

    /// Tag an item as being processed.
    ///
    /// Returns [`CatalogError::NotFound`] for unknown sources.
    fn mark_in_progress(&self, source_url: &str) -> Result<(), CatalogError>;

    /// Store the remote reference and clear the in-progress tag.
    ///
    /// Returns [`CatalogError::NotFound`] for unknown sources.
    fn record_published(&self, source_url: &str, remote_ref: &str) -> Result<(), CatalogError>;

    /// Get an item by source URL.
    fn get_item(&self, source_url: &str) -> Result<MediaItem, CatalogError>;
}
