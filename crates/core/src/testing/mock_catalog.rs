//! Mock content catalog for testing.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::catalog::{strip_tag, tag_title, CatalogError, ContentCatalog, MediaItem};

/// In-memory catalog with switchable write failures and slow writes.
#[derive(Debug, Default)]
pub struct MockCatalog {
    items: RwLock<HashMap<String, MediaItem>>,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MockCatalog {
    /// Create an empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block the calling thread for `delay` on every published write,
    /// the way a contended database file would.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), CatalogError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CatalogError::Database("mock write failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn update<F>(&self, source_url: &str, apply: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut MediaItem),
    {
        self.check_writable()?;
        let mut items = self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let item = items
            .get_mut(source_url)
            .ok_or_else(|| CatalogError::NotFound(source_url.to_string()))?;
        apply(item);
        item.updated_at = Utc::now();
        Ok(())
    }
}

impl ContentCatalog for MockCatalog {
    fn upsert_item(&self, source_url: &str, title: &str) -> Result<(), CatalogError> {
        self.check_writable()?;
        let mut items = self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        items
            .entry(source_url.to_string())
            .and_modify(|item| item.title = title.to_string())
            .or_insert_with(|| MediaItem {
                source_url: source_url.to_string(),
                title: title.to_string(),
                remote_ref: None,
                in_progress: false,
                updated_at: Utc::now(),
            });
        Ok(())
    }

    fn mark_in_progress(&self, source_url: &str) -> Result<(), CatalogError> {
        self.update(source_url, |item| {
            item.title = tag_title(&item.title);
            item.in_progress = true;
        })
    }

    fn record_published(&self, source_url: &str, remote_ref: &str) -> Result<(), CatalogError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.update(source_url, |item| {
            item.title = strip_tag(&item.title);
            item.remote_ref = Some(remote_ref.to_string());
            item.in_progress = false;
        })
    }

    fn get_item(&self, source_url: &str) -> Result<MediaItem, CatalogError> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(source_url)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(source_url.to_string()))
    }
}
