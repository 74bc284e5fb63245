//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every stage trait and the
//! content catalog, so the coordinator can be exercised without network
//! access or an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use stagehand_core::testing::{MockFetcher, MockPublisher, MockTranscoder};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! let transcoder = Arc::new(MockTranscoder::new());
//! transcoder.set_delay(Duration::from_millis(50)).await;
//!
//! // ... run jobs through a PipelineCoordinator ...
//!
//! assert_eq!(transcoder.max_in_flight(), 1);
//! ```

mod mock_catalog;
mod mock_fetcher;
mod mock_publisher;
mod mock_transcoder;

pub use mock_catalog::MockCatalog;
pub use mock_fetcher::MockFetcher;
pub use mock_publisher::MockPublisher;
pub use mock_transcoder::MockTranscoder;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts concurrent calls and remembers the peak.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a call as started until the guard is dropped.
    pub fn enter(&self) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            current: Arc::clone(&self.current),
        }
    }

    /// Calls running right now.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the tracker on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_peak() {
        let tracker = InFlightTracker::new();
        let a = tracker.enter();
        let b = tracker.enter();
        assert_eq!(tracker.current(), 2);
        drop(a);
        drop(b);
        let _c = tracker.enter();
        assert_eq!(tracker.current(), 1);
        assert_eq!(tracker.peak(), 2);
    }
}
