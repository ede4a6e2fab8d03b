//! Progress-callback trait for per-photo analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! events from the eager [`crate::analyze::analyze`] API. The callbacks are
//! driven by the same snapshot stream that [`crate::stream::analyze_stream`]
//! exposes, so both APIs observe identical ordering.
//!
//! # Example
//!
//! ```rust
//! use edgequake_photovibe::{AnalysisConfig, AnalysisProgressCallback, ResultItem};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, item: &ResultItem) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index + 1, total, item.file_name);
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ResultItem;
use std::sync::Arc;

/// Called by the eager pipeline as each photo resolves.
///
/// All methods default to no-ops so implementors override only what they
/// need. Implementations must be `Send + Sync`.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once after preprocessing, before the first request.
    ///
    /// `already_failed` photos failed preprocessing and will not be sent.
    fn on_run_start(&self, total: usize, already_failed: usize) {
        let _ = (total, already_failed);
    }

    /// Called when a photo reaches `Done`.
    fn on_item_complete(&self, index: usize, total: usize, item: &ResultItem) {
        let _ = (index, total, item);
    }

    /// Called when a photo sent to the model reaches `Error`.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every photo is terminal.
    fn on_run_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl AnalysisProgressCallback for Tracking {
        fn on_item_complete(&self, _index: usize, _total: usize, _item: &ResultItem) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let item = ResultItem::pending(0, "a.jpg", "image/jpeg");
        cb.on_run_start(2, 0);
        cb.on_item_complete(0, 2, &item);
        cb.on_item_error(1, 2, "boom");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_through_arc_dyn() {
        let tracker = Arc::new(Tracking::default());
        let cb: ProgressCallback = tracker.clone();
        let item = ResultItem::pending(0, "a.jpg", "image/jpeg");

        cb.on_item_complete(0, 3, &item);
        cb.on_item_complete(1, 3, &item);
        cb.on_item_error(2, 3, "timeout");
        cb.on_run_complete(3, 2);

        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }
}
