//! Progress-callback trait for per-entry batch events.
//!
//! Inject an [`Arc<dyn StampProgressCallback>`] via
//! [`crate::config::StampConfigBuilder::progress_callback`] to receive
//! real-time events while an archive is being stamped.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a WebSocket, or a log
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` so it works when entries are stamped concurrently.
//!
//! Every method has a no-op default, so implementors only override what
//! they care about. None of the events fire on the single-document path.

use crate::error::StampError;
use std::sync::Arc;

/// Receives batch-stamping lifecycle events.
pub trait StampProgressCallback: Send + Sync {
    /// The archive listing has been decoded; `total` qualifying entries
    /// will be stamped.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// One entry finished successfully. `completed` counts successes so
    /// far; entries may complete out of listing order in concurrent mode.
    fn on_entry_complete(&self, name: &str, completed: usize, total: usize) {
        let _ = (name, completed, total);
    }

    /// One entry failed. The batch aborts right after this event.
    fn on_entry_error(&self, name: &str, error: &StampError) {
        let _ = (name, error);
    }

    /// The whole batch succeeded.
    fn on_batch_complete(&self, processed: usize, skipped: usize) {
        let _ = (processed, skipped);
    }
}

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn StampProgressCallback>;
