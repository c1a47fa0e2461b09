//! Result types returned by the stamping entry points.

use serde::{Deserialize, Serialize};

/// Counters for one stamping run.
///
/// `skipped` counts archive entries that were silently passed over
/// (directories and entries without the qualifying `.pdf` suffix); it is
/// always zero on the single-document path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StampStats {
    /// Documents successfully stamped.
    pub processed: usize,
    /// Archive entries skipped as non-qualifying.
    pub skipped: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

/// The outcome of a stamping run: the output artifact plus counters.
///
/// `bytes` holds a stamped PDF on the single-document path, or a rebuilt
/// zip archive on the batch path. It is `None` exactly when a batch
/// enumerated zero qualifying entries (`stats.processed == 0`), which is a
/// valid outcome, not an error.
#[derive(Debug, Clone)]
pub struct StampOutcome {
    /// The output artifact, absent only for an empty batch.
    pub bytes: Option<Vec<u8>>,
    pub stats: StampStats,
}

impl StampOutcome {
    /// Outcome for a single stamped document.
    pub(crate) fn single(bytes: Vec<u8>, duration_ms: u64) -> Self {
        Self {
            bytes: Some(bytes),
            stats: StampStats {
                processed: 1,
                skipped: 0,
                duration_ms,
            },
        }
    }
}
