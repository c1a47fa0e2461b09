//! Configuration for batch stamping.
//!
//! Single-document stamping has no knobs: the placement profile carries
//! everything. [`StampConfig`] controls the batch path only — how many
//! archive entries are stamped in parallel and where progress events go.
//! Built via [`StampConfig::builder()`] in the same builder idiom as the
//! rest of the crate's surface.

use crate::error::StampError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for [`crate::stamp_archive`] and [`crate::process`].
#[derive(Clone)]
pub struct StampConfig {
    /// Number of archive entries stamped concurrently. Default: 4.
    ///
    /// Stamping is CPU-bound (decode, mutate, re-encode), so there is no
    /// point going far beyond the physical core count. Entries are fully
    /// independent; the output archive order is fixed by the input listing
    /// regardless of completion order.
    pub concurrency: usize,

    /// Optional receiver for per-entry batch events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StampConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StampConfig")
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn StampProgressCallback>"),
            )
            .finish()
    }
}

impl StampConfig {
    /// Create a new builder for `StampConfig`.
    pub fn builder() -> StampConfigBuilder {
        StampConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StampConfig`].
#[derive(Debug)]
pub struct StampConfigBuilder {
    config: StampConfig,
}

impl StampConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StampConfig, StampError> {
        if self.config.concurrency == 0 {
            return Err(StampError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_zero_concurrency() {
        let config = StampConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn default_is_valid() {
        let config = StampConfig::default();
        assert!(config.concurrency >= 1);
        assert!(config.progress_callback.is_none());
    }
}
