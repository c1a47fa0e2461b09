//! Error types for the pdfstamp library.
//!
//! Every variant of [`StampError`] is terminal for the current request: the
//! core never retries on its own, and the batch aggregator aborts the whole
//! archive on the first per-entry failure (fail-fast). Two variants deserve
//! special handling by embedders:
//!
//! * [`StampError::AssetLoad`] — a bundled stamp image is missing or corrupt.
//!   This is a deployment defect, not user input; it surfaces eagerly from
//!   [`crate::profile::ProfileSet::load`] at startup so a misconfigured
//!   binary fails before it accepts any work.
//!
//! * [`StampError::InvalidRequest`] — the caller handed an empty issue date
//!   or issued-to string. The boundary layer is expected to trim and reject
//!   these before invoking the core; this variant is the backstop.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfstamp library.
#[derive(Debug, Error)]
pub enum StampError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The stamp-type identifier is not one of the declared ids {1, 2, 3}.
    #[error("Invalid stamp type '{value}': expected 1 (hero), 2 (as-built) or 3 (construction)")]
    InvalidStampType { value: String },

    /// The input was classified as neither a PDF nor a zip archive.
    #[error("Unsupported input type: {detail}\nOnly .pdf documents and .zip archives are accepted.")]
    UnsupportedInput { detail: String },

    /// Issue date or issued-to string was empty after trimming.
    #[error("Invalid stamp request: {0}")]
    InvalidRequest(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// The document bytes could not be parsed as a PDF.
    #[error("Failed to decode PDF: {detail}")]
    Decode { detail: String },

    /// The document parsed but contains no pages, so there is no first page
    /// to stamp.
    #[error("The PDF does not contain any pages")]
    EmptyDocument,

    /// The stamped document could not be re-encoded to bytes.
    #[error("Failed to re-encode stamped PDF: {detail}")]
    Encode { detail: String },

    // ── Archive errors ────────────────────────────────────────────────────
    /// The archive bytes could not be read as a zip listing.
    #[error("Failed to decode zip archive: {detail}")]
    ArchiveDecode { detail: String },

    // ── Deployment errors ─────────────────────────────────────────────────
    /// A stamp image asset is missing or not a decodable PNG.
    ///
    /// Indicates a broken build or packaging, never bad user input.
    #[error("Failed to load stamp asset for type {kind}: {detail}\nThis is a deployment defect — rebuild with intact assets/.")]
    AssetLoad { kind: u8, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked worker task, poisoned state).
    #[error("Internal error: {0}")]
    Internal(String),
}
