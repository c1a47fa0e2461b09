//! # pdfstamp
//!
//! Overlay an approval stamp — a raster image plus an issue date and an
//! issued-to line — onto the first page of PDF documents, one file at a
//! time or a whole zip archive in one call.
//!
//! ## Why this crate?
//!
//! Review workflows end with someone stamping every drawing in a submission
//! package. Doing that by hand in a PDF viewer does not scale past a handful
//! of files, and generic watermark tools cannot anchor a stamp at a fixed
//! physical offset from the page edge with per-stamp text. This crate does
//! exactly that one job: deterministic placement math, direct mutation of
//! the PDF structure, and batch aggregation with fail-fast semantics.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input bytes
//!  │
//!  ├─ 1. Classify  boundary maps extension/MIME to archive | document
//!  ├─ 2. Decode    lopdf document load (or zip listing for archives)
//!  ├─ 3. Place     fixed 250×190 pt footprint, 15 cm above the bottom edge,
//!  │               nudged by the per-profile anchor
//!  ├─ 4. Overlay   image XObject + two lines of blue Helvetica on page 0
//!  ├─ 5. Encode    full document re-serialised to bytes
//!  └─ 6. Aggregate archive path only: stamped entries re-zipped in
//!                  listing order; first failure aborts the batch
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfstamp::{process, InputKind, ProfileSet, StampConfig, StampKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load and validate all stamp assets once, at startup.
//!     let profiles = ProfileSet::bundled()?;
//!     let profile = profiles.resolve(StampKind::Hero);
//!
//!     let bytes = std::fs::read("drawings.zip")?;
//!     let outcome = process(
//!         &bytes,
//!         InputKind::Archive,
//!         profile,
//!         "2024-06-01",
//!         "ACME Construction Ltd",
//!         &StampConfig::default(),
//!     )
//!     .await?;
//!
//!     println!("stamped {} documents", outcome.stats.processed);
//!     if let Some(archive) = outcome.bytes {
//!         std::fs::write("stamped.zip", archive)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfstamp` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfstamp = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod profile;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{StampConfig, StampConfigBuilder};
pub use error::StampError;
pub use output::{StampOutcome, StampStats};
pub use pipeline::overlay::{placement, Placement, StampRequest};
pub use process::{
    process, process_to_file, stamp_archive, stamp_document, stamp_document_sync, InputKind,
};
pub use profile::{AssetSource, BundledAssets, ProfileSet, StampImage, StampKind, StampProfile};
pub use progress::{ProgressCallback, StampProgressCallback};
