//! Top-level stamping entry points and the archive/document dispatcher.
//!
//! The boundary layer (CLI, HTTP handler, queue consumer) owns input
//! classification: it decides from the file extension or MIME type whether
//! the payload is a single document, an archive, or something this crate
//! does not handle, and it is responsible for trimming and validating the
//! text fields. [`process`] exposes exactly that two-branch contract and
//! rejects `Unsupported` before any decoding is attempted.

use crate::config::StampConfig;
use crate::error::StampError;
use crate::output::StampOutcome;
use crate::pipeline::{archive, overlay};
use crate::profile::StampProfile;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

pub use crate::pipeline::overlay::StampRequest;

/// How the boundary classified the input payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// A zip archive of documents.
    Archive,
    /// A single PDF document.
    Document,
    /// Anything else; rejected before decoding.
    Unsupported,
}

impl InputKind {
    /// Classify by file extension (matched case-insensitively, as the
    /// boundary sees user-supplied file names).
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "zip" => InputKind::Archive,
            "pdf" => InputKind::Document,
            _ => InputKind::Unsupported,
        }
    }

    /// Classify by a path's extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(InputKind::Unsupported)
    }

    /// Classify by MIME type, for boundaries that trust upload metadata.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/zip" | "application/x-zip-compressed" => InputKind::Archive,
            "application/pdf" => InputKind::Document,
            _ => InputKind::Unsupported,
        }
    }
}

/// Stamp a single PDF document.
///
/// The CPU-bound decode → mutate → encode core runs under
/// `spawn_blocking` so callers on an async runtime are never stalled.
///
/// # Errors
/// [`StampError::Decode`] for malformed input, [`StampError::EmptyDocument`]
/// for a PDF with zero pages, [`StampError::Encode`] if re-encoding fails,
/// [`StampError::InvalidRequest`] for blank text fields.
pub async fn stamp_document(
    bytes: &[u8],
    profile: &StampProfile,
    issue_date: &str,
    issued_to: &str,
) -> Result<Vec<u8>, StampError> {
    let request = StampRequest::new(profile.clone(), issue_date, issued_to)?;
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || overlay::stamp_bytes(&bytes, &request))
        .await
        .map_err(|e| StampError::Internal(format!("stamp task panicked: {e}")))?
}

/// Synchronous variant of [`stamp_document`] for callers without a runtime.
pub fn stamp_document_sync(
    bytes: &[u8],
    profile: &StampProfile,
    issue_date: &str,
    issued_to: &str,
) -> Result<Vec<u8>, StampError> {
    let request = StampRequest::new(profile.clone(), issue_date, issued_to)?;
    overlay::stamp_bytes(bytes, &request)
}

/// Stamp every qualifying entry of a zip archive.
///
/// Fail-fast: the first per-entry error aborts the batch and is returned
/// unchanged. An archive with zero qualifying entries yields an outcome
/// with `processed == 0` and no bytes, not an error.
pub async fn stamp_archive(
    bytes: &[u8],
    profile: &StampProfile,
    issue_date: &str,
    issued_to: &str,
    config: &StampConfig,
) -> Result<StampOutcome, StampError> {
    let request = StampRequest::new(profile.clone(), issue_date, issued_to)?;
    archive::stamp_entries(bytes, &request, config).await
}

/// Dispatch on the boundary's input classification.
///
/// This is the primary entry point for embedders: one call covering both
/// the single-document and the batch path.
pub async fn process(
    bytes: &[u8],
    kind: InputKind,
    profile: &StampProfile,
    issue_date: &str,
    issued_to: &str,
    config: &StampConfig,
) -> Result<StampOutcome, StampError> {
    info!("Processing {:?} input ({} bytes)", kind, bytes.len());
    match kind {
        InputKind::Unsupported => Err(StampError::UnsupportedInput {
            detail: "input was classified as neither a PDF document nor a zip archive".into(),
        }),
        InputKind::Document => {
            let start = Instant::now();
            let stamped = stamp_document(bytes, profile, issue_date, issued_to).await?;
            Ok(StampOutcome::single(
                stamped,
                start.elapsed().as_millis() as u64,
            ))
        }
        InputKind::Archive => stamp_archive(bytes, profile, issue_date, issued_to, config).await,
    }
}

/// Run [`process`] and write the artifact to `output_path` atomically: a
/// uniquely named temp file in the target directory, persisted over the
/// destination once fully written. A failed run never leaves a partial
/// file, and sibling files are never clobbered.
///
/// Returns the outcome with its bytes still attached; when the outcome has
/// no bytes (empty batch) nothing is written.
pub async fn process_to_file(
    bytes: &[u8],
    kind: InputKind,
    profile: &StampProfile,
    issue_date: &str,
    issued_to: &str,
    config: &StampConfig,
    output_path: impl AsRef<Path>,
) -> Result<StampOutcome, StampError> {
    let mut outcome = process(bytes, kind, profile, issue_date, issued_to, config).await?;
    let path = output_path.as_ref();

    if let Some(artifact) = outcome.bytes.take() {
        let write_err = |source: std::io::Error| StampError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        // The temp file must live on the same filesystem as the target for
        // the final rename to stay atomic.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await.map_err(write_err)?;

        let target = path.to_path_buf();
        let artifact = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, std::io::Error> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&artifact)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(artifact)
        })
        .await
        .map_err(|e| StampError::Internal(format!("write task panicked: {e}")))?
        .map_err(write_err)?;
        outcome.bytes = Some(artifact);
    }

    Ok(outcome)
}
