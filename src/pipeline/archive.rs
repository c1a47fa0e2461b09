//! Batch aggregation: stamp every qualifying entry of a zip archive.
//!
//! Entries are fully independent, so they are stamped on a bounded worker
//! pool (`buffer_unordered` over `spawn_blocking` tasks). Two rules shape
//! the rest of the design:
//!
//! * **Fail-fast.** The first per-entry failure aborts the whole batch and
//!   surfaces that error unchanged; prior successes are discarded. A shared
//!   cancellation flag keeps queued siblings from starting work once a
//!   failure has been observed. No entry is ever retried here.
//!
//! * **Deterministic output.** Workers may finish out of order, so results
//!   are keyed by their original listing index and the output archive is
//!   assembled in listing order. Same input, same output.
//!
//! Directories and entries without the `.pdf` suffix (case-sensitive) are
//! skipped silently; an archive with zero qualifying entries is a valid
//! empty outcome, not an error.

use crate::config::StampConfig;
use crate::error::StampError;
use crate::output::{StampOutcome, StampStats};
use crate::pipeline::overlay::{self, StampRequest};
use futures::stream::{self, StreamExt};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive entries qualify by this exact, case-sensitive name suffix.
pub const QUALIFYING_SUFFIX: &str = ".pdf";

/// A qualifying entry pulled out of the input archive.
#[derive(Debug)]
struct EntryJob {
    /// Position among qualifying entries, in listing order.
    index: usize,
    name: String,
    bytes: Vec<u8>,
}

/// Stamp all qualifying entries of `archive_bytes` and rebuild the archive.
///
/// Returns an outcome with no bytes when nothing qualified. See the module
/// docs for the fail-fast and ordering rules.
pub async fn stamp_entries(
    archive_bytes: &[u8],
    request: &StampRequest,
    config: &StampConfig,
) -> Result<StampOutcome, StampError> {
    let start = Instant::now();
    let (jobs, skipped) = collect_entries(archive_bytes)?;
    let total = jobs.len();
    info!("Archive listed: {} qualifying entries, {} skipped", total, skipped);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    if jobs.is_empty() {
        return Ok(StampOutcome {
            bytes: None,
            stats: StampStats {
                processed: 0,
                skipped,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        });
    }

    let request = Arc::new(request.clone());
    let cancelled = Arc::new(AtomicBool::new(false));

    let mut results = stream::iter(jobs.into_iter().map(|job| {
        let request = Arc::clone(&request);
        let cancelled = Arc::clone(&cancelled);
        async move {
            let EntryJob { index, name, bytes } = job;
            if cancelled.load(Ordering::SeqCst) {
                // A sibling already failed; the batch is doomed either way.
                return (index, name, Err(StampError::Internal("batch cancelled".into())));
            }
            let task_name = name.clone();
            let result = tokio::task::spawn_blocking(move || {
                debug!("Stamping archive entry '{}'", task_name);
                overlay::stamp_bytes(&bytes, &request)
            })
            .await
            .unwrap_or_else(|e| Err(StampError::Internal(format!("stamp task panicked: {e}"))));
            (index, name, result)
        }
    }))
    .buffer_unordered(config.concurrency);

    let mut done: Vec<(usize, String, Vec<u8>)> = Vec::with_capacity(total);
    while let Some((index, name, result)) = results.next().await {
        match result {
            Ok(bytes) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_entry_complete(&name, done.len() + 1, total);
                }
                done.push((index, name, bytes));
            }
            Err(e) => {
                cancelled.store(true, Ordering::SeqCst);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_entry_error(&name, &e);
                }
                warn!("Entry '{}' failed, aborting batch: {}", name, e);
                return Err(e);
            }
        }
    }
    drop(results);

    // Merge in listing order, not completion order.
    done.sort_by_key(|(index, _, _)| *index);
    let processed = done.len();
    let archive = write_archive(&done)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(processed, skipped);
    }
    info!("Batch complete: {}/{} entries stamped", processed, total);

    Ok(StampOutcome {
        bytes: Some(archive),
        stats: StampStats {
            processed,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        },
    })
}

/// Decode the archive listing and read every qualifying entry's payload.
///
/// Returns the jobs in listing order plus the count of skipped entries.
fn collect_entries(bytes: &[u8]) -> Result<(Vec<EntryJob>, usize), StampError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| StampError::ArchiveDecode {
            detail: e.to_string(),
        })?;

    let mut jobs = Vec::new();
    let mut skipped = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| StampError::ArchiveDecode {
            detail: format!("entry {i}: {e}"),
        })?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.ends_with(QUALIFYING_SUFFIX) {
            debug!("Skipping non-qualifying entry '{}'", name);
            skipped += 1;
            continue;
        }
        let mut payload = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut payload)
            .map_err(|e| StampError::ArchiveDecode {
                detail: format!("entry '{name}': {e}"),
            })?;
        jobs.push(EntryJob {
            index: jobs.len(),
            name,
            bytes: payload,
        });
    }
    Ok((jobs, skipped))
}

/// Serialise stamped entries into a fresh deflate-compressed archive,
/// preserving the original entry names (and with them any directory
/// structure the names imply).
fn write_archive(entries: &[(usize, String, Vec<u8>)]) -> Result<Vec<u8>, StampError> {
    let encode_err = |detail: String| StampError::Encode { detail };
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (_, name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| encode_err(format!("archive entry '{name}': {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| encode_err(format!("archive entry '{name}': {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| encode_err(format!("archive finalise: {e}")))?;
    Ok(cursor.into_inner())
}
