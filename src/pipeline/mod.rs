//! Pipeline stages for document stamping.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! single:   document ──▶ overlay ──▶ bytes
//!           (lopdf)      (page 0)
//!
//! archive:  archive ──▶ per-entry overlay ──▶ archive
//!           (zip read)  (worker pool)         (zip write)
//! ```
//!
//! 1. [`document`] — decode PDF bytes and resolve first-page geometry
//! 2. [`overlay`]  — placement math and first-page mutation; CPU-bound,
//!    callers run it under `spawn_blocking`
//! 3. [`archive`]  — enumerate qualifying zip entries, drive the overlay per
//!    entry with fail-fast abort, and re-aggregate the output archive

pub mod archive;
pub mod document;
pub mod overlay;
