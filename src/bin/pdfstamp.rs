//! CLI binary for pdfstamp.
//!
//! A thin shim over the library crate: classifies the input by extension
//! (a boundary concern the core deliberately does not own), maps CLI flags
//! to `StampConfig`, and writes the artifact.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfstamp::{
    process_to_file, InputKind, ProfileSet, StampConfig, StampError, StampProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across the batch, a log line per
/// entry. Entries may complete out of listing order in concurrent mode.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Bar length is set by `on_batch_start` once the listing is decoded.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading archive…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StampProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Stamping");
    }

    fn on_entry_complete(&self, name: &str, _completed: usize, total: usize) {
        self.bar
            .println(format!("  {} {:<40} {}", green("✓"), name, dim(&format!("of {total}"))));
        self.bar.inc(1);
    }

    fn on_entry_error(&self, name: &str, error: &StampError) {
        self.bar
            .println(format!("  {} {:<40} {}", red("✗"), name, red(&error.to_string())));
        self.bar.abandon();
    }

    fn on_batch_complete(&self, processed: usize, skipped: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} documents stamped{}",
            green("✔"),
            bold(&processed.to_string()),
            if skipped > 0 {
                dim(&format!("  ({skipped} entries skipped)"))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Stamp a single drawing
  pdfstamp drawing.pdf --stamp-type 1 --date 2024-06-01 --issued-to "ACME Ltd"

  # Stamp every PDF inside a submission package
  pdfstamp package.zip -t 2 -d 2024-06-01 --issued-to "ACME Ltd" -o stamped.zip

  # Machine-readable stats
  pdfstamp package.zip -t 3 -d 2024-06-01 --issued-to "ACME Ltd" --json

STAMP TYPES:
  Id  Stamp          Image
  ──  ─────────────  ────────────────
  1   hero           hero.png
  2   as-built       asbuilt.png
  3   construction   construction.png

Only .pdf and .zip inputs are accepted. Inside an archive, entries whose
names end in `.pdf` (case-sensitive) are stamped; directories and any other
entries are skipped. One bad document aborts the whole batch and nothing is
written.
"#;

/// Overlay an approval stamp onto the first page of PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfstamp",
    version,
    about = "Overlay an approval stamp (image + date + issued-to) onto PDFs, single files or zip archives",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input .pdf document or .zip archive of documents.
    input: PathBuf,

    /// Write the stamped artifact here instead of stamped.pdf / stamped.zip.
    #[arg(short, long, env = "PDFSTAMP_OUTPUT")]
    output: Option<PathBuf>,

    /// Stamp type: 1 (hero), 2 (as-built) or 3 (construction).
    #[arg(short = 't', long, env = "PDFSTAMP_TYPE")]
    stamp_type: String,

    /// Issue date drawn on the stamp, verbatim.
    #[arg(short, long, env = "PDFSTAMP_DATE")]
    date: String,

    /// Recipient line drawn below the date, verbatim.
    #[arg(long, env = "PDFSTAMP_ISSUED_TO")]
    issued_to: String,

    /// Number of archive entries stamped concurrently.
    #[arg(short, long, env = "PDFSTAMP_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output run statistics as JSON on stdout.
    #[arg(long, env = "PDFSTAMP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFSTAMP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSTAMP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSTAMP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Boundary validation ──────────────────────────────────────────────
    let date = cli.date.trim();
    let issued_to = cli.issued_to.trim();
    if date.is_empty() {
        bail!("--date must not be empty");
    }
    if issued_to.is_empty() {
        bail!("--issued-to must not be empty");
    }

    let kind = InputKind::from_path(&cli.input);
    if kind == InputKind::Unsupported {
        bail!(
            "Unsupported input '{}': only .pdf and .zip are accepted",
            cli.input.display()
        );
    }

    // Eager asset validation: a corrupt bundled stamp should fail here,
    // before any user document is touched.
    let profiles = ProfileSet::bundled().context("Failed to load stamp assets")?;
    let profile = profiles
        .resolve_id(&cli.stamp_type)
        .context("Invalid --stamp-type")?;

    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read '{}'", cli.input.display()))?;

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = StampConfig::builder().concurrency(cli.concurrency);
    if show_progress && kind == InputKind::Archive {
        builder = builder.progress_callback(CliProgressCallback::new_dynamic());
    }
    let config = builder.build().context("Invalid configuration")?;

    let output_path = cli.output.clone().unwrap_or_else(|| match kind {
        InputKind::Archive => PathBuf::from("stamped.zip"),
        _ => PathBuf::from("stamped.pdf"),
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = process_to_file(&bytes, kind, profile, date, issued_to, &config, &output_path)
        .await
        .context("Stamping failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome.stats).context("Failed to serialise stats")?
        );
        return Ok(());
    }

    if outcome.bytes.is_none() {
        if !cli.quiet {
            eprintln!(
                "{} no qualifying .pdf entries in '{}' — nothing written",
                cyan("⚠"),
                cli.input.display()
            );
        }
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} stamped  {}ms  →  {}",
            green("✔"),
            bold(&format!(
                "{} document{}",
                outcome.stats.processed,
                if outcome.stats.processed == 1 { "" } else { "s" }
            )),
            outcome.stats.duration_ms,
            bold(&output_path.display().to_string()),
        );
        if outcome.stats.skipped > 0 {
            eprintln!(
                "   {}",
                dim(&format!("{} non-qualifying entries skipped", outcome.stats.skipped))
            );
        }
    }

    Ok(())
}
