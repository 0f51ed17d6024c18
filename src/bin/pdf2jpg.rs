//! CLI binary for edgequake-pdf2jpg.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionSettings`, writes the images (and optionally a ZIP) and prints
//! a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2jpg::persist::{check_targets, write_images, write_report_archive};
use edgequake_pdf2jpg::{
    load_documents, ConversionPipeline, ConversionProgressCallback, ConversionReport,
    ConversionSettings, DocumentReport, EncodedImage, MaxWidth, ProgressCallback, RunStatus,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Some document failed, but others (or some pages) converted.
const EXIT_PARTIAL: u8 = 3;
const EXIT_FATAL: u8 = 1;

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

fn human_bytes(n: usize) -> String {
    match n {
        n if n >= 1 << 20 => format!("{:.1} MB", n as f64 / (1u64 << 20) as f64),
        n if n >= 1 << 10 => format!("{:.0} KB", n as f64 / 1024.0),
        n => format!("{n} B"),
    }
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar per document, per-page log lines above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the full progress-bar style once the page count is known.
    fn activate_bar(&self, document_id: &str, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(document_id.to_string());
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, document_id: &str, total_pages: usize) {
        self.activate_bar(document_id, total_pages);
    }

    fn on_page_complete(&self, image: &EncodedImage, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            green("✓"),
            image.page_num,
            total_pages,
            image.filename,
            dim(&format!(
                "{}x{}  {}",
                image.width,
                image.height,
                human_bytes(image.size_bytes)
            )),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, document_id: &str, page_num: Option<usize>, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        let location = match page_num {
            Some(p) => format!("Page {p:>3}"),
            None => document_id.to_string(),
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), location, red(&msg)));
    }

    fn on_document_complete(&self, report: &DocumentReport) {
        let mark = if report.is_complete() {
            green("✔")
        } else {
            cyan("⚠")
        };
        self.bar.println(format!(
            "{} {}  {} page(s)  {}",
            mark,
            bold(&report.document_id),
            report.images.len(),
            dim(&human_bytes(report.total_bytes())),
        ));
    }

    fn on_run_complete(&self, _total_documents: usize, _failed_documents: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF, default settings (zoom 2.0, quality 65, max width 1600)
  pdf2jpg --input scan.pdf

  # A folder of PDFs, smaller files, plus one ZIP for the whole batch
  pdf2jpg --input scans/ --out images --quality 45 --zip

  # Full resolution, no width cap, custom filenames
  pdf2jpg --input contract.pdf --zoom 3 --max-width 0 --prefix contract

  # Machine-readable report
  pdf2jpg --input scan.pdf --json --no-progress > report.json

OUTPUT LAYOUT:
  {out}/{document}/{prefix}_001.jpg …
  {out}/{document}_images.zip        (--zip, single document)
  {out}/{prefix}_images.zip          (--zip, several documents)

EXIT STATUS:
  0  every page of every document converted
  3  at least one document failed; the others were written
  1  fatal error (bad settings, no PDFs, output exists, I/O)

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory or file of an existing libpdfium
  RUST_LOG          Overrides the log filter (e.g. RUST_LOG=edgequake_pdf2jpg=debug)
"#;

/// Convert PDF pages to compressed JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2jpg",
    version,
    about = "Convert PDF pages to compressed JPEG images",
    long_about = "Render every page of one PDF (or every PDF in a folder) with pdfium, \
downscale to a maximum width, and save as JPEG. Optionally pack all pages into one ZIP.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// A PDF file, or a folder containing PDFs.
    #[arg(short, long, env = "PDF2JPG_INPUT")]
    input: PathBuf,

    /// Output folder.
    #[arg(short, long, env = "PDF2JPG_OUT", default_value = "output_images")]
    out: PathBuf,

    /// Render scale factor (1.0 ≈ 72 DPI, 2.0 ≈ 144 DPI).
    #[arg(long, env = "PDF2JPG_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDF2JPG_QUALITY", default_value_t = 65)]
    quality: u8,

    /// Maximum output width in pixels; 0 disables the cap.
    #[arg(long, env = "PDF2JPG_MAX_WIDTH", default_value_t = 1600)]
    max_width: u32,

    /// Filename prefix: {prefix}_001.jpg.
    #[arg(long, env = "PDF2JPG_PREFIX", default_value = "page")]
    prefix: String,

    /// Also write a ZIP archive of every page.
    #[arg(long, env = "PDF2JPG_ZIP")]
    zip: bool,

    /// Replace existing output folders and archives.
    #[arg(long, env = "PDF2JPG_OVERWRITE")]
    overwrite: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDF2JPG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2JPG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2JPG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2JPG_QUIET")]
    quiet: bool,
}

impl Cli {
    fn settings(&self) -> Result<ConversionSettings> {
        ConversionSettings::builder()
            .zoom(self.zoom)
            .quality(self.quality)
            .max_width(MaxWidth::from_pixels(self.max_width))
            .prefix(self.prefix.clone())
            .build()
            .context("Invalid settings")
    }

    fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress && !self.json
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.show_progress() {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::PartialSuccess) => ExitCode::from(EXIT_PARTIAL),
        Ok(RunStatus::Failed) => ExitCode::from(EXIT_FATAL),
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<RunStatus> {
    // Settings first: a bad flag must fail before any PDF is read.
    let settings = cli.settings()?;
    let documents = load_documents(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let mut pipeline = ConversionPipeline::pdfium().context("Failed to load the PDF engine")?;
    if cli.show_progress() {
        let cb: ProgressCallback = CliProgressCallback::new();
        pipeline = pipeline.with_progress(cb);
    }

    let report = pipeline
        .convert(&documents, &settings)
        .context("Conversion failed")?;

    write_outputs(cli, &report, &settings)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&report);
    }

    Ok(report.status())
}

fn write_outputs(cli: &Cli, report: &ConversionReport, settings: &ConversionSettings) -> Result<()> {
    check_targets(&cli.out, report, &settings.prefix, cli.zip, cli.overwrite)
        .with_context(|| format!("Refusing to write to {}", cli.out.display()))?;

    let written = write_images(&cli.out, report, cli.overwrite)
        .with_context(|| format!("Failed to write images to {}", cli.out.display()))?;

    if cli.zip && !written.is_empty() {
        let path = write_report_archive(&cli.out, report, &settings.prefix, cli.overwrite)
            .context("Failed to write archive")?;
        if !cli.quiet {
            eprintln!("{} {}", cyan("◆"), bold(&path.display().to_string()));
        }
    }
    Ok(())
}

fn print_summary(report: &ConversionReport) {
    let stats = &report.stats;
    for doc in report.documents.iter().filter(|d| !d.is_complete()) {
        if let Some(ref err) = doc.error {
            eprintln!("  {} {}: {}", red("✗"), doc.document_id, err);
        }
    }

    let mark = match report.status() {
        RunStatus::Success => green("✔"),
        RunStatus::PartialSuccess => cyan("⚠"),
        RunStatus::Failed => red("✘"),
    };
    eprintln!(
        "{}  {}/{} document(s)  {} page(s)  {}  {}ms",
        mark,
        stats.total_documents - stats.failed_documents,
        stats.total_documents,
        bold(&stats.encoded_pages.to_string()),
        human_bytes(stats.total_bytes as usize),
        stats.total_duration_ms,
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "render {}ms  /  encode {}ms",
            stats.render_duration_ms, stats.encode_duration_ms
        )),
    );
}
