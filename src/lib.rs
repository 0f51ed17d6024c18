//! # edgequake-pdf2jpg
//!
//! Convert every page of one or more PDF documents into compressed JPEG
//! images, and optionally pack them into a single ZIP archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input    load a file or a folder of PDFs, de-duplicate names
//!  ├─ 2. Render   rasterise each page via pdfium at a zoom factor
//!  ├─ 3. Encode   flatten alpha, cap the width, JPEG at a quality level
//!  ├─ 4. Name     {prefix}_{NNN}.jpg, unique per document namespace
//!  └─ 5. Archive  one ZIP, documents in input order, pages in page order
//! ```
//!
//! Documents fail independently: a corrupt PDF is reported in the
//! [`ConversionReport`] and the next document is converted as normal. Only
//! invalid settings abort a run, and they do so before any document is
//! touched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2jpg::{convert_path, ArchiveBuilder, ConversionSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConversionSettings::builder()
//!         .zoom(2.0)
//!         .quality(65)
//!         .build()?;
//!     let report = convert_path("scan.pdf", &settings)?;
//!     for image in report.images() {
//!         println!("{} {}x{} {} bytes", image.filename, image.width, image.height, image.size_bytes);
//!     }
//!     let zip = ArchiveBuilder::new().add_reports(&report.documents).build()?;
//!     std::fs::write("scan_images.zip", zip)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2jpg` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2jpg = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The pdfium shared library is loaded at runtime from `PDFIUM_LIB_PATH`,
//! the current directory, or the system library path, in that order.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionSettings, ConversionSettingsBuilder, MaxWidth};
pub use convert::{convert, convert_path, ConversionPipeline, DocumentPages};
pub use error::{EncodeError, NamingError, PageError, Pdf2JpgError, RenderError};
pub use output::{ConversionReport, ConversionStats, DocumentReport, EncodedImage, RunStatus};
pub use pipeline::archive::ArchiveBuilder;
pub use pipeline::encode::{ImageEncoder, JpegEncoder};
pub use pipeline::input::{load_documents, SourceDocument};
pub use pipeline::naming::NameRegistry;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer, RasterDocument, RenderedPage};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, convert_stream_with, PageEvent, PageStream};
