//! Error types for the edgequake-pdf2jpg library.
//!
//! Errors come in two tiers:
//!
//! * [`Pdf2JpgError`] is **fatal**: the run cannot proceed at all (invalid
//!   settings, missing input, unwritable output). Returned as `Err` from the
//!   top-level entry points. Settings errors are raised before any document
//!   is opened.
//!
//! * [`PageError`] is **non-fatal**: one document stopped at one page (corrupt
//!   PDF, encoder failure). Stored inside [`crate::output::DocumentReport`] so
//!   the pages converted before the failure are kept and sibling documents
//!   are still attempted.
//!
//! The stage-level errors [`RenderError`], [`EncodeError`] and [`NamingError`]
//! are what the individual pipeline stages return; the pipeline tags them with
//! a page number and folds them into [`PageError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2jpg library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::DocumentReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2JpgError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Settings validation failed. Raised before any document is touched.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input was a folder (or a non-PDF file) with no PDFs to convert.
    #[error("No PDF files found in '{path}'")]
    NoPdfFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Output errors ─────────────────────────────────────────────────────
    /// An output folder already exists and overwriting was not requested.
    #[error("Output folder already exists: '{path}'\nUse --overwrite to replace it, or choose another --out directory.")]
    OutputExists { path: PathBuf },

    /// Could not create or write an output file.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP writer rejected an entry or failed to finish the archive.
    #[error("Failed to build archive: {0}")]
    Archive(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide (see github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to rasterise a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The document bytes could not be parsed as a PDF.
    #[error("document '{document}' is not a readable PDF: {detail}")]
    CorruptPdf { document: String, detail: String },

    /// The document is encrypted.
    #[error("document '{document}' is encrypted and requires a password")]
    PasswordRequired { document: String },

    /// Requested page is 0 or past the end of the document.
    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Zoom must be a positive, finite scale factor.
    #[error("zoom must be a positive number, got {zoom}")]
    InvalidZoom { zoom: String },

    /// The rendering backend returned an error for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },
}

/// Failure to turn a pixel buffer into JPEG bytes.
///
/// Upstream validation makes the first two variants unreachable from the
/// pipeline; seeing one means an internal invariant broke.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Quality outside 1–100.
    #[error("quality must be 1–100, got {0}")]
    InvalidQuality(u8),

    /// Zero-width or zero-height buffer.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// The JPEG codec itself failed.
    #[error("JPEG encoding failed: {0}")]
    Codec(String),
}

impl From<image::ImageError> for EncodeError {
    fn from(e: image::ImageError) -> Self {
        EncodeError::Codec(e.to_string())
    }
}

/// A filename was requested twice in the same archive namespace.
///
/// Page numbers are unique by construction, so this only fires when the
/// caller drives the namer incorrectly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("output name '{filename}' already assigned in namespace '{namespace}'")]
    Duplicate { namespace: String, filename: String },
}

/// A non-fatal error for one page of one document.
///
/// `page` is 1-based; `0` means the document failed before any page could be
/// addressed (e.g. it would not open).
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    /// Page (or whole document) could not be rendered.
    #[error("{}", describe("render", .page, .detail))]
    Render { page: usize, detail: String },

    /// Rendered pixels could not be encoded.
    #[error("{}", describe("encode", .page, .detail))]
    Encode { page: usize, detail: String },

    /// Naming collision: an orchestration bug, not a user error.
    #[error("{}", describe("naming", .page, .detail))]
    Naming { page: usize, detail: String },
}

fn describe(stage: &str, page: &usize, detail: &str) -> String {
    if *page == 0 {
        format!("document: {stage} failed: {detail}")
    } else {
        format!("Page {page}: {stage} failed: {detail}")
    }
}

impl PageError {
    pub fn render(page: usize, err: &RenderError) -> Self {
        PageError::Render {
            page,
            detail: err.to_string(),
        }
    }

    pub fn encode(page: usize, err: &EncodeError) -> Self {
        PageError::Encode {
            page,
            detail: err.to_string(),
        }
    }

    pub fn naming(page: usize, err: &NamingError) -> Self {
        PageError::Naming {
            page,
            detail: err.to_string(),
        }
    }

    /// The 1-based page that failed, or `None` for document-level failures.
    pub fn page(&self) -> Option<usize> {
        let page = match self {
            PageError::Render { page, .. }
            | PageError::Encode { page, .. }
            | PageError::Naming { page, .. } => *page,
        };
        (page > 0).then_some(page)
    }
}
