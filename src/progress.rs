//! Progress-callback trait for per-document and per-page conversion events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::convert::ConversionPipeline::with_progress`] to receive events as
//! the pipeline works through each document. The CLI uses it to drive its
//! progress bar; a notebook-style preview could use `on_page_complete` to
//! show thumbnails as they arrive.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2jpg::{ConversionProgressCallback, EncodedImage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, image: &EncodedImage, total_pages: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} {}/{}", image.filename, image.page_num, total_pages);
//!     }
//! }
//! ```

use crate::output::{DocumentReport, EncodedImage};
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each document and page.
///
/// All methods default to no-ops so callers only override what they care
/// about. Events arrive in order from a single thread, but the trait is
/// `Send + Sync` so the same callback can be moved into
/// [`crate::stream::convert_stream`]'s blocking worker.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first document.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after a document opened and its page count is known.
    fn on_document_start(&self, document_id: &str, total_pages: usize) {
        let _ = (document_id, total_pages);
    }

    /// Called after each page is rendered, encoded and named.
    fn on_page_complete(&self, image: &EncodedImage, total_pages: usize) {
        let _ = (image, total_pages);
    }

    /// Called when a document stops early.
    ///
    /// `page_num` is `None` when the document never opened.
    fn on_page_error(&self, document_id: &str, page_num: Option<usize>, error: &str) {
        let _ = (document_id, page_num, error);
    }

    /// Called once per document, whether it succeeded or not.
    fn on_document_complete(&self, report: &DocumentReport) {
        let _ = report;
    }

    /// Called once after every document has been attempted.
    fn on_run_complete(&self, total_documents: usize, failed_documents: usize) {
        let _ = (total_documents, failed_documents);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
