//! The conversion pipeline: rasterise → encode → name, per page, per document.
//!
//! [`ConversionPipeline::convert`] is the eager API: it walks every document
//! in input order and returns a [`ConversionReport`]. [`ConversionPipeline::pages`]
//! is the lazy one: an iterator over a single document's pages that renders
//! each page only when asked, so a preview or an archive writer can consume
//! pages one at a time without holding the whole batch in memory.
//!
//! ## Failure isolation
//!
//! Settings are validated once, before any document is opened. After that,
//! nothing a document does can fail the run: a render or encode error stops
//! that document, keeps the pages it already produced, and the next document
//! is attempted as normal.

use crate::config::ConversionSettings;
use crate::error::{PageError, Pdf2JpgError, RenderError};
use crate::output::{ConversionReport, ConversionStats, DocumentReport, EncodedImage};
use crate::pipeline::archive::{assign_namespaces, namespace_for};
use crate::pipeline::encode::{ImageEncoder, JpegEncoder};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::naming::NameRegistry;
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer, RasterDocument};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Convert documents with the pdfium rasteriser and the JPEG encoder.
///
/// Settings are checked before pdfium is even bound, so an invalid run never
/// touches the documents.
///
/// # Errors
/// Returns `Err` only for fatal problems: invalid settings or a missing
/// pdfium library. Per-document failures are in the report.
pub fn convert(
    documents: &[SourceDocument],
    settings: &ConversionSettings,
) -> Result<ConversionReport, Pdf2JpgError> {
    settings.validate()?;
    ConversionPipeline::pdfium()?.convert(documents, settings)
}

/// Load a PDF file (or every PDF in a folder) and convert it.
pub fn convert_path(
    input_path: impl AsRef<Path>,
    settings: &ConversionSettings,
) -> Result<ConversionReport, Pdf2JpgError> {
    settings.validate()?;
    let documents = input::load_documents(input_path.as_ref())?;
    convert(&documents, settings)
}

/// Rasteriser + encoder + optional progress callback.
pub struct ConversionPipeline<R = PdfiumRasterizer, E = JpegEncoder> {
    rasterizer: R,
    encoder: E,
    progress: Option<ProgressCallback>,
}

impl ConversionPipeline<PdfiumRasterizer, JpegEncoder> {
    /// The production pipeline: pdfium in, JPEG out.
    pub fn pdfium() -> Result<Self, Pdf2JpgError> {
        Ok(Self::new(PdfiumRasterizer::new()?, JpegEncoder))
    }
}

impl<R, E> fmt::Debug for ConversionPipeline<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("rasterizer", &std::any::type_name::<R>())
            .field("encoder", &std::any::type_name::<E>())
            .field("progress", &self.progress.as_ref().map(|_| "<dyn ConversionProgressCallback>"))
            .finish()
    }
}

impl<R: PageRasterizer, E: ImageEncoder> ConversionPipeline<R, E> {
    pub fn new(rasterizer: R, encoder: E) -> Self {
        Self {
            rasterizer,
            encoder,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Lazily convert one document.
    ///
    /// The document is opened here; if it will not open, the iterator yields
    /// that error once and ends. Names are registered in a fresh
    /// [`NameRegistry`] under the namespace derived from the document id.
    pub fn pages<'a>(
        &'a self,
        document: &'a SourceDocument,
        settings: &ConversionSettings,
    ) -> Result<DocumentPages<'a>, Pdf2JpgError> {
        settings.validate()?;
        Ok(self.document_pages(
            document,
            namespace_for(document.id()),
            settings.clone(),
            NameRegistry::new(),
        ))
    }

    pub(crate) fn document_pages<'a>(
        &'a self,
        document: &'a SourceDocument,
        namespace: String,
        settings: ConversionSettings,
        registry: NameRegistry,
    ) -> DocumentPages<'a> {
        let (opened, total_pages, pending_error) = match self.rasterizer.open(document) {
            // Nothing to produce is a failure of the document, not a success.
            Ok(doc) if doc.page_count() == 0 => {
                let e = RenderError::CorruptPdf {
                    document: document.id().to_string(),
                    detail: "document has no pages".to_string(),
                };
                (None, Some(0), Some(PageError::render(0, &e)))
            }
            Ok(doc) => {
                let total = doc.page_count();
                (Some(doc), Some(total), None)
            }
            Err(e) => (None, None, Some(PageError::render(0, &e))),
        };

        DocumentPages {
            document_id: document.id(),
            namespace,
            opened,
            pending_error,
            encoder: &self.encoder,
            settings,
            registry,
            next_page: 1,
            total_pages,
            timings: StageTimings::default(),
            done: false,
        }
    }

    /// Convert every document, in order, and report what happened.
    ///
    /// # Errors
    /// Only [`Pdf2JpgError::InvalidConfig`], raised before any document is
    /// opened. Document failures are recorded in the report.
    pub fn convert(
        &self,
        documents: &[SourceDocument],
        settings: &ConversionSettings,
    ) -> Result<ConversionReport, Pdf2JpgError> {
        settings.validate()?;
        let total_start = Instant::now();
        info!(
            "Starting conversion of {} document(s): zoom={}, quality={}, max_width={}",
            documents.len(),
            settings.zoom,
            settings.quality,
            settings.max_width
        );

        if let Some(ref cb) = self.progress {
            cb.on_run_start(documents.len());
        }

        let namespaces = assign_namespaces(documents.iter().map(|d| d.id()));
        let mut registry = NameRegistry::new();
        let mut reports = Vec::with_capacity(documents.len());
        let mut stats = ConversionStats {
            total_documents: documents.len(),
            ..ConversionStats::default()
        };

        for (document, namespace) in documents.iter().zip(namespaces) {
            let mut pages = self.document_pages(document, namespace, settings.clone(), registry);
            let report = self.drain_document(&mut pages);

            stats.render_duration_ms += pages.timings.render.as_millis() as u64;
            stats.encode_duration_ms += pages.timings.encode.as_millis() as u64;
            registry = pages.into_registry();

            if report.is_complete() {
                info!(
                    "'{}': {} page(s) converted",
                    report.document_id,
                    report.images.len()
                );
            } else {
                stats.failed_documents += 1;
            }
            stats.encoded_pages += report.images.len();
            stats.total_bytes += report.total_bytes() as u64;

            if let Some(ref cb) = self.progress {
                cb.on_document_complete(&report);
            }
            reports.push(report);
        }

        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!(
            "Conversion complete: {}/{} document(s), {} page(s), {} bytes, {}ms total",
            stats.total_documents - stats.failed_documents,
            stats.total_documents,
            stats.encoded_pages,
            stats.total_bytes,
            stats.total_duration_ms
        );

        if let Some(ref cb) = self.progress {
            cb.on_run_complete(stats.total_documents, stats.failed_documents);
        }

        Ok(ConversionReport {
            documents: reports,
            stats,
        })
    }

    /// Pull every page out of `pages`, firing progress events as we go.
    fn drain_document(&self, pages: &mut DocumentPages<'_>) -> DocumentReport {
        let document_id = pages.document_id();
        let total = pages.total_pages();
        if let (Some(cb), Some(total)) = (self.progress.as_ref(), total) {
            cb.on_document_start(document_id, total);
        }

        let mut images = Vec::with_capacity(total.unwrap_or(0));
        let mut failure = None;
        for result in &mut *pages {
            match result {
                Ok(image) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_page_complete(&image, total.unwrap_or(0));
                    }
                    images.push(image);
                }
                Err(e) => {
                    match e {
                        PageError::Naming { .. } => error!("'{}': {}", document_id, e),
                        _ => warn!(
                            "'{}': stopped after {} page(s): {}",
                            document_id,
                            images.len(),
                            e
                        ),
                    }
                    if let Some(ref cb) = self.progress {
                        cb.on_page_error(document_id, e.page(), &e.to_string());
                    }
                    failure = Some(e);
                }
            }
        }

        DocumentReport {
            document_id: document_id.to_string(),
            namespace: pages.namespace().to_string(),
            total_pages: total,
            images,
            error: failure,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct StageTimings {
    render: Duration,
    encode: Duration,
}

/// Lazy, ordered page results for one document.
///
/// Yields `Ok(EncodedImage)` for page 1, 2, … and stops after the last page
/// or after the first `Err`, whichever comes first. The document handle is
/// released as soon as the iterator finishes, or when it is dropped.
pub struct DocumentPages<'a> {
    document_id: &'a str,
    namespace: String,
    opened: Option<Box<dyn RasterDocument + 'a>>,
    pending_error: Option<PageError>,
    encoder: &'a dyn ImageEncoder,
    settings: ConversionSettings,
    registry: NameRegistry,
    next_page: usize,
    total_pages: Option<usize>,
    timings: StageTimings,
    done: bool,
}

impl fmt::Debug for DocumentPages<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPages")
            .field("document_id", &self.document_id)
            .field("namespace", &self.namespace)
            .field("next_page", &self.next_page)
            .field("total_pages", &self.total_pages)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'a> DocumentPages<'a> {
    pub fn document_id(&self) -> &'a str {
        self.document_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Page count, or `None` if the document did not open.
    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }

    /// Hand the registry back so the next document can extend it.
    pub fn into_registry(self) -> NameRegistry {
        self.registry
    }

    fn finish(&mut self) {
        self.done = true;
        self.opened = None;
    }
}

impl Iterator for DocumentPages<'_> {
    type Item = Result<EncodedImage, PageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(err) = self.pending_error.take() {
            self.finish();
            return Some(Err(err));
        }

        let total = self.total_pages.unwrap_or(0);
        let page_num = self.next_page;
        let Some(doc) = self.opened.as_deref() else {
            self.finish();
            return None;
        };
        if page_num > total {
            self.finish();
            return None;
        }
        self.next_page += 1;

        let result = produce_page(
            doc,
            self.encoder,
            &self.settings,
            &mut self.registry,
            &self.namespace,
            page_num,
            total,
            &mut self.timings,
        );
        if result.is_err() {
            self.finish();
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        if self.pending_error.is_some() {
            return (1, Some(1));
        }
        let remaining = self
            .total_pages
            .unwrap_or(0)
            .saturating_sub(self.next_page - 1);
        (0, Some(remaining))
    }
}

#[allow(clippy::too_many_arguments)]
fn produce_page(
    doc: &dyn RasterDocument,
    encoder: &dyn ImageEncoder,
    settings: &ConversionSettings,
    registry: &mut NameRegistry,
    namespace: &str,
    page_num: usize,
    total: usize,
    timings: &mut StageTimings,
) -> Result<EncodedImage, PageError> {
    let start = Instant::now();
    let rendered = doc
        .render_page(page_num, settings.zoom)
        .map_err(|e| PageError::render(page_num, &e))?;
    timings.render += start.elapsed();

    let start = Instant::now();
    let encoded = encoder
        .encode(&rendered, settings.quality, settings.max_width)
        .map_err(|e| PageError::encode(page_num, &e))?;
    timings.encode += start.elapsed();

    let filename = registry
        .assign(&settings.prefix, page_num, total, namespace)
        .map_err(|e| PageError::naming(page_num, &e))?;

    debug!(
        "{}/{}: {}x{} → {}x{} ({} bytes)",
        namespace,
        filename,
        rendered.width(),
        rendered.height(),
        encoded.width,
        encoded.height,
        encoded.bytes.len()
    );

    Ok(EncodedImage {
        document_id: rendered.document_id,
        page_num,
        filename,
        width: encoded.width,
        height: encoded.height,
        size_bytes: encoded.bytes.len(),
        bytes: encoded.bytes,
    })
}
