//! PDF rasterisation: render one page to a `DynamicImage` at a given zoom.
//!
//! The pipeline talks to [`PageRasterizer`], not to pdfium directly. Opening
//! a document yields a [`RasterDocument`] handle that borrows the source
//! bytes and is released when dropped, so a failed page never leaks an open
//! document. [`PdfiumRasterizer`] is the production backend.
//!
//! ## Zoom
//!
//! pdfium measures pages in points (1/72 inch). `scale_page_by_factor(zoom)`
//! multiplies those dimensions, so a US-Letter page (612 × 792 pt) renders
//! at 1224 × 1584 px with zoom 2.0. Pixel count, memory and render time all
//! grow with the square of the zoom.

use crate::error::{Pdf2JpgError, RenderError};
use crate::pipeline::input::SourceDocument;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Uncompressed pixels for one page of one document.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Identifier of the owning document.
    pub document_id: String,
    /// 1-indexed page number.
    pub page_num: usize,
    pub image: DynamicImage,
}

impl RenderedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A rendering backend.
pub trait PageRasterizer {
    /// Parse `document` and hold it open until the handle is dropped.
    fn open<'a>(
        &'a self,
        document: &'a SourceDocument,
    ) -> Result<Box<dyn RasterDocument + 'a>, RenderError>;

    /// Render a single page. Opens and closes the document around the call;
    /// use [`PageRasterizer::open`] when rendering many pages.
    fn render(
        &self,
        document: &SourceDocument,
        page_num: usize,
        zoom: f32,
    ) -> Result<RenderedPage, RenderError> {
        self.open(document)?.render_page(page_num, zoom)
    }
}

/// An open document.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Render 1-indexed `page_num` with its native size multiplied by `zoom`.
    fn render_page(&self, page_num: usize, zoom: f32) -> Result<RenderedPage, RenderError>;
}

/// Shared argument checks for [`RasterDocument::render_page`] implementations.
pub fn check_page_request(page_num: usize, total: usize, zoom: f32) -> Result<(), RenderError> {
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(RenderError::InvalidZoom {
            zoom: zoom.to_string(),
        });
    }
    if page_num == 0 || page_num > total {
        return Err(RenderError::PageOutOfRange {
            page: page_num,
            total,
        });
    }
    Ok(())
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// Renders pages through the pdfium C library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to pdfium (see [`bind_pdfium`]) and wrap it.
    pub fn new() -> Result<Self, Pdf2JpgError> {
        Ok(Self::from_pdfium(bind_pdfium()?))
    }

    pub fn from_pdfium(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer").finish_non_exhaustive()
    }
}

/// Locate and load the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_LIB_PATH` (a file path, or a directory holding the library)
/// 2. the current working directory
/// 3. the system library path
pub fn bind_pdfium() -> Result<Pdfium, Pdf2JpgError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let bindings = match from_env {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&path))
        }
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2JpgError::PdfiumBindingFailed(format!("{e:?}")))?;

    info!("pdfium bound");
    Ok(Pdfium::new(bindings))
}

struct PdfiumDocument<'a> {
    id: &'a str,
    document: PdfDocument<'a>,
}

impl PageRasterizer for PdfiumRasterizer {
    fn open<'a>(
        &'a self,
        document: &'a SourceDocument,
    ) -> Result<Box<dyn RasterDocument + 'a>, RenderError> {
        if !document.looks_like_pdf() {
            return Err(RenderError::CorruptPdf {
                document: document.id().to_string(),
                detail: "missing %PDF header".to_string(),
            });
        }

        let loaded = self
            .pdfium
            .load_pdf_from_byte_slice(document.bytes(), None)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    RenderError::PasswordRequired {
                        document: document.id().to_string(),
                    }
                } else {
                    RenderError::CorruptPdf {
                        document: document.id().to_string(),
                        detail: err_str,
                    }
                }
            })?;

        debug!(
            "Opened '{}': {} pages",
            document.id(),
            loaded.pages().len()
        );

        Ok(Box::new(PdfiumDocument {
            id: document.id(),
            document: loaded,
        }))
    }
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, page_num: usize, zoom: f32) -> Result<RenderedPage, RenderError> {
        check_page_request(page_num, self.page_count(), zoom)?;

        let page = self
            .document
            .pages()
            .get((page_num - 1) as u16)
            .map_err(|e| RenderError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        Ok(RenderedPage {
            document_id: self.id.to_string(),
            page_num,
            image,
        })
    }
}
