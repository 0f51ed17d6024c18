//! Shared test helpers: an in-memory rasteriser that needs no pdfium.
//!
//! A synthetic document is plain text:
//!
//! ```text
//! %PDF-synthetic
//! page 200x300
//! page broken
//! ```
//!
//! Each `page WxH` line renders a `W·zoom × H·zoom` RGBA gradient; `page
//! broken` fails to rasterise. Anything not starting with `%PDF-synthetic`
//! is a corrupt document.

#![allow(dead_code)]

use edgequake_pdf2jpg::{
    ConversionSettings, MaxWidth, PageRasterizer, RasterDocument, RenderError, RenderedPage,
    SourceDocument,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAGIC: &str = "%PDF-synthetic";

/// Build a synthetic document with the given native page sizes.
pub fn synthetic_pdf(id: &str, pages: &[(u32, u32)]) -> SourceDocument {
    let mut text = format!("{MAGIC}\n");
    for (w, h) in pages {
        text.push_str(&format!("page {w}x{h}\n"));
    }
    SourceDocument::new(id, text.into_bytes())
}

/// `n` pages of 200×300 (a small portrait page).
pub fn portrait_pdf(id: &str, n: usize) -> SourceDocument {
    synthetic_pdf(id, &vec![(200, 300); n])
}

/// `good` renderable pages followed by one that fails.
pub fn pdf_with_broken_page(id: &str, good: usize) -> SourceDocument {
    let mut text = format!("{MAGIC}\n");
    for _ in 0..good {
        text.push_str("page 200x300\n");
    }
    text.push_str("page broken\n");
    SourceDocument::new(id, text.into_bytes())
}

/// Has the PDF magic but nothing the rasteriser can parse.
pub fn corrupt_pdf(id: &str) -> SourceDocument {
    SourceDocument::new(id, b"%PDF-1.7\n%%EOF garbage".to_vec())
}

/// Settings that keep the synthetic pages at native size.
pub fn native_settings() -> ConversionSettings {
    ConversionSettings::builder()
        .zoom(1.0)
        .max_width(MaxWidth::Disabled)
        .build()
        .unwrap()
}

#[derive(Debug, Clone, Copy)]
enum PageSpec {
    Size(u32, u32),
    Broken,
}

/// Rasteriser over the synthetic format. Counts open handles and rendered
/// pages so tests can check that every document is released and that work
/// stops when asked. Clones share the counters.
#[derive(Debug, Default, Clone)]
pub struct SyntheticRasterizer {
    open_handles: Arc<AtomicUsize>,
    opened_total: Arc<AtomicUsize>,
    rendered: Arc<AtomicUsize>,
}

impl SyntheticRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents currently open.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Documents opened since creation.
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }

    /// Pages rasterised since creation, across all documents.
    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }
}

struct SyntheticDocument<'a> {
    id: &'a str,
    pages: Vec<PageSpec>,
    open_handles: Arc<AtomicUsize>,
    rendered: Arc<AtomicUsize>,
}

impl Drop for SyntheticDocument<'_> {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

fn parse(document: &SourceDocument) -> Result<Vec<PageSpec>, RenderError> {
    let corrupt = |detail: &str| RenderError::CorruptPdf {
        document: document.id().to_string(),
        detail: detail.to_string(),
    };
    let text = std::str::from_utf8(document.bytes()).map_err(|_| corrupt("not UTF-8"))?;
    let mut lines = text.lines();
    if lines.next() != Some(MAGIC) {
        return Err(corrupt("missing synthetic header"));
    }

    lines
        .filter(|l| !l.trim().is_empty())
        .map(|line| match line.trim().strip_prefix("page ") {
            Some("broken") => Ok(PageSpec::Broken),
            Some(size) => {
                let (w, h) = size.split_once('x').ok_or_else(|| corrupt(line))?;
                let w = w.parse().map_err(|_| corrupt(line))?;
                let h = h.parse().map_err(|_| corrupt(line))?;
                Ok(PageSpec::Size(w, h))
            }
            None => Err(corrupt(line)),
        })
        .collect()
}

impl PageRasterizer for SyntheticRasterizer {
    fn open<'a>(
        &'a self,
        document: &'a SourceDocument,
    ) -> Result<Box<dyn RasterDocument + 'a>, RenderError> {
        let pages = parse(document)?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticDocument {
            id: document.id(),
            pages,
            open_handles: Arc::clone(&self.open_handles),
            rendered: Arc::clone(&self.rendered),
        }))
    }
}

impl RasterDocument for SyntheticDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, page_num: usize, zoom: f32) -> Result<RenderedPage, RenderError> {
        edgequake_pdf2jpg::pipeline::render::check_page_request(page_num, self.pages.len(), zoom)?;
        let (w, h) = match self.pages[page_num - 1] {
            PageSpec::Size(w, h) => (w, h),
            PageSpec::Broken => {
                return Err(RenderError::RasterisationFailed {
                    page: page_num,
                    detail: "synthetic broken page".into(),
                })
            }
        };
        self.rendered.fetch_add(1, Ordering::SeqCst);
        let w = ((w as f32 * zoom).round() as u32).max(1);
        let h = ((h as f32 * zoom).round() as u32).max(1);
        let image = RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 255 / w.max(1)) as u8,
                (y * 255 / h.max(1)) as u8,
                ((x + y) % 256) as u8,
                255,
            ])
        });
        Ok(RenderedPage {
            document_id: self.id.to_string(),
            page_num,
            image: DynamicImage::ImageRgba8(image),
        })
    }
}
