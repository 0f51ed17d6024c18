//! Pipeline stages for PDF-to-JPEG conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rasteriser or encoder can be swapped without
//! touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ naming ──▶ archive
//! (bytes)   (pdfium)   (JPEG)     (NNN)      (ZIP)
//! ```
//!
//! 1. [`input`]: load PDFs from a file or folder, keep display names unique
//! 2. [`render`]: rasterise one page at a zoom factor; pdfium is the only
//!    implementation shipped
//! 3. [`encode`]: flatten alpha, cap the width, compress to JPEG
//! 4. [`naming`]: `{prefix}_{NNN}.jpg`, unique per archive namespace
//! 5. [`archive`]: pack a run's pages into one ZIP

pub mod archive;
pub mod encode;
pub mod input;
pub mod naming;
pub mod render;
