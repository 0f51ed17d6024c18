//! Result types: encoded pages, per-document reports and run statistics.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// One page, compressed and named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Identifier of the owning [`crate::SourceDocument`].
    pub document_id: String,
    /// 1-indexed page number.
    pub page_num: usize,
    /// Output filename, e.g. `page_001.jpg`.
    pub filename: String,
    /// Final pixel width after any max-width downscale.
    pub width: u32,
    /// Final pixel height.
    pub height: u32,
    /// JPEG bytes. Not serialised; JSON reports carry `size_bytes` instead.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Length of `bytes`.
    pub size_bytes: usize,
}

/// Outcome of converting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Identifier of the source document.
    pub document_id: String,
    /// Folder name used for this document in archives and output folders.
    pub namespace: String,
    /// Page count, when the document could be opened.
    pub total_pages: Option<usize>,
    /// Successfully produced pages, in page order.
    pub images: Vec<EncodedImage>,
    /// The failure that stopped this document, if any.
    pub error: Option<PageError>,
}

impl DocumentReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Pages that were never produced (the failed page and everything after).
    pub fn missing_pages(&self) -> usize {
        match self.total_pages {
            Some(total) => total.saturating_sub(self.images.len()),
            None => 0,
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(|i| i.size_bytes).sum()
    }
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every page of every document converted.
    Success,
    /// At least one document failed, but something was produced.
    PartialSuccess,
    /// Nothing was produced.
    Failed,
}

/// Statistics about a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_documents: usize,
    pub failed_documents: usize,
    pub encoded_pages: usize,
    pub total_bytes: u64,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
}

/// Everything a run produced, in input-document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub documents: Vec<DocumentReport>,
    pub stats: ConversionStats,
}

impl ConversionReport {
    pub fn status(&self) -> RunStatus {
        let failed = self.documents.iter().any(|d| !d.is_complete());
        let produced = self.documents.iter().any(|d| !d.images.is_empty());
        match (failed, produced) {
            (false, _) => RunStatus::Success,
            (true, true) => RunStatus::PartialSuccess,
            (true, false) => RunStatus::Failed,
        }
    }

    /// All images from all documents, document order then page order.
    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.documents.iter().flat_map(|d| d.images.iter())
    }
}
