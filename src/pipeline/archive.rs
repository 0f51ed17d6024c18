//! Archive assembly: pack encoded pages into one ZIP.
//!
//! Each document gets a namespace (a folder inside the archive) derived from
//! its filename stem. Two documents that reduce to the same namespace get
//! ` (2)`, ` (3)`, … appended, even if the ingestion surface was supposed to
//! have renamed them already. A run with a single document is written flat
//! (`page_001.jpg` at the archive root).
//!
//! Entries are stored, not deflated: JPEG data is already compressed and a
//! second pass only costs time.

use crate::error::Pdf2JpgError;
use crate::output::{DocumentReport, EncodedImage};
use crate::pipeline::input::file_stem;
use crate::pipeline::naming::sanitize_name;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Namespace base for one document id: sanitised stem, `document` if empty.
pub fn namespace_for(document_id: &str) -> String {
    sanitize_name(file_stem(document_id), "document")
}

/// One unique namespace per document id, in input order.
///
/// Comparison ignores ASCII case so archives extract cleanly on
/// case-insensitive filesystems.
pub fn assign_namespaces<'a, I>(document_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = HashSet::new();
    document_ids
        .into_iter()
        .map(|id| {
            let base = namespace_for(id);
            let mut candidate = base.clone();
            let mut n = 1;
            while !taken.insert(candidate.to_ascii_lowercase()) {
                n += 1;
                candidate = format!("{base} ({n})");
            }
            candidate
        })
        .collect()
}

/// Name for the archive file of a run.
///
/// One document: `{stem}_images.zip`. Several: `{prefix}_images.zip`.
pub fn archive_file_name(document_ids: &[&str], prefix: &str) -> String {
    match document_ids {
        [only] => format!("{}_images.zip", namespace_for(only)),
        _ => format!("{}_images.zip", sanitize_name(prefix, "page")),
    }
}

/// Builds a ZIP archive in memory.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    documents: Vec<(String, Vec<EncodedImage>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one document's images (page order is kept as given).
    pub fn add_document(
        &mut self,
        document_id: impl Into<String>,
        images: impl IntoIterator<Item = EncodedImage>,
    ) -> &mut Self {
        self.documents
            .push((document_id.into(), images.into_iter().collect()));
        self
    }

    /// Queue every successful page from a set of reports.
    pub fn add_reports<'a>(&mut self, reports: impl IntoIterator<Item = &'a DocumentReport>) -> &mut Self {
        for report in reports {
            self.add_document(report.document_id.clone(), report.images.iter().cloned());
        }
        self
    }

    /// Archive entry paths, in the order they will be written.
    pub fn entry_names(&self) -> Vec<String> {
        let flat = self.documents.len() == 1;
        let namespaces = assign_namespaces(self.documents.iter().map(|(id, _)| id.as_str()));
        self.documents
            .iter()
            .zip(&namespaces)
            .flat_map(|((_, images), ns)| {
                images.iter().map(move |img| {
                    if flat {
                        img.filename.clone()
                    } else {
                        format!("{ns}/{}", img.filename)
                    }
                })
            })
            .collect()
    }

    /// Write the archive and return its bytes.
    pub fn build(&self) -> Result<Vec<u8>, Pdf2JpgError> {
        let names = self.entry_names();
        let images = self.documents.iter().flat_map(|(_, images)| images.iter());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, image) in names.iter().zip(images) {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Pdf2JpgError::Archive(format!("{name}: {e}")))?;
            zip.write_all(&image.bytes)
                .map_err(|e| Pdf2JpgError::Archive(format!("{name}: {e}")))?;
            debug!("Archived {} ({} bytes)", name, image.bytes.len());
        }

        let bytes = zip
            .finish()
            .map_err(|e| Pdf2JpgError::Archive(e.to_string()))?
            .into_inner();
        info!("Archive built: {} entries, {} bytes", names.len(), bytes.len());
        Ok(bytes)
    }
}

/// Build an archive straight from `(document_id, images)` pairs.
pub fn build_archive<'a, I>(results: I) -> Result<Vec<u8>, Pdf2JpgError>
where
    I: IntoIterator<Item = (&'a str, &'a [EncodedImage])>,
{
    let mut builder = ArchiveBuilder::new();
    for (id, images) in results {
        builder.add_document(id, images.iter().cloned());
    }
    builder.build()
}
