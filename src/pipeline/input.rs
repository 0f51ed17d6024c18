//! Input resolution: turn a file or folder path into [`SourceDocument`]s.
//!
//! A path may name a single PDF or a folder; a folder contributes every
//! `*.pdf` directly inside it, sorted by filename so runs are reproducible.
//! Each file is read fully into memory once and checked for the `%PDF` magic
//! bytes so a stray text file fails here with a clear message instead of
//! deep inside pdfium.

use crate::error::Pdf2JpgError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One PDF as ingested: display name plus raw bytes.
///
/// Immutable once built; the pipeline only ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    id: String,
    bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            bytes: bytes.into(),
        }
    }

    /// Original filename (or whatever the ingestion surface chose).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Filename without its extension: `scan.pdf` → `scan`.
    pub fn stem(&self) -> &str {
        file_stem(&self.id)
    }

    /// Whether the bytes start with the PDF magic number.
    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

/// Strip a trailing `.pdf` (any case) or other extension from a display name.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Load a single PDF or every PDF in a folder.
///
/// Names are passed through [`disambiguate_names`] so two inputs never share
/// an identifier.
pub fn load_documents(input: &Path) -> Result<Vec<SourceDocument>, Pdf2JpgError> {
    let paths = discover_pdfs(input)?;
    if paths.is_empty() {
        return Err(Pdf2JpgError::NoPdfFound {
            path: input.to_path_buf(),
        });
    }

    // In a folder, one mislabelled file must not sink its siblings: keep it
    // and let the rasteriser report it as that document's failure.
    let batch = input.is_dir();
    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let doc = if batch {
            read_unchecked(path)?
        } else {
            read_document(path)?
        };
        if batch && !doc.looks_like_pdf() {
            warn!("'{}' does not start with %PDF", path.display());
        }
        documents.push(doc);
    }
    info!("Loaded {} PDF(s) from {}", documents.len(), input.display());

    Ok(disambiguate_names(documents))
}

/// List the PDFs named by `input`, sorted.
pub fn discover_pdfs(input: &Path) -> Result<Vec<PathBuf>, Pdf2JpgError> {
    if input.is_file() {
        return Ok(if has_pdf_extension(input) {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    if input.is_dir() {
        let entries = std::fs::read_dir(input).map_err(|e| map_read_error(input, e))?;
        let mut pdfs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_pdf_extension(p))
            .collect();
        pdfs.sort();
        return Ok(pdfs);
    }

    Err(Pdf2JpgError::InputNotFound {
        path: input.to_path_buf(),
    })
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Read one file, validating the PDF magic bytes.
pub fn read_document(path: &Path) -> Result<SourceDocument, Pdf2JpgError> {
    let doc = read_unchecked(path)?;
    let bytes = doc.bytes();
    if bytes.len() >= 4 && !doc.looks_like_pdf() {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2JpgError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(doc)
}

fn read_unchecked(path: &Path) -> Result<SourceDocument, Pdf2JpgError> {
    let bytes = std::fs::read(path).map_err(|e| map_read_error(path, e))?;
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    debug!("Read {} ({} bytes)", path.display(), bytes.len());

    Ok(SourceDocument::new(id, bytes))
}

fn map_read_error(path: &Path, e: std::io::Error) -> Pdf2JpgError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2JpgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Pdf2JpgError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => Pdf2JpgError::Internal(format!("reading {}: {e}", path.display())),
    }
}

/// Give same-named documents distinct identifiers: `file.pdf`, `file (2).pdf`, …
///
/// Order is preserved; the first occurrence keeps its name.
pub fn disambiguate_names(documents: Vec<SourceDocument>) -> Vec<SourceDocument> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
    taken.sort();
    taken.dedup();

    documents
        .into_iter()
        .map(|mut doc| {
            let count = seen.entry(doc.id.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                let (stem, ext) = match doc.id.rsplit_once('.') {
                    Some((s, e)) if !s.is_empty() => (s.to_string(), format!(".{e}")),
                    _ => (doc.id.clone(), String::new()),
                };
                let mut n = *count;
                let mut candidate = format!("{stem} ({n}){ext}");
                while taken.contains(&candidate) {
                    n += 1;
                    candidate = format!("{stem} ({n}){ext}");
                }
                debug!("Renamed duplicate input '{}' → '{}'", doc.id, candidate);
                taken.push(candidate.clone());
                doc.id = candidate;
            }
            doc
        })
        .collect()
}
