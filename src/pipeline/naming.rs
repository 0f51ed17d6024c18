//! Output naming: `{prefix}_{NNN}.jpg`, unique per archive namespace.
//!
//! Names are ASCII slugs so they survive every ZIP tool and filesystem the
//! archive might be extracted on. Page numbers are zero-padded to three
//! digits, or wider when the document has more than 999 pages, so that
//! lexical order always equals page order.
//!
//! The [`NameRegistry`] belongs to one run. It never resolves a collision by
//! renaming: page numbers are unique by construction, so a repeat request
//! is a bug in the caller and is reported as [`NamingError`].

use crate::error::NamingError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::error;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Reduce `s` to `[A-Za-z0-9._-]`, turning whitespace runs into `_`.
///
/// Leading dots are dropped, so the result is never `.`, `..` or a hidden
/// name and is always safe as a single path component. Returns `fallback`
/// when nothing survives.
pub fn sanitize_name(s: &str, fallback: &str) -> String {
    let s = s.trim();
    let s = WHITESPACE.replace_all(s, "_");
    let s = UNSAFE_CHARS.replace_all(&s, "");
    let s = s.trim_start_matches('.');
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

/// Digits used for page numbers in a document of `page_count` pages.
pub fn page_number_width(page_count: usize) -> usize {
    page_count.max(1).to_string().len().max(3)
}

/// Format a page filename without registering it.
pub fn format_page_name(prefix: &str, page_num: usize, page_count: usize) -> String {
    let width = page_number_width(page_count.max(page_num));
    format!("{}_{:0width$}.jpg", sanitize_name(prefix, "page"), page_num)
}

/// Filenames handed out during one run, keyed by archive namespace.
#[derive(Debug, Default)]
pub struct NameRegistry {
    assigned: HashSet<(String, String)>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the filename for `page_num` of a `page_count`-page document
    /// inside `namespace`.
    pub fn assign(
        &mut self,
        prefix: &str,
        page_num: usize,
        page_count: usize,
        namespace: &str,
    ) -> Result<String, NamingError> {
        let filename = format_page_name(prefix, page_num, page_count);
        if !self
            .assigned
            .insert((namespace.to_string(), filename.clone()))
        {
            error!(
                "BUG: output name '{}' requested twice in namespace '{}'",
                filename, namespace
            );
            return Err(NamingError::Duplicate {
                namespace: namespace.to_string(),
                filename,
            });
        }
        Ok(filename)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
