//! Writing results to disk.
//!
//! Images go to `{out}/{namespace}/{filename}`, one folder per document that
//! produced at least one page. Archives are written to a temp file in the
//! destination folder and renamed into place, so a reader never sees half an
//! archive.
//!
//! Every existence check happens before the first byte is written: a run that
//! would clobber earlier output fails with [`Pdf2JpgError::OutputExists`] and
//! leaves the disk untouched. [`check_targets`] runs those checks for images
//! and archive together.

use crate::error::Pdf2JpgError;
use crate::output::{ConversionReport, DocumentReport};
use crate::pipeline::archive::{archive_file_name, ArchiveBuilder};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

fn io_error(path: &Path, e: io::Error) -> Pdf2JpgError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        Pdf2JpgError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        Pdf2JpgError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Folder for each document that produced at least one page.
///
/// A namespace must be a single plain path component. Anything else would
/// place output (or an `--overwrite` removal) outside `out_dir`.
fn image_targets<'r>(
    out_dir: &Path,
    report: &'r ConversionReport,
) -> Result<Vec<(PathBuf, &'r DocumentReport)>, Pdf2JpgError> {
    report
        .documents
        .iter()
        .filter(|d| !d.images.is_empty())
        .map(|d| {
            let mut components = Path::new(&d.namespace).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) if !d.namespace.starts_with('.') => {
                    Ok((out_dir.join(&d.namespace), d))
                }
                _ => Err(Pdf2JpgError::Internal(format!(
                    "namespace '{}' of '{}' is not a plain folder name",
                    d.namespace, d.document_id
                ))),
            }
        })
        .collect()
}

/// Fail with [`Pdf2JpgError::OutputExists`] if any output of the run is
/// already on disk, before anything is written.
///
/// Covers every namespace folder and, with `zip`, the archive file (only
/// written when some page was produced). Call it
/// ahead of [`write_images`] and [`write_report_archive`] so a refused run
/// leaves no partial output behind.
pub fn check_targets(
    out_dir: &Path,
    report: &ConversionReport,
    prefix: &str,
    zip: bool,
    overwrite: bool,
) -> Result<(), Pdf2JpgError> {
    let targets = image_targets(out_dir, report)?;
    if overwrite {
        return Ok(());
    }
    if let Some((dir, _)) = targets.iter().find(|(dir, _)| dir.exists()) {
        return Err(Pdf2JpgError::OutputExists { path: dir.clone() });
    }
    if zip && !targets.is_empty() {
        let path = out_dir.join(report_archive_name(report, prefix));
        if path.exists() {
            return Err(Pdf2JpgError::OutputExists { path });
        }
    }
    Ok(())
}

/// Write every produced page under `out_dir`. Returns the written paths.
///
/// With `overwrite`, an existing namespace folder is removed first so stale
/// pages from a longer earlier run do not linger next to the new ones.
pub fn write_images(
    out_dir: &Path,
    report: &ConversionReport,
    overwrite: bool,
) -> Result<Vec<PathBuf>, Pdf2JpgError> {
    let targets = image_targets(out_dir, report)?;

    if !overwrite {
        if let Some((dir, _)) = targets.iter().find(|(dir, _)| dir.exists()) {
            return Err(Pdf2JpgError::OutputExists { path: dir.clone() });
        }
    }

    let mut written = Vec::with_capacity(report.images().count());
    for (dir, document) in &targets {
        if dir.exists() {
            debug!("Removing previous output {}", dir.display());
            fs::remove_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        for image in &document.images {
            let path = dir.join(&image.filename);
            fs::write(&path, &image.bytes).map_err(|e| io_error(&path, e))?;
            written.push(path);
        }
        info!(
            "Wrote {} image(s) to {}",
            document.images.len(),
            dir.display()
        );
    }
    Ok(written)
}

/// Atomically write `bytes` to `out_dir/file_name`.
pub fn write_archive(
    out_dir: &Path,
    file_name: &str,
    bytes: &[u8],
    overwrite: bool,
) -> Result<PathBuf, Pdf2JpgError> {
    let path = out_dir.join(file_name);
    if !overwrite && path.exists() {
        return Err(Pdf2JpgError::OutputExists { path });
    }

    fs::create_dir_all(out_dir).map_err(|e| io_error(out_dir, e))?;
    let mut tmp = NamedTempFile::new_in(out_dir).map_err(|e| io_error(out_dir, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), e))?;
    tmp.persist(&path).map_err(|e| io_error(&path, e.error))?;

    info!("Wrote archive {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Build the run's archive and write it under `out_dir`.
///
/// The file is `{stem}_images.zip` for a single document and
/// `{prefix}_images.zip` for a batch.
pub fn write_report_archive(
    out_dir: &Path,
    report: &ConversionReport,
    prefix: &str,
    overwrite: bool,
) -> Result<PathBuf, Pdf2JpgError> {
    let file_name = report_archive_name(report, prefix);
    if !overwrite && out_dir.join(&file_name).exists() {
        return Err(Pdf2JpgError::OutputExists {
            path: out_dir.join(file_name),
        });
    }

    let bytes = ArchiveBuilder::new().add_reports(&report.documents).build()?;
    write_archive(out_dir, &file_name, &bytes, overwrite)
}

fn report_archive_name(report: &ConversionReport, prefix: &str) -> String {
    let ids: Vec<&str> = report
        .documents
        .iter()
        .map(|d| d.document_id.as_str())
        .collect();
    archive_file_name(&ids, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ConversionStats, EncodedImage};
    use crate::pipeline::archive::assign_namespaces;

    fn report(docs: &[(&str, &str, usize)]) -> ConversionReport {
        ConversionReport {
            documents: docs
                .iter()
                .map(|(id, ns, pages)| DocumentReport {
                    document_id: id.to_string(),
                    namespace: ns.to_string(),
                    total_pages: Some(*pages),
                    images: (1..=*pages)
                        .map(|p| EncodedImage {
                            document_id: id.to_string(),
                            page_num: p,
                            filename: format!("page_{p:03}.jpg"),
                            width: 1,
                            height: 1,
                            bytes: vec![0xFF, 0xD8, p as u8],
                            size_bytes: 3,
                        })
                        .collect(),
                    error: None,
                })
                .collect(),
            stats: ConversionStats::default(),
        }
    }

    #[test]
    fn writes_namespaced_folders() {
        let dir = tempfile::tempdir().unwrap();
        let r = report(&[("file.pdf", "file", 2), ("file.pdf", "file (2)", 1)]);
        let written = write_images(dir.path(), &r, false).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.path().join("file/page_002.jpg").is_file());
        assert_eq!(
            fs::read(dir.path().join("file (2)/page_001.jpg")).unwrap(),
            vec![0xFF, 0xD8, 1]
        );
    }

    #[test]
    fn existing_output_is_refused_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let r = report(&[("a.pdf", "a", 1), ("b.pdf", "b", 1)]);

        let err = write_images(dir.path(), &r, false).unwrap_err();
        assert!(matches!(err, Pdf2JpgError::OutputExists { .. }));
        assert!(!dir.path().join("a").exists(), "nothing should be written");
    }

    #[test]
    fn overwrite_replaces_stale_pages() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), &report(&[("a.pdf", "a", 3)]), false).unwrap();
        write_images(dir.path(), &report(&[("a.pdf", "a", 1)]), true).unwrap();

        assert!(dir.path().join("a/page_001.jpg").exists());
        assert!(!dir.path().join("a/page_003.jpg").exists());
    }

    #[test]
    fn archive_written_atomically_and_guarded() {
        let dir = tempfile::tempdir().unwrap();
        let r = report(&[("file.pdf", "file", 3)]);

        let path = write_report_archive(dir.path(), &r, "page", false).unwrap();
        assert_eq!(path.file_name().unwrap(), "file_images.zip");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no temp file left behind");

        let err = write_report_archive(dir.path(), &r, "page", false).unwrap_err();
        assert!(matches!(err, Pdf2JpgError::OutputExists { .. }));
        assert!(write_report_archive(dir.path(), &r, "page", true).is_ok());
    }

    #[test]
    fn dot_only_document_stays_inside_out_dir() {
        let parent = tempfile::tempdir().unwrap();
        let out = parent.path().join("out");
        fs::write(parent.path().join("precious.txt"), b"keep").unwrap();

        let ns = assign_namespaces(["...pdf"]);
        let r = report(&[("...pdf", ns[0].as_str(), 1)]);
        let written = write_images(&out, &r, true).unwrap();

        assert_eq!(written, [out.join("document/page_001.jpg")]);
        assert!(parent.path().join("precious.txt").is_file());
    }

    #[test]
    fn unsafe_namespace_is_refused() {
        let parent = tempfile::tempdir().unwrap();
        let out = parent.path().join("out");
        fs::write(parent.path().join("precious.txt"), b"keep").unwrap();

        for ns in ["..", ".", "a/b", ""] {
            let r = report(&[("x.pdf", ns, 1)]);
            let err = write_images(&out, &r, true).unwrap_err();
            assert!(matches!(err, Pdf2JpgError::Internal(_)), "{ns:?}");
        }
        assert!(parent.path().join("precious.txt").is_file());
        assert!(!out.exists());
    }

    #[test]
    fn existing_archive_is_refused_before_images_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let r = report(&[("a.pdf", "a", 1), ("b.pdf", "b", 1)]);
        fs::write(dir.path().join("page_images.zip"), b"old").unwrap();

        let err = check_targets(dir.path(), &r, "page", true, false).unwrap_err();
        assert!(matches!(
            err,
            Pdf2JpgError::OutputExists { ref path } if path.ends_with("page_images.zip")
        ));
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());

        assert!(check_targets(dir.path(), &r, "page", false, false).is_ok());
        assert!(check_targets(dir.path(), &r, "page", true, true).is_ok());
    }

    #[test]
    fn check_targets_sees_existing_folders() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let r = report(&[("a.pdf", "a", 1), ("b.pdf", "b", 1)]);

        let err = check_targets(dir.path(), &r, "page", false, false).unwrap_err();
        assert!(matches!(err, Pdf2JpgError::OutputExists { .. }));
    }
}
