//! Document intake: the file the user wants the backend to read.

use std::path::{Path, PathBuf};

use crate::error::ServiceError;

pub const PDF_MIME: &str = "application/pdf";

/// A selected file that has not been ingested yet.
///
/// The MIME type is the *declared* type, derived from the file name the way a
/// browser file picker reports it. Content is never sniffed; the backend is
/// the authority on whether the bytes are actually a readable PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCandidate {
    path: PathBuf,
    name: String,
    size: u64,
    mime: String,
}

impl DocumentCandidate {
    pub fn new(path: impl Into<PathBuf>, size: u64, mime: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path,
            name,
            size,
            mime: mime.into(),
        }
    }

    /// Stat a file on disk and build a candidate for it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| ServiceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.is_file() {
            return Err(ServiceError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(path, metadata.len(), mime.essence_str()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }

    /// Size in megabytes with two decimals, e.g. `"1.50 MB"`.
    pub fn display_size(&self) -> String {
        format!("{:.2} MB", self.size as f64 / 1024.0 / 1024.0)
    }
}

/// Turn what a terminal pastes for a dragged file into a plain path.
///
/// Terminals differ: some quote the path, some escape spaces with a
/// backslash, some hand over a `file://` URI.
pub fn clean_dropped_path(raw: &str) -> PathBuf {
    let mut s = raw.trim();

    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
            break;
        }
    }

    let s = s.strip_prefix("file://").unwrap_or(s);
    PathBuf::from(s.replace("\\ ", " ").replace("%20", " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_declared_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("notes.pdf");
        let txt = dir.path().join("notes.txt");
        std::fs::File::create(&pdf).unwrap().write_all(b"%PDF-1.4").unwrap();
        std::fs::File::create(&txt).unwrap().write_all(b"hello").unwrap();

        let doc = DocumentCandidate::from_path(&pdf).unwrap();
        assert!(doc.is_pdf());
        assert_eq!(doc.name(), "notes.pdf");
        assert_eq!(doc.size(), 8);

        let doc = DocumentCandidate::from_path(&txt).unwrap();
        assert!(!doc.is_pdf());
        assert_eq!(doc.mime(), "text/plain");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DocumentCandidate::from_path("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DocumentCandidate::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_display_size() {
        let doc = DocumentCandidate::new("big.pdf", 1024 * 1024 * 3 / 2, PDF_MIME);
        assert_eq!(doc.display_size(), "1.50 MB");
    }

    #[test]
    fn test_clean_dropped_path() {
        assert_eq!(clean_dropped_path("  '/tmp/a b.pdf' "), PathBuf::from("/tmp/a b.pdf"));
        assert_eq!(clean_dropped_path("\"/tmp/x.pdf\""), PathBuf::from("/tmp/x.pdf"));
        assert_eq!(clean_dropped_path("/tmp/a\\ b.pdf\n"), PathBuf::from("/tmp/a b.pdf"));
        assert_eq!(clean_dropped_path("file:///tmp/my%20doc.pdf"), PathBuf::from("/tmp/my doc.pdf"));
    }
}
