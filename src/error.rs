//! Error types for folio conversions.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while converting a manuscript into an EPUB.
///
/// An empty chapter is not an error: the repair stage reports it as
/// [`RepairOutcome::Empty`](crate::repair::RepairOutcome::Empty) and the
/// builder skips it.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unreadable source, or an invalid project structure.
    #[error("Input error: {0}")]
    Input(String),

    /// Markup that cannot be repaired at all. Repair is lossy-safe, so this
    /// is reserved for input that is not text.
    #[error("Repair error: {0}")]
    Repair(String),

    /// Chapter index or slug invariant violation.
    #[error("Build error: {0}")]
    Build(String),

    /// Manifest, spine or navigation map could not be constructed.
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// Book metadata failed validation.
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach the offending path to a bare `io::Result`.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err: Result<()> = Err(std::io::Error::from(std::io::ErrorKind::NotFound))
            .at("/tmp/missing/book.epub");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("/tmp/missing/book.epub"), "{msg}");
    }
}
