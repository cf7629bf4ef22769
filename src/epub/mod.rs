//! EPUB container packaging.

mod writer;

pub use writer::write_archive;

/// Contents of the `mimetype` entry, stored uncompressed as the first file.
pub const MIMETYPE: &str = "application/epub+zip";
