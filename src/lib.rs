//! # folio
//!
//! Convert word-processor manuscripts into EPUB.
//!
//! A conversion runs in two stages. Converter output, which is often
//! malformed, is repaired and built into a [`Book`] tree of parts, chapters,
//! paragraphs and inline runs. The tree is then rendered to XHTML,
//! described by a manifest, spine and navigation map, and zipped into an
//! EPUB container.
//!
//! Three kinds of input are understood:
//!
//! - a single markup file, cut into chapters at page breaks;
//! - a directory holding one file per chapter, read in natural order;
//! - a Scrivener project, whose binder supplies parts and chapter titles,
//!   either as a folder or packed in a `.zip` file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::{Metadata, convert};
//!
//! let meta = Metadata::new("The Long Road", "Ann Lee")
//!     .with_pub_date("2021-04-30")
//!     .with_copyright("2021", true);
//! convert("manuscript.scriv", "long-road.epub", meta)?;
//! # Ok::<(), folio::Error>(())
//! ```
//!
//! RTF and DOC sources need an external converter that prints LaTeX-style
//! markup, configured through [`ConvertOptions`] and [`SourceConverter`].

use std::path::Path;

pub mod build;
pub mod convert;
pub mod epub;
pub mod error;
pub mod export;
pub mod import;
pub mod model;
pub mod repair;
pub mod slug;
pub(crate) mod util;

pub use build::TreeBuilder;
pub use convert::{ConvertOptions, Conversion, Report};
pub use error::{Error, Result};
pub use import::{InputFormat, SourceConverter};
pub use model::{Book, BookItem, Chapter, Metadata, Paragraph, Part, Run};
pub use repair::{RepairEngine, RepairOutcome, SpecialCharTable};

/// Convert `input` to an EPUB at `output` with default options.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    metadata: Metadata,
) -> Result<Report> {
    Conversion::new(metadata, ConvertOptions::default())?.run(input.as_ref(), output.as_ref())
}
