//! One conversion pass from source to EPUB.

use std::env;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::TempDir;
use uuid::Uuid;

use crate::build::TreeBuilder;
use crate::epub::write_archive;
use crate::error::{Error, Result};
use crate::export::{stage_book, stage_container};
use crate::import::{InputFormat, SourceConverter};
use crate::model::{Book, Metadata};
use crate::repair::{RepairEngine, SpecialCharTable};
use crate::util::utc_timestamp_now;

/// Settings that are not part of the book itself.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Parent of the staging directory and of an unpacked zipped project.
    /// Defaults to the system temp dir.
    pub tmp_dir: Option<PathBuf>,
    pub converter: SourceConverter,
    pub table: SpecialCharTable,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    pub fn with_converter(mut self, converter: SourceConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_table(mut self, table: SpecialCharTable) -> Self {
        self.table = table;
        self
    }
}

/// What a finished conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub format: InputFormat,
    pub uid: String,
    pub parts: usize,
    pub chapters: usize,
}

/// A configured conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    metadata: Metadata,
    options: ConvertOptions,
}

impl Conversion {
    /// Fails with [`Error::Metadata`] when the metadata is incomplete.
    pub fn new(metadata: Metadata, options: ConvertOptions) -> Result<Self> {
        metadata.validate()?;
        Ok(Self { metadata, options })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Import `input`, build the book and write it to `output`.
    ///
    /// The staging directory is removed whether or not the conversion
    /// succeeds; failing to remove it is only logged.
    pub fn run(&self, input: &Path, output: &Path) -> Result<Report> {
        let parent = self.tmp_parent();
        let staging = tempfile::Builder::new()
            .prefix("folio-")
            .tempdir_in(&parent)
            .map_err(|e| Error::io(&parent, e))?;

        let result = self.run_in(staging.path(), input, output);
        cleanup(staging);
        result
    }

    fn tmp_parent(&self) -> PathBuf {
        self.options.tmp_dir.clone().unwrap_or_else(env::temp_dir)
    }

    fn run_in(&self, staging: &Path, input: &Path, output: &Path) -> Result<Report> {
        stage_container(staging)?;

        let format = InputFormat::detect(input)?;
        info!("reading {} as {format:?}", input.display());
        let book = self.import(format, input)?;

        let uid = book_uid(&self.metadata);
        let modified = utc_timestamp_now();
        stage_book(staging, &book, &self.metadata, &uid, &modified)?;

        write_archive(output, staging)?;
        info!("wrote {}", output.display());

        Ok(Report {
            format,
            uid,
            parts: book.entry_count() - book.chapters().count(),
            chapters: book.chapters().count(),
        })
    }

    /// Build the document tree without writing anything.
    pub fn import(&self, format: InputFormat, input: &Path) -> Result<Book> {
        let mut builder = TreeBuilder::new(RepairEngine::new(self.options.table.clone()));
        let tmp_dir = self.tmp_parent();
        let mut importer = format.importer(input, self.options.converter.clone(), &tmp_dir);
        importer.parse(&mut builder)?;
        builder.finish()
    }
}

fn cleanup(staging: TempDir) {
    let path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        warn!("could not remove staging directory {}: {e}", path.display());
    }
}

fn lower_alnum(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// `epub.{title}.{author}.{random hex}`, title and author reduced to
/// lowercase ASCII letters and digits.
pub fn book_uid(meta: &Metadata) -> String {
    format!(
        "epub.{}.{}.{}",
        lower_alnum(&meta.title),
        lower_alnum(&meta.author),
        Uuid::new_v4().simple()
    )
}
