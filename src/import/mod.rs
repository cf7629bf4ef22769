//! Input adapters.
//!
//! Each adapter walks one kind of source and feeds its chapter regions to a
//! [`TreeBuilder`]. The adapter for a path is chosen by [`InputFormat`].

mod archive;
mod converter;
mod directory;
mod markup;
mod scrivener;

pub use archive::{ScrivenerArchiveImporter, extract_archive, project_root};
pub use converter::SourceConverter;
pub use directory::DirectoryImporter;
pub use markup::MarkupImporter;
pub use scrivener::{
    Annotation, BinderItem, BinderKind, ScrivenerImporter, parse_binder, parse_comments,
};

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::TreeBuilder;
use crate::error::{Error, IoResultExt, Result};

/// Polymorphic interface for input backends.
pub trait Importer {
    /// Feed every chapter of the source to `builder`, in reading order.
    fn parse(&mut self, builder: &mut TreeBuilder) -> Result<()>;
}

/// Kind of input, detected from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum InputFormat {
    /// A single document, cut into chapters at page breaks.
    Markup,
    /// A directory holding one file per chapter.
    Directory,
    /// A Scrivener project (`.scriv` bundle with a `.scrivx` binder).
    Scrivener,
    /// A Scrivener project packed into a `.zip` file.
    ScrivenerArchive,
}

impl InputFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)
            .map_err(|e| Error::Input(format!("cannot read {}: {e}", path.display())))?;
        if !meta.is_dir() {
            let zipped = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
            return Ok(if zipped {
                InputFormat::ScrivenerArchive
            } else {
                InputFormat::Markup
            });
        }
        let bundle = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("scriv"));
        if bundle || find_project_file(path)?.is_some() {
            Ok(InputFormat::Scrivener)
        } else {
            Ok(InputFormat::Directory)
        }
    }

    /// Build the importer for this format.
    ///
    /// `tmp_dir` is where a zipped project gets unpacked.
    pub fn importer(self, path: &Path, converter: SourceConverter, tmp_dir: &Path) -> Box<dyn Importer> {
        let path = path.to_path_buf();
        match self {
            InputFormat::Markup => Box::new(MarkupImporter::new(path, converter)),
            InputFormat::Directory => Box::new(DirectoryImporter::new(path, converter)),
            InputFormat::Scrivener => Box::new(ScrivenerImporter::new(path, converter)),
            InputFormat::ScrivenerArchive => {
                Box::new(ScrivenerArchiveImporter::new(path, converter, tmp_dir))
            }
        }
    }
}

/// First `.scrivx` file directly inside `dir`, by name.
pub(crate) fn find_project_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .at(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("scrivx"))
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_formats() {
        let dir = TempDir::new().unwrap();

        let file = dir.path().join("book.tex");
        fs::write(&file, "text").unwrap();
        assert_eq!(InputFormat::detect(&file).unwrap(), InputFormat::Markup);

        let zipped = dir.path().join("Novel.ZIP");
        fs::write(&zipped, "PK").unwrap();
        assert_eq!(InputFormat::detect(&zipped).unwrap(), InputFormat::ScrivenerArchive);

        let chapters = dir.path().join("chapters");
        fs::create_dir(&chapters).unwrap();
        assert_eq!(InputFormat::detect(&chapters).unwrap(), InputFormat::Directory);

        let bundle = dir.path().join("Novel.scriv");
        fs::create_dir(&bundle).unwrap();
        assert_eq!(InputFormat::detect(&bundle).unwrap(), InputFormat::Scrivener);

        let project = dir.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("Novel.scrivx"), "<ScrivenerProject/>").unwrap();
        assert_eq!(InputFormat::detect(&project).unwrap(), InputFormat::Scrivener);
    }

    #[test]
    fn test_missing_input_is_input_error() {
        let dir = TempDir::new().unwrap();
        let err = InputFormat::detect(&dir.path().join("absent.rtf")).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
