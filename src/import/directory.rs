use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{Importer, SourceConverter};
use crate::build::TreeBuilder;
use crate::error::{IoResultExt, Result};
use crate::util::natural_cmp;

/// A directory with one file per chapter.
///
/// Entries are read in natural order (`ch2` before `ch10`, case-insensitive).
/// Subdirectories are entered depth-first in the same order; hidden entries
/// are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryImporter {
    root: PathBuf,
    converter: SourceConverter,
}

impl DirectoryImporter {
    pub fn new(root: impl Into<PathBuf>, converter: SourceConverter) -> Self {
        Self {
            root: root.into(),
            converter,
        }
    }

    fn walk(&self, dir: &Path, builder: &mut TreeBuilder) -> Result<()> {
        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir).at(dir)? {
            let entry = entry.at(dir)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                debug!("skipping hidden entry {name}");
                continue;
            }
            entries.push((name, entry.path()));
        }
        entries.sort_by(|(a, _), (b, _)| natural_cmp(a, b));

        for (_, path) in entries {
            if path.is_dir() {
                self.walk(&path, builder)?;
            } else if path.is_file() {
                info!("reading {}", path.display());
                let text = self.converter.convert(&path)?;
                builder.add_chapter(None, &text);
            }
        }
        Ok(())
    }
}

impl Importer for DirectoryImporter {
    fn parse(&mut self, builder: &mut TreeBuilder) -> Result<()> {
        self.walk(&self.root, builder)
    }
}
