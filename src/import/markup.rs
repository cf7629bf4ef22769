use std::path::PathBuf;

use log::{info, warn};

use super::{Importer, SourceConverter};
use crate::build::TreeBuilder;
use crate::error::Result;

/// A single manuscript file, cut into chapters at its page breaks.
#[derive(Debug, Clone)]
pub struct MarkupImporter {
    path: PathBuf,
    converter: SourceConverter,
}

impl MarkupImporter {
    pub fn new(path: impl Into<PathBuf>, converter: SourceConverter) -> Self {
        Self {
            path: path.into(),
            converter,
        }
    }
}

impl Importer for MarkupImporter {
    fn parse(&mut self, builder: &mut TreeBuilder) -> Result<()> {
        info!("reading {}", self.path.display());
        let text = self.converter.convert(&self.path)?;
        let added = builder.add_document(&text);
        if added == 0 {
            warn!("no chapters found in {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_one_chapter_per_region() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.tex");
        fs::write(
            &path,
            "\\begin{document}\nOne\n\\begin{flushleft}\nFirst.\n\\end{flushleft}\n\\newpage\nTwo\n\\end{document}\n",
        )
        .unwrap();

        let mut builder = TreeBuilder::default();
        MarkupImporter::new(&path, SourceConverter::Passthrough)
            .parse(&mut builder)
            .unwrap();
        let book = builder.finish().unwrap();
        let headings: Vec<&str> = book.chapters().map(|c| c.heading.as_str()).collect();
        assert_eq!(headings, vec!["One", "Two"]);
    }
}
