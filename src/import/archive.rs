//! Zipped Scrivener projects.
//!
//! The archive is unpacked into a scratch directory that lives only for the
//! duration of [`Importer::parse`]. The project may sit at the top of the
//! archive or inside a single `Name.scriv/` folder.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::TempDir;
use zip::ZipArchive;

use super::{Importer, ScrivenerImporter, SourceConverter, find_project_file};
use crate::build::TreeBuilder;
use crate::error::{Error, IoResultExt, Result};

/// A `.zip` holding a Scrivener project.
#[derive(Debug, Clone)]
pub struct ScrivenerArchiveImporter {
    archive: PathBuf,
    converter: SourceConverter,
    /// Parent of the extraction directory.
    tmp_dir: PathBuf,
}

impl ScrivenerArchiveImporter {
    pub fn new(archive: impl Into<PathBuf>, converter: SourceConverter, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            converter,
            tmp_dir: tmp_dir.into(),
        }
    }
}

impl Importer for ScrivenerArchiveImporter {
    fn parse(&mut self, builder: &mut TreeBuilder) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("folio-input-")
            .tempdir_in(&self.tmp_dir)
            .map_err(|e| Error::io(&self.tmp_dir, e))?;

        let result = extract_archive(&self.archive, scratch.path())
            .and_then(|()| project_root(scratch.path()))
            .and_then(|root| {
                info!("reading zipped project {}", root.display());
                ScrivenerImporter::new(root, self.converter.clone()).parse(builder)
            });
        remove_scratch(scratch);
        result
    }
}

fn remove_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("could not remove extracted input {}: {e}", path.display());
    }
}

/// Unpack every entry of `archive` below `dest`.
///
/// Entries whose names would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .map_err(|e| Error::Input(format!("cannot read {}: {e}", archive.display())))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| Error::Input(format!("{} is not a valid ZIP archive: {e}", archive.display())))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::Input(format!("could not extract {}: {e}", archive.display())))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let out = dest.join(name);

        if entry.is_dir() {
            fs::create_dir_all(&out).at(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        debug!("extracting {}", entry.name());
        let mut target = File::create(&out).at(&out)?;
        io::copy(&mut entry, &mut target).at(&out)?;
    }
    Ok(())
}

/// Directory holding the `.scrivx` file: `dir` itself or one of its direct
/// subdirectories, in name order.
pub fn project_root(dir: &Path) -> Result<PathBuf> {
    if find_project_file(dir)?.is_some() {
        return Ok(dir.to_path_buf());
    }

    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .at(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir() && !is_metadata_dir(p))
        .collect();
    subdirs.sort();

    for sub in subdirs {
        if find_project_file(&sub)?.is_some() {
            return Ok(sub);
        }
    }
    Err(Error::Input("archive does not contain a Scrivener project".into()))
}

/// `__MACOSX/` and hidden folders added by archivers.
fn is_metadata_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n == "__MACOSX")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const SCRIVX: &str = r#"<ScrivenerProject Version="2.0"><Binder>
        <BinderItem ID="0" Type="DraftFolder"><Title>Draft</Title><Children>
            <BinderItem ID="1" Type="Text"><Title>Opening</Title></BinderItem>
        </Children></BinderItem>
    </Binder></ScrivenerProject>"#;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn import(archive: &Path, tmp: &Path) -> Result<crate::model::Book> {
        let mut builder = TreeBuilder::default();
        ScrivenerArchiveImporter::new(archive, SourceConverter::Passthrough, tmp).parse(&mut builder)?;
        builder.finish()
    }

    #[test]
    fn test_project_inside_bundle_folder() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("Novel.zip");
        write_zip(
            &archive,
            &[
                ("__MACOSX/", ""),
                ("__MACOSX/._Novel.scriv", "junk"),
                ("Novel.scriv/", ""),
                ("Novel.scriv/Novel.scrivx", SCRIVX),
                ("Novel.scriv/Files/Docs/1.rtf", "It begins."),
            ],
        );
        let tmp = dir.path().join("tmp");
        fs::create_dir(&tmp).unwrap();

        let book = import(&archive, &tmp).unwrap();
        let chapter = book.chapters().next().unwrap();
        assert_eq!(chapter.heading, "Opening");
        assert_eq!(chapter.paragraphs.len(), 1);
        assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);
    }

    #[test]
    fn test_project_at_archive_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("project.zip");
        write_zip(
            &archive,
            &[("Novel.scrivx", SCRIVX), ("Files/Docs/1.rtf", "It begins.")],
        );
        let book = import(&archive, dir.path()).unwrap();
        assert_eq!(book.chapters().count(), 1);
    }

    #[test]
    fn test_archive_without_project() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("notes.zip");
        write_zip(&archive, &[("notes/readme.txt", "nothing here")]);
        let tmp = dir.path().join("tmp");
        fs::create_dir(&tmp).unwrap();

        assert!(matches!(import(&archive, &tmp), Err(Error::Input(_))));
        assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_archive_is_input_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert!(err.to_string().contains("broken.zip"));
    }

    #[test]
    fn test_escaping_entries_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../outside.txt", "x"), ("inside.txt", "y")]);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract_archive(&archive, &dest).unwrap();
        assert!(dest.join("inside.txt").is_file());
        assert!(!dir.path().join("outside.txt").exists());
    }
}
