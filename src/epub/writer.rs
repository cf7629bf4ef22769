use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, result::ZipError};

use super::MIMETYPE;
use crate::error::{Error, IoResultExt, Result};

/// Zip `staging` into an EPUB at `output`.
///
/// `mimetype` is written first and stored; every other file under `staging`
/// follows in sorted path order, deflated, named relative to the staging
/// root. The archive is built in a temporary file next to `output` and
/// renamed into place, so a failed write leaves nothing at `output`.
pub fn write_archive(output: &Path, staging: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_file(output).at(output)?;
    }

    let mut files = Vec::new();
    collect_files(staging, staging, &mut files)?;

    let dest_dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dest_dir).at(output)?;

    let archive_err = |source: ZipError| Error::Archive {
        path: output.to_path_buf(),
        source,
    };

    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).map_err(archive_err)?;
        zip.write_all(MIMETYPE.as_bytes()).at(output)?;

        for (name, path) in &files {
            if name == "mimetype" {
                continue;
            }
            debug!("adding {name}");
            let data = fs::read(path).at(path)?;
            zip.start_file(name.as_str(), deflated).map_err(archive_err)?;
            zip.write_all(&data).at(output)?;
        }

        zip.finish().map_err(archive_err)?;
    }

    tmp.persist(output).map_err(|e| Error::io(output, e.error))?;
    Ok(())
}

/// Every regular file under `dir`, as (`/`-separated name relative to
/// `root`, path), sorted by name within each directory.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .at(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .at(dir)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}
