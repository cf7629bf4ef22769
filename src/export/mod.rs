//! Writing a built [`Book`] into an EPUB staging directory.
//!
//! The staging layout mirrors the final archive:
//!
//! ```text
//! mimetype
//! META-INF/container.xml
//! OEBPS/book.opf, toc.ncx, style.css
//! OEBPS/title.xhtml, toc.xhtml, [copyright.xhtml], [Cover.xhtml, Cover.jpg]
//! OEBPS/{index:03}_{slug}.xhtml  (one per part and chapter)
//! ```
//!
//! [`write_archive`](crate::epub::write_archive) then zips the directory.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::epub::MIMETYPE;
use crate::error::{IoResultExt, Result};
use crate::model::{Book, Metadata, Section};
use crate::util::is_jpeg;

mod package;
mod template;
mod xhtml;

pub use package::{FrontMatter, ManifestEntry, NavPoint, Package, TocEntry, assemble};
pub use template::{TemplateVars, hydrate};
pub use xhtml::XhtmlRenderer;

/// Directory under the staging root that holds the publication files.
pub const CONTENT_DIR: &str = "OEBPS";

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).at(path)
}

/// Write `mimetype` and `META-INF/container.xml`.
pub fn stage_container(staging: &Path) -> Result<()> {
    write_file(&staging.join("mimetype"), MIMETYPE)?;
    let meta_inf = staging.join("META-INF");
    fs::create_dir_all(&meta_inf).at(&meta_inf)?;
    write_file(&meta_inf.join("container.xml"), template::CONTAINER_XML)
}

/// Render every section and hydrate the package templates into
/// `staging/OEBPS`.
pub fn stage_book(
    staging: &Path,
    book: &Book,
    meta: &Metadata,
    uid: &str,
    modified: &str,
) -> Result<Package> {
    let content = staging.join(CONTENT_DIR);
    fs::create_dir_all(&content).at(&content)?;

    let renderer = XhtmlRenderer::new(meta);
    for section in book.sections() {
        let path = content.join(section.file_name());
        debug!("writing {}", section.file_name());
        write_file(&path, renderer.render(section))?;
    }

    let package = assemble(
        book,
        &FrontMatter {
            copyright: meta.include_copyright,
        },
    )?;
    let vars = TemplateVars::for_book(meta, uid, modified, &package);

    let mut pages = vec![
        ("style.css", template::STYLE_CSS),
        ("book.opf", template::BOOK_OPF),
        ("toc.ncx", template::TOC_NCX),
        ("title.xhtml", template::TITLE_XHTML),
        ("toc.xhtml", template::TOC_XHTML),
    ];
    if meta.include_copyright {
        pages.push(("copyright.xhtml", template::COPYRIGHT_XHTML));
    }
    if meta.cover.is_some() {
        pages.push(("Cover.xhtml", template::COVER_XHTML));
    }
    for (name, source) in pages {
        write_file(&content.join(name), hydrate(source, &vars))?;
    }

    if let Some(cover) = &meta.cover {
        let data = fs::read(cover).at(cover)?;
        if !is_jpeg(&data) {
            warn!("cover {} does not look like a JPEG image", cover.display());
        }
        write_file(&content.join("Cover.jpg"), data)?;
    }

    Ok(package)
}
