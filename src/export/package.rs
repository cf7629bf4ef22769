//! Manifest, spine, navigation map and table of contents.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::model::{Book, BookItem, Section, SectionRef};

/// Front-matter pages that precede the content in the navigation map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub copyright: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
}

/// One entry of the NCX navigation map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,
    pub label: String,
    pub src: String,
    pub play_order: usize,
    pub children: Vec<NavPoint>,
}

/// One entry of the XHTML table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
    pub children: Vec<TocEntry>,
}

/// Everything the package templates need about the book's content files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Parts and chapters, in document order.
    pub manifest_entries: Vec<ManifestEntry>,
    /// Manifest ids in reading order.
    pub spine_entries: Vec<String>,
    /// Front matter followed by the content, parts holding their chapters.
    pub nav_map: Vec<NavPoint>,
    pub toc_entries: Vec<TocEntry>,
    pub first_chapter_file: String,
}

fn front_point(id: &str, label: &str, src: &str, play_order: &mut usize) -> NavPoint {
    let point = NavPoint {
        id: id.to_string(),
        label: label.to_string(),
        src: src.to_string(),
        play_order: *play_order,
        children: Vec::new(),
    };
    *play_order += 1;
    point
}

fn section_point(section: SectionRef<'_>, play_order: &mut usize) -> NavPoint {
    let point = NavPoint {
        id: section.id(),
        label: section.title().to_string(),
        src: section.file_name(),
        play_order: *play_order,
        children: Vec::new(),
    };
    *play_order += 1;
    point
}

/// Lay out the package for `book`.
///
/// `playOrder` runs 1 (title page), then the copyright page when present,
/// then the table of contents, then every part and chapter in pre-order.
pub fn assemble(book: &Book, front: &FrontMatter) -> Result<Package> {
    if book.is_empty() {
        return Err(Error::Packaging("book has no chapters".into()));
    }

    let mut play_order = 1;
    let mut nav_map = vec![front_point("title", "Title Page", "title.xhtml", &mut play_order)];
    if front.copyright {
        nav_map.push(front_point(
            "copyright",
            "Copyright Notice",
            "copyright.xhtml",
            &mut play_order,
        ));
    }
    nav_map.push(front_point("toc", "Table of Contents", "toc.xhtml", &mut play_order));

    let mut manifest_entries = Vec::with_capacity(book.entry_count());
    let mut toc_entries = Vec::with_capacity(book.items.len());

    for item in &book.items {
        let section = item.as_section();
        let mut point = section_point(section, &mut play_order);
        let mut toc = TocEntry {
            label: section.title().to_string(),
            href: section.file_name(),
            children: Vec::new(),
        };
        manifest_entries.push(ManifestEntry {
            id: section.id(),
            href: section.file_name(),
        });

        if let BookItem::Part(part) = item {
            for chapter in &part.chapters {
                let section = SectionRef::Chapter(chapter);
                point.children.push(section_point(section, &mut play_order));
                toc.children.push(TocEntry {
                    label: chapter.heading.clone(),
                    href: section.file_name(),
                    children: Vec::new(),
                });
                manifest_entries.push(ManifestEntry {
                    id: section.id(),
                    href: section.file_name(),
                });
            }
        }

        nav_map.push(point);
        toc_entries.push(toc);
    }

    let package = Package {
        spine_entries: manifest_entries.iter().map(|e| e.id.clone()).collect(),
        first_chapter_file: manifest_entries[0].href.clone(),
        manifest_entries,
        nav_map,
        toc_entries,
    };
    package.validate()?;
    Ok(package)
}

fn collect_play_orders(points: &[NavPoint], out: &mut Vec<usize>) {
    for point in points {
        out.push(point.play_order);
        collect_play_orders(&point.children, out);
    }
}

impl Package {
    /// `playOrder` values in document (pre-)order.
    pub fn play_orders(&self) -> Vec<usize> {
        let mut out = Vec::new();
        collect_play_orders(&self.nav_map, &mut out);
        out
    }

    /// Check that `playOrder` is exactly `1..=K` in order and that manifest
    /// ids are unique.
    pub fn validate(&self) -> Result<()> {
        for (expected, actual) in (1..).zip(self.play_orders()) {
            if expected != actual {
                return Err(Error::Packaging(format!(
                    "playOrder {actual} found where {expected} was expected"
                )));
            }
        }
        let mut ids = HashSet::new();
        for entry in &self.manifest_entries {
            if !ids.insert(entry.id.as_str()) {
                return Err(Error::Packaging(format!("duplicate manifest id '{}'", entry.id)));
            }
        }
        Ok(())
    }

    /// `<item>` lines for `book.opf`.
    pub fn manifest_xml(&self) -> String {
        let mut out = String::new();
        for entry in &self.manifest_entries {
            let _ = writeln!(
                out,
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
                entry.id, entry.href
            );
        }
        out
    }

    /// `<itemref>` lines for `book.opf`.
    pub fn spine_xml(&self) -> String {
        let mut out = String::new();
        for id in &self.spine_entries {
            let _ = writeln!(out, "    <itemref idref=\"{id}\" linear=\"yes\"/>");
        }
        out
    }

    /// `<navPoint>` elements for `toc.ncx`.
    pub fn nav_map_xml(&self) -> String {
        let mut out = String::new();
        write_nav_points(&mut out, &self.nav_map, 2);
        out
    }

    /// `<li>` elements for the XHTML table of contents.
    pub fn toc_xhtml(&self) -> String {
        let mut out = String::new();
        write_toc_entries(&mut out, &self.toc_entries, 4);
        out
    }
}

/// Recursively write navPoint elements.
fn write_nav_points(ncx: &mut String, points: &[NavPoint], indent: usize) {
    let pad = "  ".repeat(indent);
    for point in points {
        let _ = writeln!(
            ncx,
            "{pad}<navPoint id=\"{}\" playOrder=\"{}\">",
            point.id, point.play_order
        );
        let _ = writeln!(ncx, "{pad}  <navLabel><text>{}</text></navLabel>", point.label);
        let _ = writeln!(ncx, "{pad}  <content src=\"{}\"/>", point.src);
        write_nav_points(ncx, &point.children, indent + 1);
        let _ = writeln!(ncx, "{pad}</navPoint>");
    }
}

fn write_toc_entries(out: &mut String, entries: &[TocEntry], indent: usize) {
    let pad = "  ".repeat(indent);
    for entry in entries {
        let _ = writeln!(out, "{pad}<li>");
        let _ = writeln!(out, "{pad}  <a href=\"{}\">{}</a>", entry.href, entry.label);
        if !entry.children.is_empty() {
            let _ = writeln!(out, "{pad}  <ol>");
            write_toc_entries(out, &entry.children, indent + 2);
            let _ = writeln!(out, "{pad}  </ol>");
        }
        let _ = writeln!(out, "{pad}</li>");
    }
}
