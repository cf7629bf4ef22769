//! Static package templates and `%name` placeholder substitution.

use std::collections::HashMap;

use crate::export::package::Package;
use crate::model::Metadata;
use crate::util::escape_xml;

pub const CONTAINER_XML: &str = include_str!("../../templates/container.xml");
pub const BOOK_OPF: &str = include_str!("../../templates/book.opf");
pub const TOC_NCX: &str = include_str!("../../templates/toc.ncx");
pub const TITLE_XHTML: &str = include_str!("../../templates/title.xhtml");
pub const TOC_XHTML: &str = include_str!("../../templates/toc.xhtml");
pub const COPYRIGHT_XHTML: &str = include_str!("../../templates/copyright.xhtml");
pub const COVER_XHTML: &str = include_str!("../../templates/Cover.xhtml");
pub const STYLE_CSS: &str = include_str!("../../templates/style.css");

const FICTION_NOTICE: &str = "This book is a work of fiction. Any similarity between the characters and situations within its pages and places or persons, living or dead, is unintentional and coincidental.";

/// Values for the `%name` placeholders of one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: HashMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `%name` to `value`, inserted literally.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Every variable the package templates reference.
    pub fn for_book(meta: &Metadata, uid: &str, modified: &str, package: &Package) -> Self {
        let mut vars = Self::new();
        let author = escape_xml(meta.author.trim());

        vars.set("uid", escape_xml(uid))
            .set("title", escape_xml(&meta.title))
            .set("upperTitle", escape_xml(&meta.title.to_uppercase()))
            .set("autLastfirst", escape_xml(&last_first(meta.author.trim())))
            .set("author", author)
            .set("publisher", escape_xml(meta.publisher()))
            .set("lang", escape_xml(&meta.language))
            .set("pubdate", escape_xml(&meta.pub_date))
            .set("modified", modified)
            .set("copyrightYear", escape_xml(&meta.copyright_year))
            .set("firstChapterFilename", package.first_chapter_file.as_str())
            .set("chapterManifestEntries", package.manifest_xml())
            .set("chapterSpineEntries", package.spine_xml())
            .set("chapterTocEntries", package.toc_xhtml())
            .set("navmap", package.nav_map_xml());

        if meta.cover.is_some() {
            vars.set("coverMeta", "    <meta name=\"cover\" content=\"cover-image\"/>\n")
                .set(
                    "coverManifestEntries",
                    "    <item id=\"cover\" href=\"Cover.xhtml\" media-type=\"application/xhtml+xml\"/>\n    \
                     <item id=\"cover-image\" href=\"Cover.jpg\" media-type=\"image/jpeg\" properties=\"cover-image\"/>\n",
                )
                .set("coverSpineEntry", "    <itemref idref=\"cover\" linear=\"no\"/>\n");
        } else {
            vars.set("coverMeta", "")
                .set("coverManifestEntries", "")
                .set("coverSpineEntry", "");
        }

        if meta.include_copyright {
            vars.set(
                "copyrightPageManifestEntry",
                "    <item id=\"copyright\" href=\"copyright.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            )
            .set("copyrightSpineEntry", "    <itemref idref=\"copyright\" linear=\"yes\"/>\n")
            .set(
                "copyrightTocEntry",
                "        <li><a href=\"copyright.xhtml\">Copyright Notice</a></li>\n",
            );
        } else {
            vars.set("copyrightPageManifestEntry", "")
                .set("copyrightSpineEntry", "")
                .set("copyrightTocEntry", "");
        }

        if meta.fiction {
            vars.set(
                "fictionCopyrightAddition",
                format!("      <p class=\"noindent\">{FICTION_NOTICE}</p>\n"),
            );
        } else {
            vars.set("fictionCopyrightAddition", "");
        }

        vars
    }
}

/// `"Jane Q. Doe"` → `"Doe, Jane Q."`. Single names are returned as is.
fn last_first(author: &str) -> String {
    match author.rsplit_once(char::is_whitespace) {
        Some((first, last)) if !first.trim().is_empty() => format!("{last}, {}", first.trim_end()),
        _ => author.to_string(),
    }
}

/// Replace every `%identifier` token whose name is known.
///
/// One left-to-right pass over `template`: a token is the longest run of
/// ASCII letters after `%`. Unknown tokens stay as written and inserted
/// values are never rescanned.
pub fn hydrate(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let name = &after[..len];
        match vars.get(name) {
            Some(value) if len > 0 => out.push_str(value),
            _ => {
                out.push('%');
                out.push_str(name);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::package::{FrontMatter, assemble};
    use crate::model::{Book, BookItem, Chapter, Paragraph, Run};

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        let mut vars = TemplateVars::new();
        for (k, v) in pairs {
            vars.set(*k, *v);
        }
        vars
    }

    #[test]
    fn test_hydrate_replaces_known_tokens_once() {
        let v = vars(&[("title", "%author"), ("author", "Jane")]);
        assert_eq!(hydrate("<t>%title</t> by %author", &v), "<t>%author</t> by Jane");
    }

    #[test]
    fn test_hydrate_uses_longest_identifier() {
        let v = vars(&[("title", "T"), ("upperTitle", "UT")]);
        assert_eq!(hydrate("%upperTitle/%title", &v), "UT/T");
        // `%titles` names a different, unknown variable
        assert_eq!(hydrate("%titles", &v), "%titles");
    }

    #[test]
    fn test_hydrate_leaves_unknown_and_bare_percent() {
        let v = vars(&[("x", "1")]);
        assert_eq!(hydrate("margin: 20%; %y %x%", &v), "margin: 20%; %y 1%");
    }

    #[test]
    fn test_style_css_has_no_placeholders() {
        assert_eq!(hydrate(STYLE_CSS, &vars(&[("title", "X")])), STYLE_CSS);
    }

    #[test]
    fn test_last_first() {
        assert_eq!(last_first("Jane Q. Doe"), "Doe, Jane Q.");
        assert_eq!(last_first("Prince"), "Prince");
    }

    fn package() -> Package {
        let book = Book {
            items: vec![BookItem::Chapter(Chapter {
                heading: "One".into(),
                slug: "One_1".into(),
                index: 1,
                paragraphs: vec![Paragraph::new(vec![Run::Text("x".into())])],
            })],
        };
        assemble(&book, &FrontMatter { copyright: true }).unwrap()
    }

    #[test]
    fn test_for_book_fills_every_opf_placeholder() {
        let meta = Metadata::new("Salt & Stone", "Ann Lee")
            .with_pub_date("2020-01-02")
            .with_copyright("2020", true)
            .with_fiction(true)
            .with_cover("cover.jpg");
        let vars = TemplateVars::for_book(&meta, "epub.x.y.00", "2020-01-02T00:00:00Z", &package());

        let opf = hydrate(BOOK_OPF, &vars);
        assert!(!opf.contains('%'));
        assert!(opf.contains("<dc:title>Salt &amp; Stone</dc:title>"));
        assert!(opf.contains("<meta refines=\"#creator\" property=\"file-as\">Lee, Ann</meta>"));
        assert!(opf.contains("properties=\"cover-image\""));
        assert!(opf.contains("<itemref idref=\"copyright\" linear=\"yes\"/>"));
        assert!(opf.contains("href=\"001_One_1.xhtml\""));

        let copyright = hydrate(COPYRIGHT_XHTML, &vars);
        assert!(copyright.contains("This book is a work of fiction."));

        let title = hydrate(TITLE_XHTML, &vars);
        assert!(title.contains("SALT &amp; STONE"));
    }

    #[test]
    fn test_for_book_without_optional_pages() {
        let meta = Metadata::new("Plain", "Ann Lee")
            .with_pub_date("2020-01-02")
            .with_copyright("2020", false);
        let vars = TemplateVars::for_book(&meta, "u", "m", &package());

        let opf = hydrate(BOOK_OPF, &vars);
        assert!(!opf.contains("cover"));
        assert!(!opf.contains("copyright.xhtml"));
        assert!(!hydrate(TOC_XHTML, &vars).contains("Copyright Notice"));
    }
}
