//! Canonical document tree: book → part → chapter → paragraph → run.
//!
//! The tree is built once by [`TreeBuilder`](crate::build::TreeBuilder) and is
//! read-only afterwards. Ownership is strictly top-down.

mod metadata;

pub use metadata::Metadata;

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Root of the document tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    pub items: Vec<BookItem>,
}

/// A top-level entry of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookItem {
    Part(Part),
    Chapter(Chapter),
}

/// A titled group of chapters, one level above chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub title: String,
    pub slug: String,
    pub index: u32,
    pub chapters: Vec<Chapter>,
}

/// One content file with a heading.
///
/// A chapter always came from a region with at least one non-blank
/// paragraph. When its heading was taken from that paragraph, `paragraphs`
/// holds the rest and may be empty: such a chapter is a heading-only page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub heading: String,
    pub slug: String,
    /// Position in the book, shared with parts. Orders filenames and `playOrder`.
    pub index: u32,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

/// Inline content of a paragraph.
///
/// `Text` holds XHTML-safe text: reserved characters are already entity
/// encoded by the repair stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text(String),
    LineBreak,
    Bold(Vec<Run>),
    Italic(Vec<Run>),
    Underline(Vec<Run>),
    Strikethrough(Vec<Run>),
    Hyperlink { href: String, children: Vec<Run> },
    Footnote(Vec<Run>),
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All chapters in document order, including those inside parts.
    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.items.iter().flat_map(|item| match item {
            BookItem::Part(part) => part.chapters.iter().collect::<Vec<_>>(),
            BookItem::Chapter(chapter) => vec![chapter],
        })
    }

    /// Parts and chapters in pre-order: each part precedes its chapters.
    pub fn sections(&self) -> Vec<SectionRef<'_>> {
        let mut out = Vec::with_capacity(self.entry_count());
        for item in &self.items {
            out.push(item.as_section());
            if let BookItem::Part(part) = item {
                out.extend(part.chapters.iter().map(SectionRef::Chapter));
            }
        }
        out
    }

    /// Number of parts plus chapters, i.e. the number of generated content files.
    pub fn entry_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                BookItem::Part(part) => 1 + part.chapters.len(),
                BookItem::Chapter(_) => 1,
            })
            .sum()
    }

    /// Re-check the structural invariants of a finished tree.
    ///
    /// Indices must strictly increase in document order, slugs must be
    /// unique and parts must be non-empty. A chapter without body
    /// paragraphs is accepted: its heading consumed the only paragraph.
    pub fn validate(&self) -> Result<()> {
        let mut last_index = 0u32;
        let mut slugs = HashSet::new();

        let mut check = |index: u32, slug: &str| -> Result<()> {
            if index <= last_index {
                return Err(Error::Build(format!(
                    "index {index} for '{slug}' does not follow {last_index}"
                )));
            }
            if !slugs.insert(slug.to_string()) {
                return Err(Error::Build(format!("duplicate slug '{slug}'")));
            }
            last_index = index;
            Ok(())
        };

        for item in &self.items {
            match item {
                BookItem::Part(part) => {
                    if part.chapters.is_empty() {
                        return Err(Error::Build(format!("part '{}' has no chapters", part.title)));
                    }
                    check(part.index, &part.slug)?;
                    for chapter in &part.chapters {
                        check(chapter.index, &chapter.slug)?;
                    }
                }
                BookItem::Chapter(chapter) => check(chapter.index, &chapter.slug)?,
            }
        }
        Ok(())
    }
}

impl BookItem {
    pub fn as_section(&self) -> SectionRef<'_> {
        match self {
            BookItem::Part(part) => SectionRef::Part(part),
            BookItem::Chapter(chapter) => SectionRef::Chapter(chapter),
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            BookItem::Part(part) => part.index,
            BookItem::Chapter(chapter) => chapter.index,
        }
    }
}

/// Shared naming for generated content files.
pub trait Section {
    fn title(&self) -> &str;
    fn slug(&self) -> &str;
    fn index(&self) -> u32;

    /// `007_Prologue_1.xhtml`
    fn file_name(&self) -> String {
        format!("{:03}_{}.xhtml", self.index(), self.slug())
    }

    /// Manifest and navPoint id, `chPrologue_1007`.
    ///
    /// Slugs end in digits, so an index wider than three digits is set off
    /// with `-` to keep ids unique (`chA_1-1011`).
    fn id(&self) -> String {
        if self.index() < 1000 {
            format!("ch{}{:03}", self.slug(), self.index())
        } else {
            format!("ch{}-{}", self.slug(), self.index())
        }
    }
}

/// Borrowed view of either kind of content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRef<'a> {
    Part(&'a Part),
    Chapter(&'a Chapter),
}

impl Section for SectionRef<'_> {
    fn title(&self) -> &str {
        match self {
            SectionRef::Part(part) => part.title(),
            SectionRef::Chapter(chapter) => chapter.title(),
        }
    }
    fn slug(&self) -> &str {
        match self {
            SectionRef::Part(part) => part.slug(),
            SectionRef::Chapter(chapter) => chapter.slug(),
        }
    }
    fn index(&self) -> u32 {
        match self {
            SectionRef::Part(part) => part.index,
            SectionRef::Chapter(chapter) => chapter.index,
        }
    }
}

impl Section for Part {
    fn title(&self) -> &str {
        &self.title
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn index(&self) -> u32 {
        self.index
    }
}

impl Section for Chapter {
    fn title(&self) -> &str {
        &self.heading
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn index(&self) -> u32 {
        self.index
    }
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Text content with all inline formatting removed.
    ///
    /// Footnote bodies are excluded since they are not part of the running
    /// text. Line breaks become a single space.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.runs, &mut out);
        out
    }

    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }
}

fn collect_text(runs: &[Run], out: &mut String) {
    for run in runs {
        match run {
            Run::Text(text) => out.push_str(text),
            Run::LineBreak => out.push(' '),
            Run::Bold(children)
            | Run::Italic(children)
            | Run::Underline(children)
            | Run::Strikethrough(children)
            | Run::Hyperlink { children, .. } => collect_text(children, out),
            Run::Footnote(_) => {}
        }
    }
}
