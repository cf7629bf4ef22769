//! Document tree construction.
//!
//! Importers feed regions of raw markup to a [`TreeBuilder`], optionally
//! bracketed by [`begin_part`](TreeBuilder::begin_part) and
//! [`close_part`](TreeBuilder::close_part). The builder repairs each region,
//! assigns headings, indices and slugs, and drops anything empty.

mod runs;

pub use runs::parse_runs;

use log::{debug, info};

use crate::error::Result;
use crate::model::{Book, BookItem, Chapter, Paragraph, Part};
use crate::repair::{RepairEngine, RepairOutcome, heading_text, split_chapters};
use crate::slug::SlugAllocator;

/// A part whose index and slug are assigned when its first chapter lands.
#[derive(Debug)]
struct PendingPart {
    title: String,
    allocated: Option<(u32, String)>,
    chapters: Vec<Chapter>,
}

/// Builds a [`Book`] one region at a time.
///
/// Parts and chapters share one index counter starting at 1, so indices
/// follow document order across both kinds.
#[derive(Debug)]
pub struct TreeBuilder {
    engine: RepairEngine,
    slugs: SlugAllocator,
    next_index: u32,
    items: Vec<BookItem>,
    part: Option<PendingPart>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(RepairEngine::default())
    }
}

impl TreeBuilder {
    pub fn new(engine: RepairEngine) -> Self {
        Self {
            engine,
            slugs: SlugAllocator::new(),
            next_index: 1,
            items: Vec::new(),
            part: None,
        }
    }

    pub fn engine(&self) -> &RepairEngine {
        &self.engine
    }

    fn take_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Escape an explicit title the same way body text is escaped.
    fn explicit_title(&self, title: &str) -> String {
        self.engine.table().apply(title.trim())
    }

    /// Open a part. Any part already open is closed first.
    pub fn begin_part(&mut self, title: &str) {
        self.close_part();
        self.part = Some(PendingPart {
            title: self.explicit_title(title),
            allocated: None,
            chapters: Vec::new(),
        });
    }

    /// Close the open part, if any. A part that never received a chapter
    /// is dropped without consuming an index.
    pub fn close_part(&mut self) {
        let Some(part) = self.part.take() else {
            return;
        };
        match part.allocated {
            Some((index, slug)) => self.items.push(BookItem::Part(Part {
                title: part.title,
                slug,
                index,
                chapters: part.chapters,
            })),
            None => debug!("dropping part '{}' with no chapters", part.title),
        }
    }

    pub fn in_part(&self) -> bool {
        self.part.is_some()
    }

    /// Repair `text` and add it as one chapter.
    ///
    /// With `title`, every paragraph is kept as body text. Without it, the
    /// first paragraph becomes the heading and is not repeated in the body.
    /// Returns `false` when the region was empty and nothing was added.
    pub fn add_chapter(&mut self, title: Option<&str>, text: &str) -> bool {
        let paragraphs = match self.engine.repair(text) {
            RepairOutcome::Empty => {
                debug!("skipping empty region");
                return false;
            }
            RepairOutcome::Paragraphs(paragraphs) => paragraphs,
        };

        let (heading, body) = match title.filter(|t| !t.trim().is_empty()) {
            Some(title) => (self.explicit_title(title), &paragraphs[..]),
            None => (heading_text(&paragraphs[0]), &paragraphs[1..]),
        };
        let paragraphs: Vec<Paragraph> = body
            .iter()
            .map(|p| Paragraph::new(parse_runs(p)))
            .filter(|p| !p.runs.is_empty())
            .collect();

        self.allocate_part();
        let index = self.take_index();
        let slug = self.slugs.allocate(&heading);
        info!("chapter {index}: {heading}");

        let chapter = Chapter {
            heading,
            slug,
            index,
            paragraphs,
        };
        match &mut self.part {
            Some(part) => part.chapters.push(chapter),
            None => self.items.push(BookItem::Chapter(chapter)),
        }
        true
    }

    /// Cut a whole document at its page breaks and add one chapter per
    /// non-empty region. Returns the number of chapters added.
    pub fn add_document(&mut self, text: &str) -> usize {
        split_chapters(text)
            .iter()
            .filter(|region| self.add_chapter(None, region))
            .count()
    }

    fn allocate_part(&mut self) {
        let needs_index = matches!(&self.part, Some(part) if part.allocated.is_none());
        if !needs_index {
            return;
        }
        let index = self.take_index();
        if let Some(part) = &mut self.part {
            let slug = self.slugs.allocate(&part.title);
            info!("part {index}: {}", part.title);
            part.allocated = Some((index, slug));
        }
    }

    /// Close any open part and check the finished tree.
    pub fn finish(mut self) -> Result<Book> {
        self.close_part();
        let book = Book { items: self.items };
        book.validate()?;
        Ok(book)
    }
}
