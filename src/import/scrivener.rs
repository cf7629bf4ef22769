//! Scrivener project input.
//!
//! Only the `DraftFolder` subtree of the binder is read. Top-level folders
//! become parts, top-level texts become chapters outside any part, and
//! deeper folders are flattened into their enclosing part.
//!
//! Scrivener stores inline annotations and footnotes as `scrivcmt://` links
//! into a `.comments` file next to each document. Footnotes are inlined as
//! `\footnote{...}`; annotations keep only their link text.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Importer, SourceConverter, find_project_file};
use crate::build::TreeBuilder;
use crate::error::{Error, IoResultExt, Result};
use crate::repair::patterns::NOTE_LINK_RE;
use crate::repair::split_chapters;
use crate::util::decode_text;

/// Binder item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderKind {
    Text,
    Folder,
    DraftFolder,
    Other(String),
}

impl BinderKind {
    fn parse(value: &str) -> Self {
        match value {
            "Text" => BinderKind::Text,
            "Folder" => BinderKind::Folder,
            "DraftFolder" => BinderKind::DraftFolder,
            other => BinderKind::Other(other.to_string()),
        }
    }
}

/// One node of the project binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderItem {
    /// `ID` (Scrivener 2) or `UUID` (Scrivener 3).
    pub id: String,
    pub kind: BinderKind,
    pub title: String,
    pub children: Vec<BinderItem>,
}

impl BinderItem {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let mut item = BinderItem {
            id: String::new(),
            kind: BinderKind::Other(String::new()),
            title: String::new(),
            children: Vec::new(),
        };
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.as_ref() {
                b"ID" | b"UUID" => item.id = value.into_owned(),
                b"Type" => item.kind = BinderKind::parse(&value),
                _ => {}
            }
        }
        item
    }
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32).map(String::from)
}

/// Parse a `.scrivx` document and return the children of its draft folder.
pub fn parse_binder(xml: &str) -> Result<Vec<BinderItem>> {
    // Titles are trimmed on close; trimming text events would eat the
    // spaces around entity references.
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut seen_root = false;
    let mut binder_depth = 0usize;
    let mut in_title = false;
    let mut top: Vec<BinderItem> = Vec::new();
    let mut stack: Vec<BinderItem> = Vec::new();

    let attach = |item: BinderItem, stack: &mut Vec<BinderItem>, top: &mut Vec<BinderItem>| {
        match stack.last_mut() {
            Some(parent) => parent.children.push(item),
            None => top.push(item),
        }
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if !seen_root {
                    if name.as_ref() != b"ScrivenerProject" {
                        return Err(Error::Input("not a Scrivener project file".into()));
                    }
                    seen_root = true;
                    continue;
                }
                match name.as_ref() {
                    b"Binder" => binder_depth += 1,
                    b"BinderItem" if binder_depth > 0 => stack.push(BinderItem::from_start(&e)),
                    b"Title" if stack.last().is_some_and(|item| item.title.is_empty()) => {
                        in_title = true
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if !seen_root {
                    if e.name().as_ref() != b"ScrivenerProject" {
                        return Err(Error::Input("not a Scrivener project file".into()));
                    }
                    seen_root = true;
                    continue;
                }
                if binder_depth > 0 && e.name().as_ref() == b"BinderItem" {
                    attach(BinderItem::from_start(&e), &mut stack, &mut top);
                }
            }
            Event::Text(e) => {
                if in_title && let Some(item) = stack.last_mut() {
                    item.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_title && let Some(item) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        item.title.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"Title" => {
                    if in_title && let Some(item) = stack.last_mut() {
                        item.title = item.title.trim().to_string();
                    }
                    in_title = false;
                }
                b"Binder" => binder_depth = binder_depth.saturating_sub(1),
                b"BinderItem" if binder_depth > 0 => {
                    if let Some(item) = stack.pop() {
                        attach(item, &mut stack, &mut top);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::Input("not a Scrivener project file".into()));
    }

    top.into_iter()
        .find(|item| item.kind == BinderKind::DraftFolder)
        .map(|draft| draft.children)
        .ok_or_else(|| Error::Input("project has no Draft folder".into()))
}

/// One `<Comment>` of a document's `.comments` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// `Footnote="Yes"`.
    pub footnote: bool,
    pub text: String,
}

fn annotation_from_start(e: &BytesStart<'_>) -> (String, Annotation) {
    let mut id = String::new();
    let mut note = Annotation {
        footnote: false,
        text: String::new(),
    };
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.as_ref() {
            b"ID" => id = value.into_owned(),
            b"Footnote" => note.footnote = value == "Yes",
            _ => {}
        }
    }
    (id, note)
}

/// Parse a `.comments` file into annotations keyed by `ID`.
pub fn parse_comments(xml: &str) -> Result<HashMap<String, Annotation>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut notes = HashMap::new();
    let mut current: Option<(String, Annotation)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Comment" => {
                current = Some(annotation_from_start(&e));
            }
            Event::Empty(e) if e.name().as_ref() == b"Comment" => {
                let (id, note) = annotation_from_start(&e);
                notes.insert(id, note);
            }
            Event::Text(e) => {
                if let Some((_, note)) = current.as_mut() {
                    note.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if let Some((_, note)) = current.as_mut() {
                    note.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some((_, note)) = current.as_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        note.text.push_str(&resolved);
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"Comment" => {
                if let Some((id, mut note)) = current.take() {
                    note.text = note.text.trim().to_string();
                    notes.insert(id, note);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(notes)
}

/// Converted annotation text on one line, document body only.
fn flatten_note(text: &str) -> String {
    let regions = split_chapters(text);
    regions
        .iter()
        .flat_map(|region| region.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A Scrivener project directory.
#[derive(Debug, Clone)]
pub struct ScrivenerImporter {
    root: PathBuf,
    converter: SourceConverter,
}

impl ScrivenerImporter {
    pub fn new(root: impl Into<PathBuf>, converter: SourceConverter) -> Self {
        Self {
            root: root.into(),
            converter,
        }
    }

    /// Document file of a binder item, in either project layout.
    fn document_path(&self, id: &str) -> Option<PathBuf> {
        let files = self.root.join("Files");
        [
            files.join("Docs").join(format!("{id}.rtf")),
            files.join("Data").join(id).join("content.rtf"),
        ]
        .into_iter()
        .find(|p| p.is_file())
    }

    /// Replace `scrivcmt://` links in the converted text of `document`.
    ///
    /// A link to a footnote becomes its link text followed by
    /// `\footnote{...}`. Any other link, or one whose annotation cannot be
    /// found, keeps only its link text.
    fn resolve_note_links(&self, text: &str, document: &Path) -> Result<String> {
        if !NOTE_LINK_RE.is_match(text) {
            return Ok(text.to_string());
        }

        let comments = document.with_extension("comments");
        let notes = if comments.is_file() {
            let bytes = fs::read(&comments).at(&comments)?;
            parse_comments(&decode_text(&bytes, None)).map_err(|e| {
                Error::Input(format!("failed to parse {}: {e}", comments.display()))
            })?
        } else {
            warn!("{} links to annotations but has no {}", document.display(), comments.display());
            HashMap::new()
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in NOTE_LINK_RE.captures_iter(text) {
            let Some(link) = caps.get(0) else { continue };
            out.push_str(&text[last..link.start()]);
            out.push_str(&caps[2]);
            match notes.get(&caps[1]) {
                Some(note) if note.footnote => {
                    out.push_str("\\footnote{");
                    out.push_str(&self.note_text(&note.text)?);
                    out.push('}');
                }
                Some(_) => debug!("dropping annotation {}", &caps[1]),
                None => warn!("annotation {} not found in {}", &caps[1], comments.display()),
            }
            last = link.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Footnote body through the same converter as the documents.
    fn note_text(&self, body: &str) -> Result<String> {
        let converted = match &self.converter {
            SourceConverter::Passthrough => body.to_string(),
            converter => {
                let mut file = tempfile::Builder::new()
                    .prefix("folio-note-")
                    .suffix(".rtf")
                    .tempfile()
                    .map_err(|e| Error::io(std::env::temp_dir(), e))?;
                file.write_all(body.as_bytes()).at(file.path())?;
                converter.convert(file.path())?
            }
        };
        Ok(flatten_note(&converted))
    }

    fn walk(&self, items: &[BinderItem], depth: usize, builder: &mut TreeBuilder) -> Result<()> {
        for item in items {
            match item.kind {
                BinderKind::Text => {
                    if depth == 0 {
                        builder.close_part();
                    }
                    let Some(path) = self.document_path(&item.id) else {
                        warn!("skipping '{}': no document file for {}", item.title, item.id);
                        continue;
                    };
                    info!("processing chapter '{}'", item.title);
                    let text = self.converter.convert(&path)?;
                    let text = self.resolve_note_links(&text, &path)?;
                    builder.add_chapter(Some(&item.title), &text);
                }
                BinderKind::Folder => {
                    if depth == 0 {
                        info!("processing part '{}'", item.title);
                        builder.begin_part(&item.title);
                    }
                    self.walk(&item.children, depth + 1, builder)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Importer for ScrivenerImporter {
    fn parse(&mut self, builder: &mut TreeBuilder) -> Result<()> {
        let project = find_project_file(&self.root)?.ok_or_else(|| {
            Error::Input(format!("{} is not a valid Scrivener project", self.root.display()))
        })?;
        let bytes = fs::read(&project).at(&project)?;
        let items = parse_binder(&decode_text(&bytes, None))?;
        self.walk(&items, 0, builder)?;
        builder.close_part();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookItem, Run};
    use std::path::Path;
    use tempfile::TempDir;

    // Lay out a Scrivener 2 project with the given binder and documents.
    fn write_project(root: &Path, binder: &str, docs: &[(&str, &str)]) {
        let docs_dir = root.join("Files").join("Docs");
        fs::create_dir_all(&docs_dir).unwrap();
        fs::write(
            root.join("Novel.scrivx"),
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ScrivenerProject Version=\"2.0\"><Binder>{binder}</Binder></ScrivenerProject>"),
        )
        .unwrap();
        for (id, text) in docs {
            fs::write(docs_dir.join(format!("{id}.rtf")), text).unwrap();
        }
    }

    const BINDER: &str = r#"
        <BinderItem ID="0" Type="DraftFolder"><Title>Draft</Title><Children>
            <BinderItem ID="1" Type="Text"><Title>Prologue</Title></BinderItem>
            <BinderItem ID="2" Type="Folder"><Title>Act One &amp; Two</Title><Children>
                <BinderItem ID="3" Type="Text"><Title>Arrival</Title></BinderItem>
                <BinderItem ID="4" Type="Folder"><Title>Nested</Title><Children>
                    <BinderItem ID="5" Type="Text"><Title>Deep</Title></BinderItem>
                </Children></BinderItem>
            </Children></BinderItem>
            <BinderItem ID="6" Type="Text"><Title>Epilogue</Title></BinderItem>
            <BinderItem ID="7" Type="Text"><Title>Missing</Title></BinderItem>
        </Children></BinderItem>
        <BinderItem ID="8" Type="ResearchFolder"><Title>Research</Title><Children>
            <BinderItem ID="9" Type="Text"><Title>Notes</Title></BinderItem>
        </Children></BinderItem>
    "#;

    #[test]
    fn test_parse_binder_keeps_draft_only() {
        let xml = format!("<ScrivenerProject><Binder>{BINDER}</Binder></ScrivenerProject>");
        let items = parse_binder(&xml).unwrap();

        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Prologue", "Act One & Two", "Epilogue", "Missing"]);
        assert_eq!(items[1].kind, BinderKind::Folder);
        assert_eq!(items[1].children.len(), 2);
        assert_eq!(items[1].children[1].children[0].id, "5");
    }

    #[test]
    fn test_parse_binder_rejects_other_roots() {
        assert!(matches!(parse_binder("<html><body/></html>"), Err(Error::Input(_))));
        assert!(matches!(
            parse_binder("<ScrivenerProject><Binder/></ScrivenerProject>"),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn test_scrivener3_uuid_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join("Novel.scrivx"),
            r#"<ScrivenerProject Version="3.0"><Binder>
                <BinderItem UUID="AB-12" Type="DraftFolder"><Title>Manuscript</Title><Children>
                    <BinderItem UUID="CD-34" Type="Text"><Title>Opening</Title></BinderItem>
                </Children></BinderItem>
            </Binder></ScrivenerProject>"#,
        )
        .unwrap();
        let data = root.join("Files").join("Data").join("CD-34");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("content.rtf"), "It begins.").unwrap();

        let mut builder = TreeBuilder::default();
        ScrivenerImporter::new(root, SourceConverter::Passthrough)
            .parse(&mut builder)
            .unwrap();
        let book = builder.finish().unwrap();
        let chapter = book.chapters().next().unwrap();
        assert_eq!(chapter.heading, "Opening");
        assert_eq!(chapter.paragraphs.len(), 1);
    }

    #[test]
    fn test_parts_and_flattened_folders() {
        let dir = TempDir::new().unwrap();
        write_project(
            dir.path(),
            BINDER,
            &[
                ("1", "Once."),
                ("3", "They came."),
                ("5", "Down here."),
                ("6", "The end."),
                ("9", "Research notes."),
            ],
        );

        let mut builder = TreeBuilder::default();
        ScrivenerImporter::new(dir.path(), SourceConverter::Passthrough)
            .parse(&mut builder)
            .unwrap();
        let book = builder.finish().unwrap();

        assert_eq!(book.items.len(), 3);
        let BookItem::Part(part) = &book.items[1] else {
            panic!("expected a part");
        };
        assert_eq!(part.title, "Act One &amp; Two");
        let headings: Vec<&str> = part.chapters.iter().map(|c| c.heading.as_str()).collect();
        assert_eq!(headings, vec!["Arrival", "Deep"]);
        assert!(matches!(&book.items[2], BookItem::Chapter(c) if c.heading == "Epilogue"));
    }

    const NOTE_BINDER: &str = r#"
        <BinderItem ID="0" Type="DraftFolder"><Title>Draft</Title><Children>
            <BinderItem ID="1" Type="Text"><Title>Departure</Title></BinderItem>
        </Children></BinderItem>
    "#;

    #[test]
    fn test_parse_comments() {
        let notes = parse_comments(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Comments>
  <Comment ID="N1" Footnote="Yes" Color="0.5 0.5 0.5"><![CDATA[In \textit{March}.]]></Comment>
  <Comment ID="N2">Check the weather &amp; tides.</Comment>
  <Comment ID="N3" Footnote="No"/>
</Comments>"#,
        )
        .unwrap();

        assert_eq!(notes.len(), 3);
        assert_eq!(
            notes["N1"],
            Annotation {
                footnote: true,
                text: "In \\textit{March}.".to_string(),
            }
        );
        assert_eq!(notes["N2"].text, "Check the weather & tides.");
        assert!(!notes["N2"].footnote);
        assert!(!notes["N3"].footnote);
    }

    #[test]
    fn test_footnote_links_become_footnotes() {
        let dir = TempDir::new().unwrap();
        write_project(
            dir.path(),
            NOTE_BINDER,
            &[("1", "She left\\href{scrivcmt://N1}{ early}.")],
        );
        let docs = dir.path().join("Files").join("Docs");
        fs::write(
            docs.join("1.comments"),
            r#"<Comments><Comment ID="N1" Footnote="Yes"><![CDATA[Before \textit{dawn}.]]></Comment></Comments>"#,
        )
        .unwrap();

        let importer = ScrivenerImporter::new(dir.path(), SourceConverter::Passthrough);
        let doc = docs.join("1.rtf");
        let text = fs::read_to_string(&doc).unwrap();
        assert_eq!(
            importer.resolve_note_links(&text, &doc).unwrap(),
            "She left early\\footnote{Before \\textit{dawn}.}."
        );

        let mut builder = TreeBuilder::default();
        ScrivenerImporter::new(dir.path(), SourceConverter::Passthrough)
            .parse(&mut builder)
            .unwrap();
        let book = builder.finish().unwrap();
        let chapter = book.chapters().next().unwrap();
        assert_eq!(chapter.heading, "Departure");
        let runs = &chapter.paragraphs[0].runs;
        assert!(runs.iter().any(|run| matches!(run, Run::Footnote(_))), "{runs:?}");
    }

    #[test]
    fn test_annotation_links_keep_text_only() {
        let dir = TempDir::new().unwrap();
        let text = "It rained\\href{scrivcmt://A1}{ all night}.\\href{scrivcmt://A9}{ Then} it stopped.";
        write_project(dir.path(), NOTE_BINDER, &[("1", text)]);
        let docs = dir.path().join("Files").join("Docs");
        fs::write(
            docs.join("1.comments"),
            r#"<Comments><Comment ID="A1">Check the almanac.</Comment></Comments>"#,
        )
        .unwrap();

        let importer = ScrivenerImporter::new(dir.path(), SourceConverter::Passthrough);
        assert_eq!(
            importer.resolve_note_links(text, &docs.join("1.rtf")).unwrap(),
            "It rained all night. Then it stopped."
        );

        // No annotations file at all: the link text survives.
        assert_eq!(
            importer.resolve_note_links(text, &docs.join("2.rtf")).unwrap(),
            "It rained all night. Then it stopped."
        );
    }

    #[test]
    fn test_plain_links_are_untouched() {
        let importer = ScrivenerImporter::new("/nonexistent", SourceConverter::Passthrough);
        let text = "See \\href{https://example.com}{the site}.";
        assert_eq!(importer.resolve_note_links(text, Path::new("/nonexistent/1.rtf")).unwrap(), text);
    }

    #[test]
    fn test_missing_project_file() {
        let dir = TempDir::new().unwrap();
        let err = ScrivenerImporter::new(dir.path(), SourceConverter::Passthrough)
            .parse(&mut TreeBuilder::default())
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
