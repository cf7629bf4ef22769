//! XHTML content documents for parts and chapters.

use std::fmt::Write as _;

use crate::model::{Chapter, Metadata, Paragraph, Part, Run, SectionRef};
use crate::util::escape_xml;

/// Renders parts and chapters for one book.
///
/// Pure string construction: run text is already XHTML-safe, only the
/// metadata values are escaped here.
#[derive(Debug, Clone)]
pub struct XhtmlRenderer {
    title: String,
    lang: String,
}

impl XhtmlRenderer {
    pub fn new(metadata: &Metadata) -> Self {
        Self {
            title: escape_xml(&metadata.title),
            lang: escape_xml(&metadata.language),
        }
    }

    pub fn render(&self, section: SectionRef<'_>) -> String {
        match section {
            SectionRef::Part(part) => self.render_part(part),
            SectionRef::Chapter(chapter) => self.render_chapter(chapter),
        }
    }

    fn header(&self, kind: &str, heading: &str, centered: bool) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"{0}\" lang=\"{0}\">",
            self.lang
        );
        out.push_str("  <head>\n");
        out.push_str("    <meta charset=\"utf-8\"/>\n");
        let _ = writeln!(out, "    <title>{}</title>", self.title);
        out.push_str("    <link rel=\"stylesheet\" href=\"style.css\" type=\"text/css\"/>\n");
        out.push_str("  </head>\n");
        out.push_str("  <body>\n");
        let _ = writeln!(out, "    <section epub:type=\"bodymatter {kind}\">");
        out.push_str("      <header>\n");
        if centered {
            let _ = writeln!(
                out,
                "        <h1 style=\"text-align: center; margin-top: 20%;\">{heading}</h1>"
            );
        } else {
            let _ = writeln!(out, "        <h1>{heading}</h1>");
        }
        out.push_str("      </header>\n");
        out
    }

    const FOOTER: &str = "    </section>\n  </body>\n</html>\n";

    /// Heading-only, centered page.
    pub fn render_part(&self, part: &Part) -> String {
        let mut out = self.header("part", &part.title, true);
        out.push_str(Self::FOOTER);
        out
    }

    pub fn render_chapter(&self, chapter: &Chapter) -> String {
        let mut out = self.header("chapter", &chapter.heading, false);
        let mut notes = Vec::new();

        let _ = writeln!(out, "      <div id=\"ch{}\">", chapter.slug);
        for (i, paragraph) in chapter.paragraphs.iter().enumerate() {
            let open = if i == 0 { "<p class=\"noindent\">" } else { "<p>" };
            let _ = writeln!(out, "        {open}{}</p>", render_paragraph(paragraph, &mut notes));
        }
        out.push_str("      </div>\n");

        for (i, note) in notes.iter().enumerate() {
            let n = i + 1;
            let _ = writeln!(
                out,
                "      <aside epub:type=\"footnote\" id=\"fn{n}\" class=\"footnote\"><a href=\"#fnref{n}\">{n}.</a> {note}</aside>"
            );
        }

        out.push_str(Self::FOOTER);
        out
    }
}

/// Inline markup of one paragraph. Footnote bodies are collected into
/// `notes` and replaced by numbered references.
fn render_paragraph(paragraph: &Paragraph, notes: &mut Vec<String>) -> String {
    let mut out = String::new();
    render_runs(&paragraph.runs, notes, &mut out);
    out
}

fn render_runs(runs: &[Run], notes: &mut Vec<String>, out: &mut String) {
    for run in runs {
        match run {
            Run::Text(text) => out.push_str(text),
            Run::LineBreak => out.push_str("<br />"),
            Run::Bold(children) => wrap(out, "<strong>", "</strong>", children, notes),
            Run::Italic(children) => wrap(out, "<em>", "</em>", children, notes),
            Run::Underline(children) => wrap(
                out,
                "<span style=\"text-decoration: underline;\">",
                "</span>",
                children,
                notes,
            ),
            Run::Strikethrough(children) => wrap(
                out,
                "<span style=\"text-decoration: line-through;\">",
                "</span>",
                children,
                notes,
            ),
            Run::Hyperlink { href, children } => {
                let open = format!("<a href=\"{href}\">");
                wrap(out, &open, "</a>", children, notes);
            }
            Run::Footnote(children) => {
                let mut body = String::new();
                render_runs(children, notes, &mut body);
                notes.push(body);
                let n = notes.len();
                let _ = write!(
                    out,
                    "<sup><a epub:type=\"noteref\" href=\"#fn{n}\" id=\"fnref{n}\">{n}</a></sup>"
                );
            }
        }
    }
}

fn wrap(out: &mut String, open: &str, close: &str, children: &[Run], notes: &mut Vec<String>) {
    out.push_str(open);
    render_runs(children, notes, out);
    out.push_str(close);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Run {
        Run::Text(s.to_string())
    }

    fn renderer() -> XhtmlRenderer {
        XhtmlRenderer::new(&Metadata::new("Tom & Jerry", "A. Author"))
    }

    fn chapter(paragraphs: Vec<Paragraph>) -> Chapter {
        Chapter {
            heading: "Dawn".into(),
            slug: "Dawn_1".into(),
            index: 3,
            paragraphs,
        }
    }

    #[test]
    fn test_chapter_document_shape() {
        let xhtml = renderer().render_chapter(&chapter(vec![
            Paragraph::new(vec![t("First.")]),
            Paragraph::new(vec![t("Second "), Run::Bold(vec![Run::Italic(vec![t("line")])])]),
        ]));

        assert!(xhtml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xhtml.contains("xml:lang=\"en-US\""));
        assert!(xhtml.contains("<title>Tom &amp; Jerry</title>"));
        assert!(xhtml.contains("<section epub:type=\"bodymatter chapter\">"));
        assert!(xhtml.contains("<h1>Dawn</h1>"));
        assert!(xhtml.contains("<div id=\"chDawn_1\">"));
        assert!(xhtml.contains("<p class=\"noindent\">First.</p>"));
        assert!(xhtml.contains("<p>Second <strong><em>line</em></strong></p>"));
    }

    #[test]
    fn test_footnotes_move_to_asides() {
        let xhtml = renderer().render_chapter(&chapter(vec![Paragraph::new(vec![
            t("Claim"),
            Run::Footnote(vec![t("Source.")]),
            Run::LineBreak,
            Run::Hyperlink {
                href: "http://x.org".into(),
                children: vec![t("link")],
            },
        ])]));

        assert!(xhtml.contains(
            "<p class=\"noindent\">Claim<sup><a epub:type=\"noteref\" href=\"#fn1\" id=\"fnref1\">1</a></sup><br /><a href=\"http://x.org\">link</a></p>"
        ));
        assert!(xhtml.contains("<aside epub:type=\"footnote\" id=\"fn1\" class=\"footnote\"><a href=\"#fnref1\">1.</a> Source.</aside>"));
        assert_eq!(xhtml.matches("<p").count(), 1);
    }

    #[test]
    fn test_part_is_centered_heading_only() {
        let part = Part {
            title: "Act One".into(),
            slug: "ActOne_1".into(),
            index: 2,
            chapters: Vec::new(),
        };
        let xhtml = renderer().render(SectionRef::Part(&part));
        assert!(xhtml.contains("<section epub:type=\"bodymatter part\">"));
        assert!(xhtml.contains("<h1 style=\"text-align: center; margin-top: 20%;\">Act One</h1>"));
        assert!(!xhtml.contains("<div"));
    }
}
