//! Markup repair: raw converter output to well-formed paragraph strings.
//!
//! Converters emit LaTeX-flavoured text that is frequently broken: braces
//! do not balance, page breaks land inside paragraph environments, and
//! paragraphs are delimited either by `\begin{...}`/`\end{...}` markers or
//! by nothing at all. [`RepairEngine`] reduces one chapter-candidate region
//! to a list of paragraphs whose inline markup uses a small internal tag set
//! (`<b>`, `<i>`, `<u>`, `<s>`, `<footnote>`, `<link href="...">`, `<br/>`).
//!
//! Repair never fails. Malformed input degrades to best-effort text.

mod entities;
mod inline;
pub(crate) mod patterns;

pub use entities::{CharRule, SpecialCharTable};
pub use inline::repair_broken_nesting;

use log::debug;

use patterns::*;

/// Result of repairing one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The region held no reader-visible text. Not an error.
    Empty,
    /// Non-blank paragraphs in document order; never empty.
    Paragraphs(Vec<String>),
}

impl RepairOutcome {
    /// The heading candidate: first paragraph with inline tags removed.
    pub fn heading(&self) -> Option<String> {
        match self {
            RepairOutcome::Empty => None,
            RepairOutcome::Paragraphs(paragraphs) => paragraphs.first().map(|p| heading_text(p)),
        }
    }

    pub fn into_paragraphs(self) -> Vec<String> {
        match self {
            RepairOutcome::Empty => Vec::new(),
            RepairOutcome::Paragraphs(paragraphs) => paragraphs,
        }
    }
}

/// Visible text of a repaired paragraph, used for headings and slugs.
pub fn heading_text(paragraph: &str) -> String {
    inline::strip_tags(paragraph).trim_end().to_string()
}

/// True when a repaired paragraph carries no text once tags are removed.
pub fn is_blank(paragraph: &str) -> bool {
    TAG_RE.replace_all(paragraph, "").trim().is_empty()
}

/// Paragraph-boundary detection plus the per-paragraph substitution passes.
#[derive(Debug, Clone, Default)]
pub struct RepairEngine {
    table: SpecialCharTable,
}

impl RepairEngine {
    pub fn new(table: SpecialCharTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SpecialCharTable {
        &self.table
    }

    /// Repair one chapter-candidate region.
    pub fn repair(&self, text: &str) -> RepairOutcome {
        let mut scanner = ParagraphScanner::default();
        for line in text.lines() {
            scanner.feed(line);
        }

        let paragraphs: Vec<String> = scanner
            .finish()
            .iter()
            .map(|raw| self.repair_paragraph(raw))
            .filter(|p| {
                let keep = !is_blank(p);
                if !keep {
                    debug!("dropping blank paragraph");
                }
                keep
            })
            .collect();

        if paragraphs.is_empty() {
            RepairOutcome::Empty
        } else {
            RepairOutcome::Paragraphs(paragraphs)
        }
    }

    /// Run the substitution passes over one raw paragraph, in fixed order.
    pub fn repair_paragraph(&self, raw: &str) -> String {
        let text = self.table.apply(raw);
        let text = inline::strip_font_directives(&text);
        let text = inline::convert_inline_styles(&text);
        let text = inline::repair_broken_nesting(&text);
        let text = inline::strip_unknown_directives(&text);
        let text = inline::strip_braces(&text);
        inline::normalize_whitespace(&text)
    }
}

// === Line classification ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Comment,
    Blank,
    Begin(&'a str),
    End(&'a str),
    /// Control words only, comment removed.
    Directive(&'a str),
    Text(&'a str),
}

/// Commands that carry reader-visible text. A line made of these is content,
/// not a directive line.
const INLINE_COMMANDS: &[&str] = &[
    "emph", "underline", "uline", "uwave", "sout", "xout", "st", "mbox", "hbox", "footnote",
    "href", "url", "marginpar", "todo", "comment", "annotation", "colorbox", "ldots", "dots",
    "copyright",
];

fn is_inline_command(word: &str) -> bool {
    word.starts_with("text") || INLINE_COMMANDS.contains(&word)
}

/// Cut a line at its first unescaped `%`.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' {
            let backslashes = bytes[..i].iter().rev().take_while(|&&c| c == b'\\').count();
            if backslashes % 2 == 0 {
                return &line[..i];
            }
        }
    }
    line
}

fn classify(raw: &str) -> Line<'_> {
    if raw.trim_start().starts_with('%') {
        return Line::Comment;
    }
    let line = strip_comment(raw);
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if let Some(caps) = PARA_BEGIN_RE.captures(line) {
        return Line::Begin(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = PARA_END_RE.captures(line) {
        return Line::End(caps.get(1).map_or("", |m| m.as_str()));
    }
    if DIRECTIVE_LINE_RE.is_match(line)
        && !CONTROL_WORD_RE
            .captures_iter(line)
            .any(|caps| is_inline_command(&caps[1]))
    {
        return Line::Directive(line);
    }
    Line::Text(line)
}

// === Paragraph boundaries ===

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Outside,
    /// Between a begin marker and its matching end.
    Explicit {
        env: String,
        depth: usize,
        lines: Vec<String>,
    },
    /// Text outside any marker.
    Plain {
        lines: Vec<String>,
        first: bool,
        saw_blank: bool,
    },
}

/// Splits a region into raw paragraph strings.
#[derive(Debug, Default)]
struct ParagraphScanner {
    state: ScanState,
    implicit_count: usize,
    raw: Vec<String>,
}

impl ParagraphScanner {
    fn feed(&mut self, line: &str) {
        match classify(line) {
            Line::Comment => {}
            Line::Begin(env) => match &mut self.state {
                ScanState::Explicit {
                    env: open, depth, ..
                } => {
                    if open == env {
                        *depth += 1;
                    }
                }
                _ => {
                    self.flush();
                    self.state = ScanState::Explicit {
                        env: env.to_string(),
                        depth: 0,
                        lines: Vec::new(),
                    };
                }
            },
            Line::End(env) => {
                if let ScanState::Explicit {
                    env: open, depth, ..
                } = &mut self.state
                    && open == env
                {
                    if *depth == 0 {
                        self.flush();
                    } else {
                        *depth -= 1;
                    }
                }
            }
            Line::Blank => match &mut self.state {
                ScanState::Explicit { lines, .. } => lines.push(String::new()),
                ScanState::Plain {
                    first: true,
                    saw_blank,
                    ..
                } => *saw_blank = true,
                _ => {}
            },
            Line::Directive(directive) => {
                if let ScanState::Explicit { lines, .. } = &mut self.state {
                    lines.push(directive.to_string());
                }
            }
            Line::Text(text) => match &mut self.state {
                ScanState::Outside => self.start_plain(text),
                ScanState::Explicit { lines, .. } => lines.push(text.to_string()),
                ScanState::Plain {
                    first: true,
                    saw_blank: true,
                    ..
                } => {
                    debug!("splitting heading line from first implicit paragraph");
                    self.flush();
                    self.start_plain(text);
                }
                ScanState::Plain { lines, .. } => lines.push(text.to_string()),
            },
        }
    }

    fn start_plain(&mut self, text: &str) {
        self.state = ScanState::Plain {
            lines: vec![text.to_string()],
            first: self.implicit_count == 0,
            saw_blank: false,
        };
        self.implicit_count += 1;
    }

    fn flush(&mut self) {
        match std::mem::take(&mut self.state) {
            ScanState::Outside => {}
            ScanState::Explicit { lines, .. } => self.raw.push(lines.join("\n")),
            // Plain lines are joined with the explicit line-break marker.
            ScanState::Plain { lines, .. } => self.raw.push(lines.join("\\\\ ")),
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.raw
    }
}

// === Chapter breaks ===

enum Piece<'a> {
    Line(&'a str),
    Break,
}

/// Split a line around any page-break directives it contains.
fn split_breaks(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in PAGE_BREAK_RE.find_iter(line) {
        let before = &line[last..m.start()];
        if !before.trim().is_empty() {
            pieces.push(Piece::Line(before));
        }
        pieces.push(Piece::Break);
        last = m.end();
    }
    let rest = &line[last..];
    if last == 0 || !rest.trim().is_empty() {
        pieces.push(Piece::Line(rest));
    }
    pieces
}

/// Lines between `\begin{document}` and `\end{document}`, or all lines if
/// the markers are absent.
fn document_body(text: &str) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| DOCUMENT_BEGIN_RE.is_match(l)) else {
        return lines;
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| DOCUMENT_END_RE.is_match(l))
        .map_or(lines.len(), |offset| start + 1 + offset);
    lines[start + 1..end].to_vec()
}

struct OpenEnv<'a> {
    env: &'a str,
    depth: usize,
    /// Position of the begin marker in the current region.
    begin_at: usize,
    saw_text: bool,
}

/// Cut a whole-document markup stream into chapter regions at page breaks.
///
/// A break inside an open paragraph environment is moved: in front of the
/// begin marker when no text has been seen yet, after the end marker
/// otherwise. Consecutive breaks yield empty regions.
pub fn split_chapters(text: &str) -> Vec<String> {
    let mut regions: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut open: Option<OpenEnv<'_>> = None;
    let mut pending_break = false;

    for line in document_body(text) {
        for piece in split_breaks(line) {
            match piece {
                Piece::Break => match &mut open {
                    None => regions.push(std::mem::take(&mut current)),
                    Some(env) if !env.saw_text => {
                        debug!("hoisting page break out of \\begin{{{}}}", env.env);
                        let moved = current.split_off(env.begin_at);
                        regions.push(std::mem::replace(&mut current, moved));
                        env.begin_at = 0;
                    }
                    Some(env) => {
                        debug!("deferring page break until \\end{{{}}}", env.env);
                        pending_break = true;
                    }
                },
                Piece::Line(line) => {
                    let mut closed = false;
                    if let Some(state) = open.as_mut() {
                        match classify(line) {
                            Line::Begin(env) if state.env == env => state.depth += 1,
                            Line::End(env) if state.env == env => {
                                if state.depth == 0 {
                                    closed = true;
                                } else {
                                    state.depth -= 1;
                                }
                            }
                            Line::Text(_) => state.saw_text = true,
                            _ => {}
                        }
                    } else if let Line::Begin(env) = classify(line) {
                        open = Some(OpenEnv {
                            env,
                            depth: 0,
                            begin_at: current.len(),
                            saw_text: false,
                        });
                    }
                    current.push(line);

                    if closed {
                        open = None;
                        if pending_break {
                            regions.push(std::mem::take(&mut current));
                            pending_break = false;
                        }
                    }
                }
            }
        }
    }
    regions.push(current);

    regions.into_iter().map(|lines| lines.join("\n")).collect()
}
