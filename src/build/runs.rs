//! Parse repaired paragraph strings into [`Run`] trees.
//!
//! The input uses the internal tag set produced by the repair stage. The
//! parser is forgiving: unknown tags become text, closing tags without an
//! open partner are ignored, and tags still open at the end are closed.

use crate::model::Run;

#[derive(Debug)]
enum Frame {
    Root,
    Bold,
    Italic,
    Underline,
    Strike,
    Footnote,
    Link(String),
}

impl Frame {
    fn name(&self) -> &'static str {
        match self {
            Frame::Root => "",
            Frame::Bold => "b",
            Frame::Italic => "i",
            Frame::Underline => "u",
            Frame::Strike => "s",
            Frame::Footnote => "footnote",
            Frame::Link(_) => "link",
        }
    }

    fn wrap(self, children: Vec<Run>) -> Run {
        match self {
            Frame::Bold => Run::Bold(children),
            Frame::Italic => Run::Italic(children),
            Frame::Underline => Run::Underline(children),
            Frame::Strike => Run::Strikethrough(children),
            Frame::Footnote => Run::Footnote(children),
            Frame::Link(href) => Run::Hyperlink { href, children },
            // Root is never popped.
            Frame::Root => Run::Text(String::new()),
        }
    }
}

enum Tag {
    Open(Frame),
    Close(String),
    Break,
    Unknown,
}

fn parse_tag(tag: &str) -> Tag {
    let tag = tag.trim();
    if let Some(name) = tag.strip_prefix('/') {
        return Tag::Close(name.trim().to_string());
    }
    match tag {
        "b" => Tag::Open(Frame::Bold),
        "i" => Tag::Open(Frame::Italic),
        "u" => Tag::Open(Frame::Underline),
        "s" => Tag::Open(Frame::Strike),
        "footnote" => Tag::Open(Frame::Footnote),
        "br/" | "br /" | "br" => Tag::Break,
        _ => match link_href(tag) {
            Some(href) => Tag::Open(Frame::Link(href.to_string())),
            None => Tag::Unknown,
        },
    }
}

/// `link href="..."` → the quoted value.
fn link_href(tag: &str) -> Option<&str> {
    let rest = tag.strip_prefix("link")?.trim_start();
    let rest = rest.strip_prefix("href")?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

struct RunStack {
    frames: Vec<(Frame, Vec<Run>)>,
}

impl RunStack {
    fn new() -> Self {
        Self {
            frames: vec![(Frame::Root, Vec::new())],
        }
    }

    fn top(&mut self) -> &mut Vec<Run> {
        // The root frame is never removed.
        let last = self.frames.len() - 1;
        &mut self.frames[last].1
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let top = self.top();
        if let Some(Run::Text(prev)) = top.last_mut() {
            prev.push_str(text);
        } else {
            top.push(Run::Text(text.to_string()));
        }
    }

    fn pop(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some((frame, children)) = self.frames.pop()
            && !children.is_empty()
        {
            self.top().push(frame.wrap(children));
        }
    }

    fn close(&mut self, name: &str) {
        let Some(pos) = self.frames.iter().rposition(|(f, _)| f.name() == name) else {
            return;
        };
        if pos == 0 {
            return;
        }
        while self.frames.len() > pos {
            self.pop();
        }
    }

    fn finish(mut self) -> Vec<Run> {
        while self.frames.len() > 1 {
            self.pop();
        }
        self.frames.pop().map(|(_, runs)| runs).unwrap_or_default()
    }
}

/// Parse one repaired paragraph.
pub fn parse_runs(text: &str) -> Vec<Run> {
    let mut stack = RunStack::new();
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        stack.push_text(&rest[..lt]);
        let after = &rest[lt..];
        let Some(gt) = after.find('>') else {
            stack.push_text(&after.replace('<', "&lt;"));
            return stack.finish();
        };
        rest = &after[gt + 1..];

        match parse_tag(&after[1..gt]) {
            Tag::Open(frame) => stack.frames.push((frame, Vec::new())),
            Tag::Close(name) => stack.close(&name),
            Tag::Break => stack.top().push(Run::LineBreak),
            Tag::Unknown => {
                let raw = &after[..=gt];
                stack.push_text(&raw.replace('<', "&lt;").replace('>', "&gt;"));
            }
        }
    }
    stack.push_text(rest);
    stack.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Run {
        Run::Text(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_runs("Hello &amp; bye"), vec![t("Hello &amp; bye")]);
        assert!(parse_runs("").is_empty());
    }

    #[test]
    fn test_nested_tags() {
        assert_eq!(
            parse_runs("a <b>bold <i>both</i></b> z"),
            vec![
                t("a "),
                Run::Bold(vec![t("bold "), Run::Italic(vec![t("both")])]),
                t(" z"),
            ]
        );
    }

    #[test]
    fn test_links_notes_and_breaks() {
        assert_eq!(
            parse_runs("see <link href=\"http://x.org\">here</link><footnote>n</footnote><br/>end"),
            vec![
                t("see "),
                Run::Hyperlink {
                    href: "http://x.org".into(),
                    children: vec![t("here")],
                },
                Run::Footnote(vec![t("n")]),
                Run::LineBreak,
                t("end"),
            ]
        );
    }

    #[test]
    fn test_forgiving_structure() {
        // stray close is ignored
        assert_eq!(parse_runs("a</i>b"), vec![t("ab")]);
        // unclosed tag closes at the end
        assert_eq!(parse_runs("<u>open"), vec![Run::Underline(vec![t("open")])]);
        // closing an outer tag closes the inner one too
        assert_eq!(
            parse_runs("<b>x<i>y</b>z"),
            vec![Run::Bold(vec![t("x"), Run::Italic(vec![t("y")])]), t("z")]
        );
        // unknown tags are text
        assert_eq!(parse_runs("<q>x"), vec![t("&lt;q&gt;x")]);
        // empty elements vanish
        assert_eq!(parse_runs("<s></s>x"), vec![t("x")]);
    }
}
