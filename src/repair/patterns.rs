//! Cached regex patterns for markup repair.
//!
//! Uses LazyLock to compile patterns once on first use. Patterns that take an
//! argument use `[^{}]*` so they only ever match the innermost group; callers
//! apply them repeatedly to unwrap nested commands from the inside out.

use regex_lite::Regex;
use std::sync::LazyLock;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

// === Line classification ===

/// `\begin{flushleft}`, `\begin{spacing}{1.5}`, ... on a line of their own.
pub static PARA_BEGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^\s*\\begin\{(flushleft|flushright|center|spacing)\}(?:\{[^{}]*\})?\s*$")
});

/// The closing counterpart of [`PARA_BEGIN_RE`].
pub static PARA_END_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"^\s*\\end\{(flushleft|flushright|center|spacing)\}\s*$"));

/// A line made only of control words with optional arguments.
pub static DIRECTIVE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^\s*(?:\\[A-Za-z]+\*?(?:\[[^\]]*\])?(?:\{[^{}]*\})*\s*)+$")
});

/// A single control word; used to look inside directive lines.
pub static CONTROL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\([A-Za-z]+)"));

/// Page-break directives that separate chapters in a single-file manuscript.
pub static PAGE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\\(?:newpage|clearpage|cleardoublepage|pagebreak)(?:\[[^\]]*\])?")
});

pub static DOCUMENT_BEGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"^\s*\\begin\{document\}"));

pub static DOCUMENT_END_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^\s*\\end\{document\}"));

// === Font size and color directives ===

pub static FONT_DIRECTIVE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"\\fontsize\{[^{}]*\}\{[^{}]*\}(?:\\selectfont)?"),
        re(r"\\usefont\{[^{}]*\}\{[^{}]*\}\{[^{}]*\}\{[^{}]*\}"),
        re(r"\\(?:fontfamily|fontseries|fontshape|color|pagecolor)\{[^{}]*\}"),
        // Leaves the text argument as a bare group for brace stripping.
        re(r"\\(?:textcolor|colorbox)\{[^{}]*\}"),
        re(r"\\(?:tiny|scriptsize|footnotesize|small|normalsize|large|Large|LARGE|huge|Huge|selectfont)\b ?"),
    ]
});

// === Inline styles ===

pub static BOLD_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\{\\(?:bf|bfseries)\b\s*([^{}]*)\}"));

pub static ITALIC_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\{\\(?:it|itshape|em|sl|slshape)\b\s*([^{}]*)\}"));

/// Font family/shape switches that carry no formatting we keep.
pub static PLAIN_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\{\\(?:tt|ttfamily|sc|scshape|rm|rmfamily|sf|sffamily|normalfont|upshape|mdseries)\b\s*([^{}]*)\}")
});

pub static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\textbf\{([^{}]*)\}"));

pub static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\(?:textit|emph|textsl)\{([^{}]*)\}"));

pub static UNDERLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\(?:underline|uline|uwave)\{([^{}]*)\}"));

pub static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\(?:sout|xout|st)\{([^{}]*)\}"));

/// Monospace and other shape commands: keep the text, drop the command.
pub static UNWRAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\\(?:texttt|textsc|textrm|textsf|textup|textmd|textnormal|mbox|hbox)\{([^{}]*)\}")
});

pub static SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\(?:hspace|vspace|hskip|vskip)\*?\{[^{}]*\}"));

pub static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\footnote\{([^{}]*)\}"));

pub static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\(?:marginpar|todo|comment|annotation)\{([^{}]*)\}"));

pub static HREF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\href\{([^{}]*)\}\{([^{}]*)\}"));

pub static URL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\\url\{([^{}]*)\}"));

/// Scrivener's link to an inline annotation or footnote: `(id, link text)`.
pub static NOTE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\href\{\s*scrivcmt://([^{}\s]*)\s*\}\{([^{}]*)\}"));

pub static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\\\(?:\[[^\]]*\])?|\\(?:newline|linebreak)\b"));

// === Broken nesting ===

pub static EMPTY_FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"<footnote>\s*</footnote>"));

pub static EMPTY_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"<comment>\s*</comment>"));

pub static FOOTNOTE_SEAM_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"</footnote>\s*<footnote>"));

pub static COMMENT_SEAM_RE: LazyLock<Regex> = LazyLock::new(|| re(r"</comment>\s*<comment>"));

pub static COMMENT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?s)<comment>.*?</comment>"));

// === Residual directives ===

/// Directives whose argument is never reader-visible text. Environment
/// markers sharing a line with text are dropped with their parameters.
pub static DROP_ARG_DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\\begin\{(?:spacing|minipage|tabular\*?|multicols)\}(?:\[[^\]]*\])*\{[^{}]*\}|\\(?:begin|end)\{[^{}]*\}|\\(?:label|ref|pageref|index|hypertarget|includegraphics|input|include|cite|bibliography|setlength|addtolength|setcounter|thispagestyle|pagestyle)\*?(?:\[[^\]]*\])?\{[^{}]*\}")
});

/// Any other directive with an argument: keep the argument.
pub static ARG_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\[A-Za-z]+\*?(?:\[[^\]]*\])?\{([^{}]*)\}"));

pub static BARE_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\\[A-Za-z]+\*?(?:\[[^\]]*\])?|\\[^A-Za-z\s]"));

// === Cleanup ===

pub static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+"));

pub static BREAK_SPACING_RE: LazyLock<Regex> = LazyLock::new(|| re(r" ?<br/> ?"));

pub static TAG_RE: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]*>"));

pub static FOOTNOTE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?s)<footnote>.*?</footnote>"));

pub static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"&#?[A-Za-z0-9]+;"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_para_markers() {
        assert!(PARA_BEGIN_RE.is_match(r"\begin{flushleft}"));
        assert!(PARA_BEGIN_RE.is_match(r"  \begin{spacing}{1.5}"));
        assert!(!PARA_BEGIN_RE.is_match(r"\begin{document}"));
        assert!(!PARA_BEGIN_RE.is_match(r"\begin{center} Title"));
        let caps = PARA_END_RE.captures(r"\end{center}").unwrap();
        assert_eq!(&caps[1], "center");
    }

    #[test]
    fn test_directive_line() {
        assert!(DIRECTIVE_LINE_RE.is_match(r"\noindent"));
        assert!(DIRECTIVE_LINE_RE.is_match(r"\documentclass[12pt]{article}"));
        assert!(DIRECTIVE_LINE_RE.is_match(r"\setlength{\parindent}{0pt}"));
        assert!(DIRECTIVE_LINE_RE.is_match(r"\par \noindent"));
        assert!(!DIRECTIVE_LINE_RE.is_match(r"Hello \noindent"));
    }

    #[test]
    fn test_drop_arg_directives() {
        let strip = |s: &str| DROP_ARG_DIRECTIVE_RE.replace_all(s, "").into_owned();
        assert_eq!(strip(r"\begin{center}Title\end{center}"), "Title");
        assert_eq!(strip(r"\begin{spacing}{1.5}Text"), "Text");
        assert_eq!(strip(r"See\label{sec:a} here"), "See here");
    }

    #[test]
    fn test_page_break() {
        assert!(PAGE_BREAK_RE.is_match(r"\newpage"));
        assert!(PAGE_BREAK_RE.is_match(r"text \clearpage"));
        assert!(PAGE_BREAK_RE.is_match(r"\pagebreak[4]"));
    }
}
