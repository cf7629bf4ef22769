//! Special-character substitution table.
//!
//! Rules are tried in order at every position of the input and the first
//! matching rule wins. Longer patterns must therefore come before shorter
//! ones they overlap with (`---` before `--`, `''` before `'`). Replacement
//! text is emitted as-is and never rescanned, so a rule can safely produce
//! `&` without a later rule escaping it again.

/// One substitution: source markup to XHTML-safe replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharRule {
    pub from: String,
    pub to: String,
}

/// Ordered list of [`CharRule`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialCharTable {
    rules: Vec<CharRule>,
}

impl SpecialCharTable {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. It has lower priority than every rule already present.
    pub fn with_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if !from.is_empty() {
            self.rules.push(CharRule {
                from,
                to: to.into(),
            });
        }
        self
    }

    pub fn rules(&self) -> &[CharRule] {
        &self.rules
    }

    /// Table for LaTeX-flavoured converter output.
    ///
    /// Besides typographic entities this escapes the XML-reserved characters,
    /// turns escaped braces into character references so brace stripping
    /// leaves them alone, and passes `\\` through untouched so that a line
    /// break followed by an escape (`\\&`) is not misread.
    pub fn latex() -> Self {
        const RULES: &[(&str, &str)] = &[
            ("\\\\", "\\\\"),
            ("\\&", "&amp;"),
            ("\\%", "%"),
            ("\\$", "$"),
            ("\\#", "#"),
            ("\\_", "_"),
            ("\\{", "&#123;"),
            ("\\}", "&#125;"),
            ("\\ ", " "),
            ("\\,", "&#8201;"),
            ("\\-", ""),
            ("\\textbackslash", "&#92;"),
            ("\\textquotedblleft", "&#8220;"),
            ("\\textquotedblright", "&#8221;"),
            ("\\textquoteleft", "&#8216;"),
            ("\\textquoteright", "&#8217;"),
            ("\\textemdash", "&#8212;"),
            ("\\textendash", "&#8211;"),
            ("\\texttrademark", "&#8482;"),
            ("\\textregistered", "&#174;"),
            ("\\textcopyright", "&#169;"),
            ("\\copyright", "&#169;"),
            ("\\ldots", "&#8230;"),
            ("\\dots", "&#8230;"),
            ("...", "&#8230;"),
            ("---", "&#8212;"),
            ("--", "&#8211;"),
            ("``", "&#8220;"),
            ("''", "&#8221;"),
            ("`", "&#8216;"),
            ("'", "&#8217;"),
            ("~", "&#160;"),
            ("&", "&amp;"),
            ("<", "&lt;"),
            (">", "&gt;"),
            ("\u{2019}", "&#8217;"),
            ("\u{2018}", "&#8216;"),
            ("\u{201D}", "&#8221;"),
            ("\u{201C}", "&#8220;"),
            ("\u{2026}", "&#8230;"),
            ("\u{2014}", "&#8212;"),
            ("\u{2013}", "&#8211;"),
            ("\u{2122}", "&#8482;"),
            ("\u{00A9}", "&#169;"),
            ("\u{00AE}", "&#174;"),
            ("\u{00A0}", "&#160;"),
        ];
        RULES
            .iter()
            .fold(Self::new(), |table, (from, to)| table.with_rule(*from, *to))
    }

    /// Apply the table in a single left-to-right pass.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        let mut rest = text;

        'scan: while let Some(ch) = rest.chars().next() {
            for rule in &self.rules {
                if rest.starts_with(rule.from.as_str()) {
                    out.push_str(&rule.to);
                    rest = &rest[rule.from.len()..];
                    continue 'scan;
                }
            }
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        out
    }
}

impl Default for SpecialCharTable {
    fn default() -> Self {
        Self::latex()
    }
}
