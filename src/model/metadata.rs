use std::path::PathBuf;

use crate::error::{Error, Result};

/// Book-level metadata used to fill the package templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Metadata {
    pub title: String,
    pub author: String,
    /// Falls back to the author when absent.
    pub publisher: Option<String>,
    /// BCP 47 tag, e.g. `en-US`.
    pub language: String,
    /// `YYYY-MM-DD`
    pub pub_date: String,
    pub copyright_year: String,
    pub include_copyright: bool,
    /// Adds the work-of-fiction disclaimer to the copyright page.
    pub fiction: bool,
    /// JPEG copied to `OEBPS/Cover.jpg`.
    pub cover: Option<PathBuf>,
}

impl Metadata {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            language: "en-US".to_string(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_pub_date(mut self, date: impl Into<String>) -> Self {
        self.pub_date = date.into();
        self
    }

    pub fn with_copyright(mut self, year: impl Into<String>, include_page: bool) -> Self {
        self.copyright_year = year.into();
        self.include_copyright = include_page;
        self
    }

    pub fn with_fiction(mut self, fiction: bool) -> Self {
        self.fiction = fiction;
        self
    }

    pub fn with_cover(mut self, cover: impl Into<PathBuf>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn publisher(&self) -> &str {
        match self.publisher.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => &self.author,
        }
    }

    /// Reject blank required fields and malformed publication dates.
    pub fn validate(&self) -> Result<()> {
        let required = [
            (&self.language, "Book language is blank. (Example: \"en-US\")"),
            (&self.author, "Book author is blank."),
            (&self.title, "Book title is blank."),
            (&self.pub_date, "Publication date is blank. (Format: YYYY-MM-DD)"),
            (&self.copyright_year, "Copyright year is blank."),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(Error::Metadata(message.to_string()));
            }
        }

        if !is_valid_pub_date(&self.pub_date) {
            return Err(Error::Metadata(format!(
                "Invalid publication date '{}'. Must be YYYY-MM-DD.",
                self.pub_date
            )));
        }
        Ok(())
    }
}

/// Loose date check: four-digit year, month 1-12, day 1-31.
fn is_valid_pub_date(date: &str) -> bool {
    let parts: Vec<&str> = date.trim().split('-').collect();
    let &[year, month, day] = parts.as_slice() else {
        return false;
    };
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(year, 4) || !digits(month, 2) || !digits(day, 2) {
        return false;
    }
    let month: u32 = month.parse().unwrap_or(0);
    let day: u32 = day.parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Metadata {
        Metadata::new("A Book", "Jane Doe")
            .with_pub_date("2021-04-30")
            .with_copyright("2021", true)
    }

    #[test]
    fn test_validate_accepts_complete_metadata() {
        valid().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut meta = valid();
        meta.title = "  ".into();
        assert!(matches!(meta.validate(), Err(Error::Metadata(_))));

        let mut meta = valid();
        meta.copyright_year.clear();
        assert!(matches!(meta.validate(), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_pub_date_check() {
        assert!(is_valid_pub_date("2021-12-31"));
        assert!(!is_valid_pub_date("2021-13-01"));
        assert!(!is_valid_pub_date("2021-00-10"));
        assert!(!is_valid_pub_date("2021-01-32"));
        assert!(!is_valid_pub_date("21-01-01"));
        assert!(!is_valid_pub_date("yesterday"));
    }

    #[test]
    fn test_publisher_falls_back_to_author() {
        assert_eq!(valid().publisher(), "Jane Doe");
        assert_eq!(valid().with_publisher("Small Press").publisher(), "Small Press");
    }
}
