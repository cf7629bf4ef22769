//! Small text, ordering and time helpers shared across stages.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Format a UTC time as `YYYY-MM-DDThh:mm:ssZ`, the form EPUB 3 requires
/// for `dcterms:modified`.
pub fn format_utc_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The current time as a `dcterms:modified` value.
pub fn utc_timestamp_now() -> String {
    format_utc_timestamp(Utc::now())
}

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding
/// 3. Falls back to Windows-1252 (what older word processors emit)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Check the JPEG start-of-image marker.
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF
}

// ============================================================================
// Natural Ordering
// ============================================================================

enum Chunk<'a> {
    Digits(&'a str),
    Text(String),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let digit = c.is_ascii_digit();
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if next.is_ascii_digit() != digit {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        let piece = &s[start..end];
        out.push(if digit {
            Chunk::Digits(piece)
        } else {
            Chunk::Text(piece.to_lowercase())
        });
        start = end;
    }
    out
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Numeric-aware, case-insensitive ordering: `ch2` sorts before `CH10`.
///
/// Names that compare equal this way fall back to a plain byte comparison
/// so the order stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (left, right) = (chunks(a), chunks(b));
    for (x, y) in left.iter().zip(&right) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8_with_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFHello", None), "Hello");
    }

    #[test]
    fn test_decode_text_falls_back_to_windows_1252() {
        // 0x93/0x94 are curly double quotes in Windows-1252
        assert_eq!(decode_text(b"\x93Hi\x94", None), "\u{201C}Hi\u{201D}");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Tom & \"Jerry\" <3"), "Tom &amp; &quot;Jerry&quot; &lt;3");
    }

    #[test]
    fn test_format_utc_timestamp() {
        let leap = DateTime::from_timestamp(951_782_400, 0).unwrap();
        assert_eq!(format_utc_timestamp(leap), "2000-02-29T00:00:00Z");
        let time = DateTime::from_timestamp(1_619_740_800 + 3_661, 0).unwrap();
        assert_eq!(format_utc_timestamp(time), "2021-04-30T01:01:01Z");
    }

    #[test]
    fn test_utc_timestamp_now_shape() {
        let now = utc_timestamp_now();
        assert_eq!(now.len(), 20);
        assert!(now.ends_with('Z'));
        assert_eq!(&now[10..11], "T");
    }

    #[test]
    fn test_natural_cmp() {
        let mut names = vec!["ch10.txt", "Ch2.txt", "ch1.txt", "appendix.txt", "ch02b.txt"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["appendix.txt", "ch1.txt", "Ch2.txt", "ch02b.txt", "ch10.txt"]
        );
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(b"\x89PNG"));
    }
}
