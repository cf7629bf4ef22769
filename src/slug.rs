//! Unique, filesystem-safe identifiers for parts and chapters.

use std::collections::HashMap;

use crate::repair::patterns::ENTITY_RE;

/// Longest base kept from a heading, before the `_N` suffix.
pub const MAX_SLUG_BASE: usize = 15;

const FALLBACK_BASE: &str = "untitled";

/// Hands out slugs of the form `{base}_{N}`.
///
/// `N` counts how many times the same truncated base has been seen, so the
/// result depends on the order in which headings are allocated. One
/// allocator belongs to one conversion; share it between parts and chapters
/// so their slugs never collide.
#[derive(Debug, Clone, Default)]
pub struct SlugAllocator {
    counts: HashMap<String, u32>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `heading`, unique among everything this allocator returned.
    pub fn allocate(&mut self, heading: &str) -> String {
        let base = slug_base(heading);
        let count = self.counts.entry(base.clone()).or_insert(0);
        *count += 1;
        format!("{base}_{count}")
    }
}

/// ASCII alphanumerics of `heading` with entity references removed,
/// truncated to [`MAX_SLUG_BASE`].
pub fn slug_base(heading: &str) -> String {
    let without_entities = ENTITY_RE.replace_all(heading, "");
    let base: String = without_entities
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_SLUG_BASE)
        .collect();
    if base.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        base
    }
}
