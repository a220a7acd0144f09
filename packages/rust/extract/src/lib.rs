//! Structured extraction from free-form model output.
//!
//! Model output is never guaranteed to follow the requested format, so every
//! parser here is total: it returns whatever it could recover together with a
//! list of [`Diagnostic`]s describing what was skipped or repaired. Nothing in
//! this crate returns an error.
//!
//! - [`parse_concept_table`] — markdown table → [`Concept`](coursebuilder_shared::Concept) records
//! - [`parse_chapter_outlines`] — `Chapter N:` blocks → one outline per chapter
//! - [`parse_course_description`], [`parse_numbered_items`], [`strip_code_fence`] — small helpers

mod concepts;
mod course;
mod lists;
mod outline;

pub use concepts::{concept_ids_by_chapter, parse_concept_table, validate_concepts};
pub use course::parse_course_description;
pub use lists::{NumberedItem, parse_numbered_items, strip_code_fence};
pub use outline::parse_chapter_outlines;

/// A note about input that was skipped or repaired during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number (concept table) or block number (outlines).
    /// [`Diagnostic::UNLOCATED`] when no input line or block is involved,
    /// as for a synthesized chapter.
    pub location: usize,
    pub reason: String,
}

impl Diagnostic {
    pub const UNLOCATED: usize = 0;

    pub(crate) fn new(location: usize, reason: impl Into<String>) -> Self {
        Self {
            location,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}: {}", self.location, self.reason)
    }
}

/// Parse the leading run of ASCII digits of a trimmed string.
///
/// `"12 (Intro)"` → `Some(12)`, `"abc"` → `None`, `"#5"` → `None`.
pub(crate) fn leading_int(s: &str) -> Option<u32> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// A parsed value plus the diagnostics collected while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Extraction<T> {
    /// Discard diagnostics and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_int_takes_digit_prefix() {
        assert_eq!(leading_int("42"), Some(42));
        assert_eq!(leading_int("  7 (Intro)"), Some(7));
        assert_eq!(leading_int("12abc"), Some(12));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int("#5"), None);
        assert_eq!(leading_int(""), None);
    }
}
