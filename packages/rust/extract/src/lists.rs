//! List and code-fence helpers for model output.

use std::sync::LazyLock;

use regex::Regex;

/// `1. item`, `1) item`, `- item`, `* item`, `+ item`.
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:\d+[.)]|[-*+])[ \t]+(.+)$").expect("list item regex")
});

/// First separator between an item's title and its detail.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?::\s+|:$|\s+[-–—]\s+)").expect("separator regex"));

/// A closed fenced code block; captures the body.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```").expect("fence regex")
});

/// An opening fence with no closing fence (truncated output).
static OPEN_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*)$").expect("open fence regex")
});

/// One entry of a numbered or bulleted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedItem {
    pub title: String,
    pub detail: String,
}

/// Collect list items, splitting each into title and detail on the first
/// `:` or ` - `. Non-list lines are ignored.
pub fn parse_numbered_items(text: &str) -> Vec<NumberedItem> {
    text.lines()
        .filter_map(|line| ITEM_RE.captures(line))
        .map(|caps| {
            let content = caps[1].trim();
            match SEPARATOR_RE.find(content) {
                Some(m) => NumberedItem {
                    title: clean(&content[..m.start()]),
                    detail: clean(&content[m.end()..]),
                },
                None => NumberedItem {
                    title: clean(content),
                    detail: String::new(),
                },
            }
        })
        .filter(|item| !item.title.is_empty())
        .collect()
}

/// Return the body of the first fenced code block, or the trimmed text if
/// there is none. An unterminated fence yields everything after it.
pub fn strip_code_fence(text: &str) -> String {
    if let Some(caps) = FENCE_RE.captures(text) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = OPEN_FENCE_RE.captures(text) {
        return caps[1].trim().to_string();
    }
    text.trim().to_string()
}

fn clean(s: &str) -> String {
    s.trim().trim_matches('*').trim().to_string()
}
