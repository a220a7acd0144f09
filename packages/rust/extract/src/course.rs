//! Course description parser.

use std::sync::LazyLock;

use regex::Regex;

use coursebuilder_shared::CourseDescription;

use crate::lists::parse_numbered_items;

/// Matches `# Title` at the start of a line.
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("H1 regex"));

/// Matches any markdown heading, capturing its text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("heading regex"));

/// Pull the title and the main-topics list out of a generated course description.
///
/// The title is the first H1 (falling back to `topic`). Topics are the list
/// items under the first heading whose text mentions "topic"; they run until
/// the next heading.
pub fn parse_course_description(text: &str, topic: &str) -> CourseDescription {
    let mut title: Option<String> = None;
    let mut in_topics = false;
    let mut topic_section = String::new();
    let mut seen_topics = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if title.is_none() {
            if let Some(caps) = H1_RE.captures(trimmed) {
                title = Some(caps[1].trim().trim_matches('*').trim().to_string());
                continue;
            }
        }

        if let Some(caps) = HEADING_RE.captures(trimmed) {
            if in_topics {
                in_topics = false;
                seen_topics = true;
            } else if !seen_topics && caps[1].to_lowercase().contains("topic") {
                in_topics = true;
            }
            continue;
        }

        if in_topics {
            topic_section.push_str(trimmed);
            topic_section.push('\n');
        }
    }

    let topics = parse_numbered_items(&topic_section)
        .into_iter()
        .map(|item| item.title)
        .filter(|t| !t.is_empty())
        .collect();

    CourseDescription {
        title: title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| topic.trim().to_string()),
        body: text.trim().to_string(),
        topics,
    }
}
