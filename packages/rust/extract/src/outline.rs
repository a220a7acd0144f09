//! Chapter-outline block parser.
//!
//! Expected input is one block per chapter, blocks separated by a line of
//! three or more dashes:
//!
//! ```text
//! Chapter 1: Getting Started
//! Summary: What the chapter covers,
//! possibly over several lines.
//! Concept IDs: 1, 2, 3
//! ---
//! Chapter 2: ...
//! ```
//!
//! The result always holds exactly one outline per chapter `1..=total`;
//! chapters the model skipped are synthesized from the fallbacks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use coursebuilder_shared::ChapterOutline;

use crate::{Diagnostic, Extraction, leading_int};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// A line of three or more dashes.
static DELIMITER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*$").expect("delimiter regex"));

/// `Chapter 3: Title`, optionally as a markdown heading and/or bold.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:#+[ \t]*)?(?:\*\*)?chapter[ \t]+(\d+)[ \t]*[:.\-–][ \t]*(.*)$")
        .expect("chapter heading regex")
});

/// `Label: value`, tolerating list bullets and bold around the label.
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:[-*][ \t]+)?(?:\*\*)?([A-Za-z][A-Za-z ]{0,40}?)(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.*)$")
        .expect("label regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Summary,
    ConceptIds,
    Other,
}

impl Field {
    fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "summary" => Self::Summary,
            "concept ids" | "concepts ids" | "concept id" | "concepts" => Self::ConceptIds,
            _ => Self::Other,
        }
    }
}

/// A chapter block as found in the text, before fallbacks are applied.
struct RawChapter {
    number: u32,
    title: String,
    summary: String,
    concept_ids: Vec<u32>,
}

/// Parse chapter outlines and fill every gap up to `total`.
///
/// - `fallback_titles[n - 1]` titles a synthesized chapter `n`.
/// - `fallback_concepts[&n]` supplies concept ids for synthesized chapters
///   and whenever chapter `n`'s `Concept IDs:` field yields no ids: absent,
///   blank, or holding only non-numeric tokens such as `Concept IDs: tbd`.
///
/// A repeated chapter number keeps the first block. Chapter numbers outside
/// `1..=total` are dropped.
pub fn parse_chapter_outlines(
    text: &str,
    total: u32,
    fallback_titles: &[String],
    fallback_concepts: &BTreeMap<u32, Vec<String>>,
) -> Extraction<Vec<ChapterOutline>> {
    let mut diagnostics = Vec::new();
    let mut outlines: Vec<ChapterOutline> = Vec::new();
    let mut produced: BTreeSet<u32> = BTreeSet::new();

    for (idx, block) in DELIMITER_RE.split(text).enumerate() {
        let block_no = idx + 1;
        if block.trim().is_empty() {
            continue;
        }

        let chapters = parse_block(block);
        if chapters.is_empty() {
            diagnostics.push(Diagnostic::new(block_no, "block has no `Chapter N:` heading"));
            continue;
        }

        for raw in chapters {
            if raw.number == 0 || raw.number > total {
                diagnostics.push(Diagnostic::new(
                    block_no,
                    format!("chapter {} is outside 1..={total}", raw.number),
                ));
                continue;
            }
            if !produced.insert(raw.number) {
                diagnostics.push(Diagnostic::new(
                    block_no,
                    format!("duplicate chapter {}, keeping the first block", raw.number),
                ));
                continue;
            }

            let concept_ids = if raw.concept_ids.is_empty() {
                fallback_ids(fallback_concepts, raw.number)
            } else {
                raw.concept_ids
            };
            let title = if raw.title.is_empty() {
                fallback_title(fallback_titles, raw.number)
            } else {
                raw.title
            };

            outlines.push(ChapterOutline {
                number: raw.number,
                title,
                summary: raw.summary,
                concept_ids,
            });
        }
    }

    for number in 1..=total {
        if produced.contains(&number) {
            continue;
        }
        let title = fallback_title(fallback_titles, number);
        diagnostics.push(Diagnostic::new(
            Diagnostic::UNLOCATED,
            format!("chapter {number} missing from output, synthesized"),
        ));
        outlines.push(ChapterOutline {
            number,
            summary: format!("This chapter covers {title}."),
            title,
            concept_ids: fallback_ids(fallback_concepts, number),
        });
    }

    outlines.sort_by_key(|o| o.number);

    Extraction {
        value: outlines,
        diagnostics,
    }
}

/// Parse one delimiter-separated block. A block normally holds a single
/// chapter, but a model that forgets the delimiters produces several
/// headings in one block; each heading starts its own chapter.
fn parse_block(block: &str) -> Vec<RawChapter> {
    let mut chapters: Vec<RawChapter> = Vec::new();
    let mut field = Field::Other;
    let mut summary_parts: Vec<String> = Vec::new();

    let finish = |chapters: &mut Vec<RawChapter>, parts: &mut Vec<String>| {
        if let Some(last) = chapters.last_mut() {
            last.summary = collapse_whitespace(&parts.join(" "));
        }
        parts.clear();
    };

    for line in block.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            finish(&mut chapters, &mut summary_parts);
            let number = caps[1].parse::<u32>().unwrap_or(0);
            chapters.push(RawChapter {
                number,
                title: clean_title(&caps[2]),
                summary: String::new(),
                concept_ids: Vec::new(),
            });
            field = Field::Other;
            continue;
        }

        // Lines before the first heading are preamble.
        let Some(current) = chapters.last_mut() else {
            continue;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = LABEL_RE.captures(line) {
            field = Field::from_label(&caps[1]);
            let value = caps[2].trim();
            match field {
                Field::Summary => {
                    if !value.is_empty() {
                        summary_parts.push(value.to_string());
                    }
                }
                Field::ConceptIds => current.concept_ids = parse_ids(value),
                Field::Other => {}
            }
            continue;
        }

        if trimmed.starts_with('#') {
            field = Field::Other;
            continue;
        }

        if field == Field::Summary {
            summary_parts.push(trimmed.to_string());
        }
    }

    finish(&mut chapters, &mut summary_parts);
    chapters
}

/// Comma-separated ids; each piece contributes its leading integer.
fn parse_ids(value: &str) -> Vec<u32> {
    value
        .split(',')
        .filter_map(leading_int)
        .filter(|id| *id > 0)
        .collect()
}

fn fallback_ids(fallback: &BTreeMap<u32, Vec<String>>, number: u32) -> Vec<u32> {
    fallback
        .get(&number)
        .map(|ids| {
            ids.iter()
                .filter_map(|s| leading_int(s))
                .filter(|id| *id > 0)
                .collect()
        })
        .unwrap_or_default()
}

fn fallback_title(titles: &[String], number: u32) -> String {
    titles
        .get(number as usize - 1)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Chapter {number}"))
}

fn clean_title(raw: &str) -> String {
    raw.trim().trim_matches('*').trim().to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
