//! Learning-graph table parser.
//!
//! Expected input is a markdown table with six columns:
//! `| ID | Concept | Chapter | Dependencies | Taxonomy | Level |`
//! surrounded by arbitrary prose. Any line containing `|` is a candidate row;
//! a row counts only if its first cell is an integer, which filters out
//! header and divider rows.

use std::collections::{BTreeMap, HashSet};

use coursebuilder_shared::{BloomLevel, Concept, Taxonomy};

use crate::{Diagnostic, Extraction, leading_int};

/// Parse a concept table out of model output.
///
/// Rows are returned in textual order. Prerequisites that are not strictly
/// below the row's own id are dropped; a repeated id keeps the first row.
pub fn parse_concept_table(text: &str) -> Extraction<Vec<Concept>> {
    let mut concepts: Vec<Concept> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<u32> = HashSet::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if !line.contains('|') {
            continue;
        }

        let cells = split_cells(line);
        let Some(first) = cells.first() else {
            continue;
        };

        let Ok(id) = first.parse::<u32>() else {
            diagnostics.push(Diagnostic::new(
                line_no,
                format!("not a data row (first cell {first:?})"),
            ));
            continue;
        };

        if !seen.insert(id) {
            diagnostics.push(Diagnostic::new(
                line_no,
                format!("duplicate concept id {id}, keeping the first row"),
            ));
            continue;
        }

        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");

        let chapter = match cell(2).parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => 1,
        };

        let mut dependencies = Vec::new();
        for piece in cell(3).split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match leading_int(piece) {
                Some(dep) if dep > 0 && dep < id => {
                    if !dependencies.contains(&dep) {
                        dependencies.push(dep);
                    }
                }
                Some(dep) => diagnostics.push(Diagnostic::new(
                    line_no,
                    format!("concept {id}: dropped dependency {dep} (must be below {id})"),
                )),
                None => diagnostics.push(Diagnostic::new(
                    line_no,
                    format!("concept {id}: dropped non-numeric dependency {piece:?}"),
                )),
            }
        }

        concepts.push(Concept {
            id,
            name: cell(1).to_string(),
            chapter,
            dependencies,
            taxonomy: Taxonomy::normalize(cell(4)),
            level: BloomLevel::normalize(cell(5)),
        });
    }

    Extraction {
        value: concepts,
        diagnostics,
    }
}

/// Split a table row into trimmed cells, dropping every empty cell.
///
/// A blank column shifts the cells after it left; rows should mark an empty
/// dependency list with `,`.
fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sanity checks on an extracted graph. Returns human-readable warnings;
/// nothing here is fatal.
pub fn validate_concepts(concepts: &[Concept], requested: u32, chapters: u32) -> Vec<String> {
    let mut warnings = Vec::new();

    if concepts.len() != requested as usize {
        warnings.push(format!(
            "requested {requested} concepts, extracted {}",
            concepts.len()
        ));
    }

    for concept in concepts {
        if concept.chapter > chapters {
            warnings.push(format!(
                "concept {} ({}) assigned to chapter {} of {chapters}",
                concept.id, concept.name, concept.chapter
            ));
        }
    }

    warnings
}

/// Group concept ids by owning chapter, as the string candidates the
/// outline parser falls back to.
pub fn concept_ids_by_chapter(concepts: &[Concept]) -> BTreeMap<u32, Vec<String>> {
    let mut map: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for concept in concepts {
        map.entry(concept.chapter)
            .or_default()
            .push(concept.id.to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Here is the learning graph you asked for:

| ID | Concept | Chapter | Dependencies | Taxonomy | Level |
|----|---------|---------|--------------|----------|-------|
| 1 | Alpha | 1 | , | Foundation | Remember |
| 2 | Beta | 1 | 1 | Core | Apply |
| 3 | Gamma | 2 | 1, 2 | Advanced | Analyze |
| 4 | Delta | 2 | 2,3 | advanced topic | Synthesize |

Let me know if you need more.
";

    #[test]
    fn parses_rows_in_order() {
        let result = parse_concept_table(TABLE);
        let concepts = &result.value;

        assert_eq!(concepts.len(), 4);
        assert_eq!(
            concepts.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(concepts[0].name, "Alpha");
        assert!(concepts[0].dependencies.is_empty());
        assert_eq!(concepts[0].taxonomy, Taxonomy::Foundation);
        assert_eq!(concepts[0].level, BloomLevel::Remember);

        assert_eq!(concepts[1].dependencies, vec![1]);
        assert_eq!(concepts[1].level, BloomLevel::Apply);

        assert_eq!(concepts[2].chapter, 2);
        assert_eq!(concepts[2].dependencies, vec![1, 2]);
        assert_eq!(concepts[2].level, BloomLevel::Analyze);

        assert_eq!(concepts[3].taxonomy, Taxonomy::Advanced);
        assert_eq!(concepts[3].level, BloomLevel::Other("Synthesize".into()));
    }

    #[test]
    fn minimal_pipe_rows() {
        let text = "1|Alpha|1|,|Foundation|Remember\n2|Beta|1|1|Core|Apply\n";
        let concepts = parse_concept_table(text).into_value();
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[1].dependencies, vec![1]);
    }

    #[test]
    fn header_and_divider_rows_are_skipped() {
        let text = "ID|Concept|Chapter|Deps|Taxonomy|Level\n---|---|---|---|---|---\n";
        let result = parse_concept_table(text);
        assert!(result.value.is_empty());
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].location, 1);
        assert!(result.diagnostics[0].reason.contains("not a data row"));
    }

    #[test]
    fn self_and_forward_dependencies_are_dropped() {
        let text = "| 5 | Epsilon | 3 | 5, 99, 2, x | Core | Apply |";
        let result = parse_concept_table(text);
        assert_eq!(result.value[0].dependencies, vec![2]);
        // 5 (self), 99 (forward) and "x" each leave a note
        assert_eq!(result.diagnostics.len(), 3);
    }

    #[test]
    fn missing_cells_fall_back_to_defaults() {
        let result = parse_concept_table("| 7 | Lonely |");
        let concept = &result.value[0];
        assert_eq!(concept.chapter, 1);
        assert!(concept.dependencies.is_empty());
        assert_eq!(concept.taxonomy, Taxonomy::Core);
        assert_eq!(concept.level, BloomLevel::Other(String::new()));

        let bad_chapter = parse_concept_table("| 8 | Odd | two | , | Core | Apply |").into_value();
        assert_eq!(bad_chapter[0].chapter, 1);
        assert_eq!(bad_chapter[0].level, BloomLevel::Apply);
    }

    #[test]
    fn blank_cells_are_dropped_and_shift_columns() {
        let result = parse_concept_table("| 3 | X | 2 | | Core | Apply |");
        let concept = &result.value[0];
        assert_eq!(concept.chapter, 2);
        // "Core" lands in the dependency column, "Apply" in taxonomy
        assert!(concept.dependencies.is_empty());
        assert_eq!(concept.taxonomy, Taxonomy::Core);
        assert_eq!(concept.level, BloomLevel::Other(String::new()));
        assert!(result.diagnostics[0].reason.contains("\"Core\""));
    }

    #[test]
    fn level_variants_stay_verbatim() {
        let text = "| 1 | A | 1 | , | Core | Analyzing |\n| 2 | B | 1 | 1 | Core | evaluate skills |";
        let concepts = parse_concept_table(text).into_value();
        assert_eq!(concepts[0].level, BloomLevel::Other("Analyzing".into()));
        assert_eq!(concepts[1].level, BloomLevel::Evaluate);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let text = "| 1 | First | 1 | , | Core | Apply |\n| 1 | Second | 2 | , | Core | Apply |";
        let result = parse_concept_table(text);
        assert_eq!(result.value.len(), 1);
        assert_eq!(result.value[0].name, "First");
        assert!(result.diagnostics[0].reason.contains("duplicate"));
    }

    #[test]
    fn no_table_yields_empty() {
        let result = parse_concept_table("I could not produce a table, sorry.");
        assert!(result.value.is_empty());
        assert!(result.is_clean());
    }

    #[test]
    fn extraction_is_deterministic() {
        assert_eq!(parse_concept_table(TABLE), parse_concept_table(TABLE));
    }

    #[test]
    fn validate_reports_count_and_range() {
        let concepts = parse_concept_table(TABLE).into_value();
        assert!(validate_concepts(&concepts, 4, 2).is_empty());

        let warnings = validate_concepts(&concepts, 10, 1);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("requested 10"));
    }

    #[test]
    fn ids_grouped_by_chapter() {
        let concepts = parse_concept_table(TABLE).into_value();
        let map = concept_ids_by_chapter(&concepts);
        assert_eq!(map[&1], vec!["1".to_string(), "2".to_string()]);
        assert_eq!(map[&2], vec!["3".to_string(), "4".to_string()]);
    }
}
