use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::{info, instrument};

use coursebuilder_shared::{CourseBuilderError, Result, Taxonomy};
use coursebuilder_site::layout::{FAQ, GLOSSARY, METRICS};

use super::{Stage, StageContext, StageId};
use crate::context::StageOutput;

/// Counts for one markdown document. Fenced code is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownStats {
    pub words: usize,
    /// Headings below H1.
    pub sections: usize,
    /// Headings that end in `?`.
    pub questions: usize,
}

impl std::ops::AddAssign for MarkdownStats {
    fn add_assign(&mut self, rhs: Self) {
        self.words += rhs.words;
        self.sections += rhs.sections;
        self.questions += rhs.questions;
    }
}

pub fn markdown_stats(text: &str) -> MarkdownStats {
    let mut stats = MarkdownStats::default();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let hashes = trimmed.chars().take_while(|&c| c == '#').count();
        let is_heading = hashes > 0 && trimmed[hashes..].starts_with(' ');
        let content = if is_heading { &trimmed[hashes..] } else { trimmed };

        if is_heading && hashes >= 2 {
            stats.sections += 1;
            if content.trim_end().ends_with('?') {
                stats.questions += 1;
            }
        }
        stats.words += content.split_whitespace().count();
    }

    stats
}

/// Stage 11: count what the earlier stages wrote. No generation calls.
pub struct MetricsStage;

#[async_trait]
impl Stage for MetricsStage {
    fn id(&self) -> StageId {
        StageId::Metrics
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let ctx = cx.context();
        let concepts = ctx.require_concepts()?;
        let outlines = ctx.require_outlines()?;
        let simulations = ctx.simulations().map_or(0, <[_]>::len);

        let mut per_file: BTreeMap<String, MarkdownStats> = BTreeMap::new();
        for artifact in ctx.artifacts() {
            if !artifact.path.ends_with(".md") {
                continue;
            }
            let path = cx.layout().resolve(&artifact.path);
            let text =
                std::fs::read_to_string(&path).map_err(|e| CourseBuilderError::io(&path, e))?;
            per_file.insert(artifact.path.clone(), markdown_stats(&text));
        }

        let mut total = MarkdownStats::default();
        for stats in per_file.values() {
            total += *stats;
        }
        let glossary_terms = per_file.get(GLOSSARY).map_or(0, |s| s.sections);
        let faq_questions = per_file.get(FAQ).map_or(0, |s| s.questions);

        let mut out = String::from("# Learning Graph Metrics\n\n## Overview\n\n");
        out.push_str("| Metric | Value |\n|---|---:|\n");
        let mut row = |label: &str, value: usize| {
            let _ = writeln!(out, "| {label} | {value} |");
        };
        row("Concepts", concepts.len());
        row("Chapters", outlines.len());
        row("Simulations", simulations);
        row("Glossary terms", glossary_terms);
        row("FAQ questions", faq_questions);
        row("Markdown files", per_file.len());
        row("Total words", total.words);
        row("Sections", total.sections);

        out.push_str("\n## Concepts by Taxonomy\n\n| Taxonomy | Concepts |\n|---|---:|\n");
        for taxonomy in [Taxonomy::Foundation, Taxonomy::Core, Taxonomy::Advanced] {
            let n = concepts.iter().filter(|c| c.taxonomy == taxonomy).count();
            let _ = writeln!(out, "| {taxonomy} | {n} |");
        }

        let mut by_level: BTreeMap<String, usize> = BTreeMap::new();
        for concept in concepts {
            *by_level.entry(concept.level.to_string()).or_default() += 1;
        }
        out.push_str("\n## Concepts by Bloom Level\n\n| Level | Concepts |\n|---|---:|\n");
        for (level, n) in &by_level {
            let _ = writeln!(out, "| {level} | {n} |");
        }

        let assigned: HashSet<u32> = outlines.iter().flat_map(|o| o.concept_ids.iter().copied()).collect();
        let unassigned = concepts.iter().filter(|c| !assigned.contains(&c.id)).count();
        let roots = concepts.iter().filter(|c| c.dependencies.is_empty()).count();
        let _ = write!(
            out,
            "\n## Graph Health\n\n\
             | Check | Value |\n|---|---:|\n\
             | Concepts without prerequisites | {roots} |\n\
             | Concepts not assigned to a chapter | {unassigned} |\n"
        );

        out.push_str("\n## Chapters\n\n| Chapter | Concepts | Words | Quiz Questions |\n|---|---:|---:|---:|\n");
        for outline in outlines {
            let words = per_file
                .get(&cx.layout().chapter_page(outline))
                .map_or(0, |s| s.words);
            let quiz = per_file
                .get(&cx.layout().chapter_quiz(outline))
                .map_or(0, |s| s.questions);
            let _ = writeln!(
                out,
                "| {}. {} | {} | {} | {} |",
                outline.number,
                outline.title,
                outline.concept_ids.len(),
                words,
                quiz
            );
        }

        info!(files = per_file.len(), words = total.words, "metrics computed");

        let mut output = StageOutput::new();
        output.artifact(cx.write(METRICS, &out)?);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stages::testing::{ScriptedGenerator, populated_context};
    use coursebuilder_site::{SiteLayout, write_artifact};

    #[test]
    fn counts_words_sections_and_questions() {
        let md = "\
# Glossary

#### Widget
A small device.

### What is a gear?
It turns.

```python
# not a heading
print('x y z')
```
";
        let stats = markdown_stats(md);
        assert_eq!(stats.sections, 2);
        assert_eq!(stats.questions, 1);
        // Glossary, Widget, A small device., What is a gear?, It turns.
        assert_eq!(stats.words, 1 + 1 + 3 + 4 + 2);
    }

    #[test]
    fn hashtags_are_not_headings() {
        let stats = markdown_stats("#rust is fun?");
        assert_eq!(stats.sections, 0);
        assert_eq!(stats.questions, 0);
        assert_eq!(stats.words, 3);
    }

    #[tokio::test]
    async fn metrics_page_reflects_written_files() {
        let mut ctx = populated_context("metrics");
        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());

        let mut earlier = StageOutput::new();
        earlier.artifact(
            write_artifact(&layout, GLOSSARY, "# Glossary\n\n#### Gear\n\nx\n\n#### Spring\n\ny\n")
                .unwrap(),
        );
        earlier.artifact(
            write_artifact(&layout, FAQ, "# FAQ\n\n### Why?\n\nBecause.\n\n### How?\n\nSo.\n")
                .unwrap(),
        );
        earlier.artifact(
            write_artifact(
                &layout,
                "docs/chapters/01-widget-fundamentals/quiz.md",
                "# Quiz\n\n#### 1. One?\n\n#### 2. Two?\n\n#### 3. Three?\n",
            )
            .unwrap(),
        );
        ctx.apply(StageId::Glossary, earlier).unwrap();

        let generator = Arc::new(ScriptedGenerator::new("unused"));
        let cx = StageContext::new(&ctx, generator.clone(), &layout);
        MetricsStage.run(&cx).await.unwrap();
        assert_eq!(generator.prompt_count(), 0);

        let md = std::fs::read_to_string(layout.resolve(METRICS)).unwrap();
        assert!(md.contains("| Concepts | 4 |"));
        assert!(md.contains("| Glossary terms | 2 |"));
        assert!(md.contains("| FAQ questions | 2 |"));
        assert!(md.contains("| Foundation | 2 |"));
        assert!(md.contains("| Concepts without prerequisites | 1 |"));
        assert!(md.contains("| 1. Widget Fundamentals | 2 | 0 | 3 |"));

        let _ = std::fs::remove_dir_all(layout.root());
    }
}
