use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use coursebuilder_extract::{concept_ids_by_chapter, parse_chapter_outlines};
use coursebuilder_shared::{ChapterOutline, Result};
use coursebuilder_site::layout::CHAPTERS_INDEX;
use coursebuilder_site::{SiteLayout, nav_path};

use super::{Stage, StageContext, StageId};
use crate::context::{Produced, StageOutput};

/// Stage 3: split the course into chapter outlines.
pub struct ChapterStructureStage;

#[async_trait]
impl Stage for ChapterStructureStage {
    fn id(&self) -> StageId {
        StageId::ChapterStructure
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let config = cx.config();
        let course = cx.context().require_course()?;
        let concepts = cx.context().require_concepts()?;

        let concept_table = concepts
            .iter()
            .map(|c| format!("{}: {} (suggested chapter {})", c.id, c.name, c.chapter))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Design the chapter structure for the course \"{title}\".\n\n\
             Suggested chapter topics:\n{topics}\n\n\
             Concepts (ID: name):\n{concept_table}\n\n\
             Write exactly {chapters} chapters. Separate chapters with a line containing only \
             `---`. Use this format for each chapter:\n\n\
             Chapter N: Title\n\
             Summary: two or three sentences describing the chapter.\n\
             Concept IDs: comma-separated IDs of the concepts taught in this chapter\n\n\
             Every concept must appear in exactly one chapter, and a concept must not appear \
             before its prerequisites.",
            title = course.title,
            topics = course.topics.join("\n"),
            chapters = config.chapters,
        );

        let text = cx.generate(prompt).await?;
        let extraction = parse_chapter_outlines(
            &text,
            config.chapters,
            &course.topics,
            &concept_ids_by_chapter(concepts),
        );
        for diagnostic in &extraction.diagnostics {
            debug!(%diagnostic, "chapter outline");
        }
        info!(
            chapters = extraction.value.len(),
            repaired = extraction.diagnostics.len(),
            "chapter outlines extracted"
        );
        let outlines = extraction.value;

        let mut output = StageOutput::new();
        output.artifact(cx.write(
            CHAPTERS_INDEX,
            &render_chapter_index(cx.layout(), &course.title, &outlines),
        )?);
        Ok(output.with(Produced::Outlines(outlines)))
    }
}

fn render_chapter_index(layout: &SiteLayout, title: &str, outlines: &[ChapterOutline]) -> String {
    let mut out = format!("# {title}: Chapters\n\n");
    for outline in outlines {
        let page = layout.chapter_page(outline);
        let link = nav_path(&page).strip_prefix("chapters/").unwrap_or(page.as_str());
        let _ = writeln!(
            out,
            "{}. [{}]({})\n\n    {}\n",
            outline.number, outline.title, link, outline.summary
        );
    }
    out
}
