use async_trait::async_trait;
use tracing::{info, instrument};

use coursebuilder_shared::Result;

use super::{Stage, StageContext, StageId, concept_lines, concepts_by_id, ensure_title};
use crate::context::StageOutput;

/// Stage 4: write the body of every chapter, one generation call each.
pub struct ChapterContentStage;

#[async_trait]
impl Stage for ChapterContentStage {
    fn id(&self) -> StageId {
        StageId::ChapterContent
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let course = cx.context().require_course()?;
        let concepts = cx.context().require_concepts()?;
        let outlines = cx.context().require_outlines()?;

        let prompts: Vec<String> = outlines
            .iter()
            .map(|outline| {
                let taught = concept_lines(concepts_by_id(concepts, &outline.concept_ids));
                format!(
                    "Write Chapter {number} of the textbook \"{course}\".\n\n\
                     Chapter title: {title}\n\
                     Chapter summary: {summary}\n\n\
                     Concepts to cover, in order:\n{taught}\n\n\
                     Start with `# Chapter {number}: {title}`, then a short overview. Give each \
                     concept its own `##` section with an explanation, a worked example and, \
                     where it helps, a markdown table or list. End with a `## Key Takeaways` \
                     section. Write 2000 to 4000 words of markdown.",
                    number = outline.number,
                    course = course.title,
                    title = outline.title,
                    summary = outline.summary,
                )
            })
            .collect();

        let texts = cx.generate_all(prompts).await?;

        let mut output = StageOutput::new();
        for (outline, text) in outlines.iter().zip(&texts) {
            let heading = format!("Chapter {}: {}", outline.number, outline.title);
            output.artifact(cx.write(&cx.layout().chapter_page(outline), &ensure_title(text, &heading))?);
        }

        info!(chapters = texts.len(), "chapter content written");
        Ok(output)
    }
}
