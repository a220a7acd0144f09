use async_trait::async_trait;
use tracing::{info, instrument};

use coursebuilder_shared::Result;

use super::{Stage, StageContext, StageId, concept_lines, concepts_by_id, ensure_title};
use crate::context::StageOutput;

/// Questions requested per chapter quiz.
const QUESTIONS_PER_QUIZ: usize = 8;

/// Stage 8: a multiple-choice quiz for every chapter.
pub struct QuizStage;

#[async_trait]
impl Stage for QuizStage {
    fn id(&self) -> StageId {
        StageId::Quizzes
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let concepts = cx.context().require_concepts()?;
        let outlines = cx.context().require_outlines()?;

        let prompts: Vec<String> = outlines
            .iter()
            .map(|outline| {
                format!(
                    "Write a quiz for Chapter {number}: {title}.\n\n\
                     Chapter summary: {summary}\n\n\
                     Concepts:\n{concepts}\n\n\
                     Start with `# Quiz: {title}`. Write {QUESTIONS_PER_QUIZ} multiple-choice \
                     questions spread across the Bloom levels. Format each as a `#### N. \
                     Question?` heading, four options labelled A to D, and the answer with a \
                     one-sentence explanation inside a collapsed `??? question \"Show Answer\"` \
                     admonition.",
                    number = outline.number,
                    title = outline.title,
                    summary = outline.summary,
                    concepts = concept_lines(concepts_by_id(concepts, &outline.concept_ids)),
                )
            })
            .collect();

        let texts = cx.generate_all(prompts).await?;

        let mut output = StageOutput::new();
        for (outline, text) in outlines.iter().zip(&texts) {
            let heading = format!("Quiz: {}", outline.title);
            output.artifact(cx.write(&cx.layout().chapter_quiz(outline), &ensure_title(text, &heading))?);
        }

        info!(quizzes = texts.len(), "quizzes written");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stages::testing::{ScriptedGenerator, populated_context};
    use coursebuilder_site::SiteLayout;

    #[tokio::test]
    async fn writes_quiz_next_to_each_chapter() {
        let ctx = populated_context("quizzes");
        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());
        let generator = Arc::new(ScriptedGenerator::new("#### 1. What is a widget?\n\nA. A thing"));

        let cx = StageContext::new(&ctx, generator.clone(), &layout);
        let output = QuizStage.run(&cx).await.unwrap();

        let paths: Vec<&str> = output.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "docs/chapters/01-widget-fundamentals/quiz.md",
                "docs/chapters/02-building-widgets/quiz.md",
            ]
        );

        let quiz = std::fs::read_to_string(layout.resolve(paths[1])).unwrap();
        assert!(quiz.starts_with("# Quiz: Building Widgets\n\n#### 1. What is a widget?"));

        let _ = std::fs::remove_dir_all(layout.root());
    }
}
