use async_trait::async_trait;
use tracing::instrument;

use coursebuilder_shared::Result;
use coursebuilder_site::layout::FAQ;

use super::{Stage, StageContext, StageId, ensure_title};
use crate::context::StageOutput;

/// Stage 7: frequently asked questions, grouped by theme.
pub struct FaqStage;

#[async_trait]
impl Stage for FaqStage {
    fn id(&self) -> StageId {
        StageId::Faq
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let course = cx.context().require_course()?;
        let outlines = cx.context().require_outlines()?;

        let chapters = outlines
            .iter()
            .map(|o| format!("{}. {}", o.number, o.title))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Write a FAQ for students taking the course \"{title}\".\n\n\
             Chapters:\n{chapters}\n\n\
             Start with `# Frequently Asked Questions`. Group 20 to 40 questions under `##` \
             category headings (Getting Started, Core Concepts, Technical Details, Common \
             Challenges, Best Practices). Write every question as a `###` heading ending in `?` \
             and answer it in one short paragraph.",
            title = course.title,
        );

        let text = cx.generate(prompt).await?;

        let mut output = StageOutput::new();
        output.artifact(cx.write(FAQ, &ensure_title(&text, "Frequently Asked Questions"))?);
        Ok(output)
    }
}
