use async_trait::async_trait;
use tracing::instrument;

use coursebuilder_shared::Result;
use coursebuilder_site::layout::REFERENCES;

use super::{Stage, StageContext, StageId, ensure_title};
use crate::context::StageOutput;

/// Stage 9: curated further reading.
pub struct ReferencesStage;

#[async_trait]
impl Stage for ReferencesStage {
    fn id(&self) -> StageId {
        StageId::References
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let course = cx.context().require_course()?;

        let prompt = format!(
            "Compile a reference list for the course \"{title}\".\n\n\
             Main topics: {topics}\n\n\
             Start with `# References`. Give 10 to 20 entries as a numbered list. Each entry is \
             `[Title](URL) - Publication, Year - one sentence on why it is useful`. Prefer \
             stable sources: Wikipedia, textbooks, official documentation and well-known \
             tutorials. Do not invent URLs you are unsure of.",
            title = course.title,
            topics = if course.topics.is_empty() {
                cx.config().topic.clone()
            } else {
                course.topics.join(", ")
            },
        );

        let text = cx.generate(prompt).await?;

        let mut output = StageOutput::new();
        output.artifact(cx.write(REFERENCES, &ensure_title(&text, "References"))?);
        Ok(output)
    }
}
