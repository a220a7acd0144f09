use async_trait::async_trait;
use tracing::instrument;

use coursebuilder_shared::Result;
use coursebuilder_site::layout::GLOSSARY;

use super::{Stage, StageContext, StageId, concept_lines, ensure_title};
use crate::context::StageOutput;

/// Stage 6: one definition per concept, alphabetized.
pub struct GlossaryStage;

#[async_trait]
impl Stage for GlossaryStage {
    fn id(&self) -> StageId {
        StageId::Glossary
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let course = cx.context().require_course()?;
        let concepts = cx.context().require_concepts()?;

        let prompt = format!(
            "Write the glossary for the course \"{title}\".\n\n\
             Terms:\n{terms}\n\n\
             Start with `# Glossary of Terms`. List the terms alphabetically, each as a \
             `#### Term` heading followed by a precise, concise, distinct, non-circular \
             definition of one or two sentences (ISO 11179 style). Add an `**Example:**` line \
             where it helps.",
            title = course.title,
            terms = concept_lines(concepts),
        );

        let text = cx.generate(prompt).await?;

        let mut output = StageOutput::new();
        output.artifact(cx.write(GLOSSARY, &ensure_title(&text, "Glossary of Terms"))?);
        Ok(output)
    }
}
