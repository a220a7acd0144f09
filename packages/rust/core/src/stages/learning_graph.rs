use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use coursebuilder_extract::{parse_concept_table, validate_concepts};
use coursebuilder_shared::Result;
use coursebuilder_site::layout::{CONCEPT_LIST, GRAPH_CSV, GRAPH_JSON};
use coursebuilder_site::{render_concept_list, render_graph_csv, render_graph_json};

use super::{Stage, StageContext, StageId};
use crate::context::{Produced, StageOutput};

/// Stage 2: generate the concept dependency table and export the graph.
pub struct LearningGraphStage;

#[async_trait]
impl Stage for LearningGraphStage {
    fn id(&self) -> StageId {
        StageId::LearningGraph
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let config = cx.config();
        let course = cx.context().require_course()?;

        let topics = if course.topics.is_empty() {
            String::from("(derive them from the description)")
        } else {
            course
                .topics
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{}. {}", i + 1, t))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "Build the learning graph for the course \"{title}\".\n\n\
             Course description:\n{body}\n\n\
             Chapter topics:\n{topics}\n\n\
             Produce a markdown table with exactly {concepts} rows and these columns:\n\n\
             | ID | Concept | Chapter | Dependencies | Taxonomy | Bloom Level |\n\n\
             Rules:\n\
             - ID is a sequential integer starting at 1.\n\
             - Chapter is an integer from 1 to {chapters}.\n\
             - Dependencies is a comma-separated list of prerequisite IDs, each smaller than \
             the row's own ID; write a single `,` for concepts with no prerequisites.\n\
             - Taxonomy is one of Foundation, Core, Advanced.\n\
             - Bloom Level is one of Remember, Understand, Apply, Analyze, Evaluate, Create.\n\
             - Concept names are Title Case and at most 32 characters.\n\
             Output only the table.",
            title = course.title,
            body = course.body,
            concepts = config.concepts,
            chapters = config.chapters,
        );

        let text = cx.generate(prompt).await?;
        let extraction = parse_concept_table(&text);
        for diagnostic in &extraction.diagnostics {
            debug!(%diagnostic, "concept table");
        }
        let concepts = extraction.value;

        for warning in validate_concepts(&concepts, config.concepts, config.chapters) {
            warn!("{warning}");
        }
        info!(
            concepts = concepts.len(),
            skipped = extraction.diagnostics.len(),
            "learning graph extracted"
        );

        let mut output = StageOutput::new();
        output.artifact(cx.write(CONCEPT_LIST, &render_concept_list(&course.title, &concepts))?);
        output.artifact(cx.write(GRAPH_CSV, &render_graph_csv(&concepts))?);
        output.artifact(cx.write(GRAPH_JSON, &render_graph_json(&course.title, &concepts)?)?);

        Ok(output.with(Produced::Concepts(concepts)))
    }
}
