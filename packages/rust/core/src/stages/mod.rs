//! The twelve pipeline stages.
//!
//! Each stage reads what it needs from a read-only [`StageContext`], talks to
//! the generator, writes its files, and returns a [`StageOutput`]. Only the
//! orchestrator mutates the context.

mod chapters;
mod course;
mod faq;
mod glossary;
mod learning_graph;
mod metrics;
mod outline;
mod quizzes;
mod references;
mod simulations;
mod site_config;
mod summary;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use coursebuilder_generation::{GenerateRequest, Generator, generate_parallel};
use coursebuilder_shared::{ArtifactMeta, Concept, PipelineConfig, Result};
use coursebuilder_site::{SiteLayout, write_artifact};

use crate::context::{PipelineContext, StageOutput};

pub use chapters::ChapterContentStage;
pub use course::CourseDescriptionStage;
pub use faq::FaqStage;
pub use glossary::GlossaryStage;
pub use learning_graph::LearningGraphStage;
pub use metrics::{MarkdownStats, MetricsStage, markdown_stats};
pub use outline::ChapterStructureStage;
pub use quizzes::QuizStage;
pub use references::ReferencesStage;
pub use simulations::SimulationsStage;
pub use site_config::SiteConfigStage;
pub use summary::SummaryStage;

/// System prompt shared by every generation call.
const SYSTEM_PROMPT: &str = "You are an expert instructional designer writing an open, \
intelligent textbook. Write clear, accurate, well-structured markdown for a college-level \
audience. Follow the requested output format exactly and do not add commentary before or \
after it.";

// ---------------------------------------------------------------------------
// StageId
// ---------------------------------------------------------------------------

/// Identity of a stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    CourseDescription,
    LearningGraph,
    ChapterStructure,
    ChapterContent,
    Simulations,
    Glossary,
    Faq,
    Quizzes,
    References,
    SiteConfiguration,
    Metrics,
    Summary,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [StageId; 12] = [
        StageId::CourseDescription,
        StageId::LearningGraph,
        StageId::ChapterStructure,
        StageId::ChapterContent,
        StageId::Simulations,
        StageId::Glossary,
        StageId::Faq,
        StageId::Quizzes,
        StageId::References,
        StageId::SiteConfiguration,
        StageId::Metrics,
        StageId::Summary,
    ];

    /// Display name used in progress output and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CourseDescription => "Course Description",
            Self::LearningGraph => "Learning Graph",
            Self::ChapterStructure => "Chapter Structure",
            Self::ChapterContent => "Chapter Content",
            Self::Simulations => "Simulations",
            Self::Glossary => "Glossary",
            Self::Faq => "FAQ",
            Self::Quizzes => "Quizzes",
            Self::References => "References",
            Self::SiteConfiguration => "Site Configuration",
            Self::Metrics => "Metrics",
            Self::Summary => "Top-level Summary",
        }
    }

    /// 1-based position in the standard pipeline.
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|id| id == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

/// One named unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput>;
}

/// The narrowed view of a run that a stage gets.
pub struct StageContext<'a> {
    context: &'a PipelineContext,
    generator: Arc<dyn Generator>,
    layout: &'a SiteLayout,
}

impl<'a> StageContext<'a> {
    pub fn new(
        context: &'a PipelineContext,
        generator: Arc<dyn Generator>,
        layout: &'a SiteLayout,
    ) -> Self {
        Self {
            context,
            generator,
            layout,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        self.context
    }

    pub fn config(&self) -> &PipelineConfig {
        self.context.config()
    }

    pub fn layout(&self) -> &SiteLayout {
        self.layout
    }

    /// A request carrying the run's model, token limit and system prompt.
    pub fn request(&self, prompt: impl Into<String>) -> GenerateRequest {
        let config = self.config();
        GenerateRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_model(config.model.clone())
            .with_max_tokens(config.max_tokens)
    }

    /// Generate one completion and return its text.
    pub async fn generate(&self, prompt: impl Into<String>) -> Result<String> {
        let completion = self.generator.generate(self.request(prompt)).await?;
        Ok(completion.text)
    }

    /// Generate one completion per prompt, bounded by the run's concurrency
    /// limit. Texts come back in prompt order.
    pub async fn generate_all(&self, prompts: Vec<String>) -> Result<Vec<String>> {
        let requests = prompts.into_iter().map(|p| self.request(p)).collect();
        let completions =
            generate_parallel(self.generator.clone(), requests, self.config().concurrency).await?;
        Ok(completions.into_iter().map(|c| c.text).collect())
    }

    /// Atomically write a file under the output root.
    pub fn write(&self, rel: &str, content: &str) -> Result<ArtifactMeta> {
        write_artifact(self.layout, rel, content)
    }
}

/// The standard twelve stages, in order.
pub fn standard_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(CourseDescriptionStage),
        Box::new(LearningGraphStage),
        Box::new(ChapterStructureStage),
        Box::new(ChapterContentStage),
        Box::new(SimulationsStage),
        Box::new(GlossaryStage),
        Box::new(FaqStage),
        Box::new(QuizStage),
        Box::new(ReferencesStage),
        Box::new(SiteConfigStage),
        Box::new(MetricsStage),
        Box::new(SummaryStage),
    ]
}

// ---------------------------------------------------------------------------
// Helpers shared by stages
// ---------------------------------------------------------------------------

/// Make sure generated markdown starts with an H1, prepending `heading` if not.
fn ensure_title(text: &str, heading: &str) -> String {
    let body = text.trim();
    if body.starts_with("# ") {
        format!("{body}\n")
    } else {
        format!("# {heading}\n\n{body}\n")
    }
}

/// `- id. name` lines for the given concepts.
fn concept_lines<'c>(concepts: impl IntoIterator<Item = &'c Concept>) -> String {
    concepts
        .into_iter()
        .map(|c| format!("- {}. {}", c.id, c.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look up concepts by id, skipping ids that do not exist.
fn concepts_by_id<'c>(concepts: &'c [Concept], ids: &[u32]) -> Vec<&'c Concept> {
    let index: HashMap<u32, &Concept> = concepts.iter().map(|c| (c.id, c)).collect();
    ids.iter().filter_map(|id| index.get(id).copied()).collect()
}

/// First prose paragraph of a markdown document (skips headings and lists).
fn first_paragraph(markdown: &str) -> String {
    markdown
        .split("\n\n")
        .map(str::trim)
        .find(|p| {
            !p.is_empty()
                && !p.starts_with('#')
                && !p.starts_with('-')
                && !p.starts_with('*')
                && !p.starts_with('|')
                && !p.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}
