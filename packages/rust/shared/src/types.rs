//! Core domain types for CourseBuilder runs and generated sites.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CourseBuilderError, Result};

/// Current schema version for the site manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for generation run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DeployTarget
// ---------------------------------------------------------------------------

/// Where the generated site is meant to be published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployTarget {
    /// Emit a GitHub Actions workflow that publishes to GitHub Pages.
    GithubPages,
    /// Local site only.
    #[default]
    None,
}

impl DeployTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubPages => "github-pages",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeployTarget {
    type Err = CourseBuilderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github-pages" | "gh-pages" => Ok(Self::GithubPages),
            "none" | "" => Ok(Self::None),
            other => Err(CourseBuilderError::config(format!(
                "invalid deploy target '{other}': expected 'github-pages' or 'none'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Immutable settings for one generation run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Subject of the course.
    pub topic: String,
    /// Number of chapters.
    pub chapters: u32,
    /// Number of simulations (0 skips the simulation fan-out).
    pub simulations: u32,
    /// Number of concepts requested for the learning graph.
    pub concepts: u32,
    /// Root directory of the generated site.
    pub output_dir: PathBuf,
    /// Model identifier passed to the generation service.
    pub model: String,
    /// Deployment target.
    pub deploy: DeployTarget,
    /// Repository name (used for GitHub Pages URLs).
    pub repo_name: Option<String>,
    /// Maximum in-flight generation requests during a fan-out.
    pub concurrency: usize,
    /// `max_tokens` per generation request.
    pub max_tokens: u32,
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(CourseBuilderError::config("topic must not be empty"));
        }
        if self.chapters == 0 {
            return Err(CourseBuilderError::config("chapter count must be at least 1"));
        }
        if self.concepts == 0 {
            return Err(CourseBuilderError::config("concept count must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(CourseBuilderError::config("concurrency must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(CourseBuilderError::config("model identifier must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Learning graph records
// ---------------------------------------------------------------------------

/// Taxonomy tier of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Taxonomy {
    Foundation,
    Core,
    Advanced,
}

impl Taxonomy {
    /// Normalize a free-text label. Anything unrecognized is `Core`.
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("found") {
            Self::Foundation
        } else if lower.contains("adv") {
            Self::Advanced
        } else {
            Self::Core
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundation => "Foundation",
            Self::Core => "Core",
            Self::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cognitive level of a concept (revised Bloom's taxonomy, lowest first).
///
/// Labels the model invents are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
    Other(String),
}

impl BloomLevel {
    /// Canonical levels, lowest first. Matching tries them in this order.
    const LABELS: [(&'static str, BloomLevel); 6] = [
        ("remember", BloomLevel::Remember),
        ("understand", BloomLevel::Understand),
        ("apply", BloomLevel::Apply),
        ("analyze", BloomLevel::Analyze),
        ("evaluate", BloomLevel::Evaluate),
        ("create", BloomLevel::Create),
    ];

    /// Normalize a free-text label: the first canonical label contained in
    /// it (case-insensitive) wins; anything else is kept verbatim.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();
        Self::LABELS
            .iter()
            .find(|(label, _)| lower.contains(label))
            .map(|(_, level)| level.clone())
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Remember => "Remember",
            Self::Understand => "Understand",
            Self::Apply => "Apply",
            Self::Analyze => "Analyze",
            Self::Evaluate => "Evaluate",
            Self::Create => "Create",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for BloomLevel {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<BloomLevel> for String {
    fn from(level: BloomLevel) -> Self {
        level.as_str().to_string()
    }
}

impl std::fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the learning graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Identifier, unique within a run.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Owning chapter (1-based).
    pub chapter: u32,
    /// Prerequisite concept ids, all strictly less than `id`.
    pub dependencies: Vec<u32>,
    pub taxonomy: Taxonomy,
    pub level: BloomLevel,
}

/// Structural description of one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    /// Chapter number (1-based).
    pub number: u32,
    pub title: String,
    pub summary: String,
    /// Concepts taught in this chapter.
    pub concept_ids: Vec<u32>,
}

/// The course description produced by the first stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDescription {
    pub title: String,
    /// Full markdown as generated.
    pub body: String,
    /// Main topics, in order; used as fallback chapter titles.
    pub topics: Vec<String>,
}

/// A planned interactive simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    pub title: String,
    /// Directory name under `docs/sims/`.
    pub slug: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Site manifest
// ---------------------------------------------------------------------------

/// Metadata for a single file written under the output location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Wall-clock duration of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u64,
}

/// Accumulated token usage across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The `manifest.json` structure stored at the root of each generated site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub id: RunId,
    pub topic: String,
    pub model: String,
    /// Tool version that generated the site.
    pub tool_version: String,
    pub created_at: DateTime<Utc>,
    pub chapters: u32,
    pub concepts: usize,
    #[serde(default)]
    pub artifacts: Vec<ArtifactMeta>,
    #[serde(default)]
    pub stages: Vec<StageTiming>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> PipelineConfig {
        PipelineConfig {
            topic: "Widgets".into(),
            chapters: 2,
            simulations: 0,
            concepts: 4,
            output_dir: PathBuf::from("/tmp/widgets"),
            model: "test-model".into(),
            deploy: DeployTarget::None,
            repo_name: None,
            concurrency: 4,
            max_tokens: 1024,
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn taxonomy_normalization() {
        assert_eq!(Taxonomy::normalize("Foundational"), Taxonomy::Foundation);
        assert_eq!(Taxonomy::normalize("foundation"), Taxonomy::Foundation);
        assert_eq!(Taxonomy::normalize("FOUND"), Taxonomy::Foundation);
        assert_eq!(Taxonomy::normalize("Advanced topic"), Taxonomy::Advanced);
        assert_eq!(Taxonomy::normalize("ADV"), Taxonomy::Advanced);
        assert_eq!(Taxonomy::normalize("core"), Taxonomy::Core);
        assert_eq!(Taxonomy::normalize("intermediate"), Taxonomy::Core);
        assert_eq!(Taxonomy::normalize(""), Taxonomy::Core);
    }

    #[test]
    fn bloom_level_normalization() {
        assert_eq!(BloomLevel::normalize("remember"), BloomLevel::Remember);
        assert_eq!(BloomLevel::normalize(" Understanding "), BloomLevel::Understand);
        assert_eq!(BloomLevel::normalize("APPLY"), BloomLevel::Apply);
        assert_eq!(BloomLevel::normalize("Analyze"), BloomLevel::Analyze);
        assert_eq!(BloomLevel::normalize("Evaluate"), BloomLevel::Evaluate);
        assert_eq!(BloomLevel::normalize("Create (synthesis)"), BloomLevel::Create);
        assert_eq!(
            BloomLevel::normalize("Analyzing"),
            BloomLevel::Other("Analyzing".into())
        );
        assert_eq!(
            BloomLevel::normalize("creating"),
            BloomLevel::Other("creating".into())
        );
        assert_eq!(
            BloomLevel::normalize("  Synthesize "),
            BloomLevel::Other("Synthesize".into())
        );
    }

    #[test]
    fn bloom_level_serializes_as_label() {
        let json = serde_json::to_string(&BloomLevel::Apply).unwrap();
        assert_eq!(json, r#""Apply""#);
        let other: BloomLevel = serde_json::from_str(r#""Synthesize""#).unwrap();
        assert_eq!(other, BloomLevel::Other("Synthesize".into()));
    }

    #[test]
    fn deploy_target_parsing() {
        assert_eq!("github-pages".parse::<DeployTarget>().unwrap(), DeployTarget::GithubPages);
        assert_eq!("none".parse::<DeployTarget>().unwrap(), DeployTarget::None);
        assert!("netlify".parse::<DeployTarget>().is_err());
        assert_eq!(DeployTarget::GithubPages.to_string(), "github-pages");
    }

    #[test]
    fn pipeline_config_validation() {
        assert!(sample_config().validate().is_ok());

        let mut cfg = sample_config();
        cfg.topic = "   ".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("topic"));

        let mut cfg = sample_config();
        cfg.chapters = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = sample_config();
        cfg.concepts = 0;
        assert!(cfg.validate().is_err());

        // Zero simulations is allowed.
        let mut cfg = sample_config();
        cfg.simulations = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn manifest_serialization() {
        let manifest = SiteManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            topic: "Widgets".into(),
            model: "test-model".into(),
            tool_version: "0.1.0".into(),
            created_at: Utc::now(),
            chapters: 2,
            concepts: 4,
            artifacts: vec![ArtifactMeta {
                path: "docs/glossary.md".into(),
                sha256: "0".repeat(64),
                size_bytes: 12,
            }],
            stages: vec![],
            usage: TokenUsage::default(),
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        let parsed: SiteManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.topic, "Widgets");
        assert_eq!(parsed.artifacts.len(), 1);
    }
}
