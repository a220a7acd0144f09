//! Shared types, error model, and configuration for CourseBuilder.
//!
//! This crate is the foundation depended on by all other CourseBuilder crates.
//! It provides:
//! - [`CourseBuilderError`] — the unified error type
//! - Domain types ([`PipelineConfig`], [`Concept`], [`ChapterOutline`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{CourseBuilderError, Result};
pub use types::{
    ArtifactMeta, BloomLevel, ChapterOutline, Concept, CourseDescription, DeployTarget,
    PipelineConfig, RunId, Simulation, SiteManifest, StageTiming, Taxonomy, TokenUsage,
    CURRENT_SCHEMA_VERSION,
};
