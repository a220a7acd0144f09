//! Path conventions of the generated site.
//!
//! All paths handed out here are relative to the output root and use `/`
//! separators, so they can go straight into `manifest.json` and mkdocs nav.

use std::path::{Path, PathBuf};

use coursebuilder_shared::{ChapterOutline, Simulation};

pub const COURSE_DESCRIPTION: &str = "docs/course-description.md";
pub const CONCEPT_LIST: &str = "docs/learning-graph/concept-list.md";
pub const GRAPH_CSV: &str = "docs/learning-graph/learning-graph.csv";
pub const GRAPH_JSON: &str = "docs/learning-graph/learning-graph.json";
pub const METRICS: &str = "docs/learning-graph/metrics.md";
pub const CHAPTERS_INDEX: &str = "docs/chapters/index.md";
pub const SIMS_INDEX: &str = "docs/sims/index.md";
pub const GLOSSARY: &str = "docs/glossary.md";
pub const FAQ: &str = "docs/faq.md";
pub const REFERENCES: &str = "docs/references.md";
pub const HOME: &str = "docs/index.md";
pub const README: &str = "README.md";
pub const MKDOCS: &str = "mkdocs.yml";
pub const DEPLOY_WORKFLOW: &str = ".github/workflows/deploy.yml";
pub const MANIFEST: &str = "manifest.json";

/// Lowercase, ASCII alphanumerics joined by single dashes.
///
/// Returns `"untitled"` when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Where every generated file lives under one output root.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (root-joined) path for a relative site path.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// `docs/chapters/NN-slug`, zero-padded to two digits.
    pub fn chapter_dir(&self, outline: &ChapterOutline) -> String {
        format!(
            "docs/chapters/{:02}-{}",
            outline.number,
            slugify(&outline.title)
        )
    }

    pub fn chapter_page(&self, outline: &ChapterOutline) -> String {
        format!("{}/index.md", self.chapter_dir(outline))
    }

    pub fn chapter_quiz(&self, outline: &ChapterOutline) -> String {
        format!("{}/quiz.md", self.chapter_dir(outline))
    }

    pub fn sim_html(&self, sim: &Simulation) -> String {
        format!("docs/sims/{}/main.html", sim.slug)
    }

    pub fn sim_page(&self, sim: &Simulation) -> String {
        format!("docs/sims/{}/index.md", sim.slug)
    }
}

/// Strip the leading `docs/` so a path can be used in mkdocs nav.
pub fn nav_path(rel: &str) -> &str {
    rel.strip_prefix("docs/").unwrap_or(rel)
}
