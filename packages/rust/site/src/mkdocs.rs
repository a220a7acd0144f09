//! mkdocs configuration and the GitHub Pages workflow.

use std::fmt::Write as _;

use chrono::{Datelike, Utc};

use coursebuilder_shared::{ChapterOutline, Simulation};

use crate::layout::{
    CHAPTERS_INDEX, CONCEPT_LIST, COURSE_DESCRIPTION, FAQ, GLOSSARY, HOME, METRICS,
    REFERENCES, SIMS_INDEX, SiteLayout, nav_path,
};

/// Inputs for [`render_mkdocs`].
#[derive(Debug, Clone)]
pub struct MkdocsOptions<'a> {
    pub site_name: &'a str,
    pub description: &'a str,
    /// `owner/name` or bare `name` of the GitHub repository, if known.
    pub repo_name: Option<&'a str>,
    pub outlines: &'a [ChapterOutline],
    pub simulations: &'a [Simulation],
}

/// Render `mkdocs.yml` for the Material theme with a nav covering every
/// generated page.
pub fn render_mkdocs(layout: &SiteLayout, opts: &MkdocsOptions<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "site_name: {}", yaml_str(opts.site_name));
    if !opts.description.trim().is_empty() {
        let _ = writeln!(out, "site_description: {}", yaml_str(opts.description.trim()));
    }
    if let Some(repo) = opts.repo_name.filter(|r| !r.trim().is_empty()) {
        let repo = repo.trim();
        let _ = writeln!(out, "repo_name: {}", yaml_str(repo));
        if repo.contains('/') {
            let _ = writeln!(out, "repo_url: {}", yaml_str(&format!("https://github.com/{repo}")));
        }
    }
    let _ = writeln!(
        out,
        "copyright: {}",
        yaml_str(&format!("Copyright {}", Utc::now().year()))
    );

    out.push_str(
        "\ntheme:\n  name: material\n  features:\n    - navigation.sections\n    - navigation.top\n    - search.highlight\n\nmarkdown_extensions:\n  - admonition\n  - attr_list\n  - md_in_html\n  - pymdownx.details\n  - pymdownx.superfences\n  - toc:\n      permalink: true\n\nplugins:\n  - search\n",
    );

    out.push_str("\nnav:\n");
    nav_entry(&mut out, 1, "Home", HOME);
    nav_entry(&mut out, 1, "Course Description", COURSE_DESCRIPTION);

    out.push_str("  - Chapters:\n");
    nav_entry(&mut out, 2, "Overview", CHAPTERS_INDEX);
    for outline in opts.outlines {
        let label = format!("{}. {}", outline.number, outline.title);
        let _ = writeln!(out, "    - {}:", yaml_str(&label));
        nav_entry(&mut out, 3, "Content", &layout.chapter_page(outline));
        nav_entry(&mut out, 3, "Quiz", &layout.chapter_quiz(outline));
    }

    if !opts.simulations.is_empty() {
        out.push_str("  - Simulations:\n");
        nav_entry(&mut out, 2, "Overview", SIMS_INDEX);
        for sim in opts.simulations {
            nav_entry(&mut out, 2, &sim.title, &layout.sim_page(sim));
        }
    }

    out.push_str("  - Learning Graph:\n");
    nav_entry(&mut out, 2, "Concept List", CONCEPT_LIST);
    nav_entry(&mut out, 2, "Metrics", METRICS);

    nav_entry(&mut out, 1, "Glossary", GLOSSARY);
    nav_entry(&mut out, 1, "FAQ", FAQ);
    nav_entry(&mut out, 1, "References", REFERENCES);

    out
}

/// GitHub Actions workflow that builds the site and publishes to Pages.
pub fn render_pages_workflow() -> String {
    r#"name: Deploy site

on:
  push:
    branches: [main]
  workflow_dispatch:

permissions:
  contents: write

jobs:
  deploy:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-python@v5
        with:
          python-version: "3.x"
      - run: pip install mkdocs-material
      - run: mkdocs gh-deploy --force
"#
    .to_string()
}

fn nav_entry(out: &mut String, depth: usize, label: &str, rel: &str) {
    let _ = writeln!(
        out,
        "{}- {}: {}",
        "  ".repeat(depth),
        yaml_str(label),
        nav_path(rel)
    );
}

/// Quote a scalar when plain YAML would misread it.
fn yaml_str(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.contains(": ")
        || s.ends_with(':')
        || s.contains(" #")
        || s.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c))
        || s != s.trim();
    if needs_quotes {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}
