//! On-disk layout and renderers for generated CourseBuilder sites.
//!
//! Stages decide *what* to write; this crate decides *where* it goes
//! ([`SiteLayout`]), writes it atomically with a checksum
//! ([`write_artifact`]), and renders the non-generated files: `mkdocs.yml`,
//! the Pages workflow, the learning-graph exports and `manifest.json`.

pub mod graph;
pub mod layout;
pub mod mkdocs;
pub mod writer;

pub use graph::{render_concept_list, render_graph_csv, render_graph_json};
pub use layout::{SiteLayout, nav_path, slugify};
pub use mkdocs::{MkdocsOptions, render_mkdocs, render_pages_workflow};
pub use writer::{read_manifest, sha256_hex, write_artifact, write_manifest};
