//! Learning-graph renderers: vis-network JSON, CSV and a markdown table.

use std::fmt::Write as _;

use serde::Serialize;

use coursebuilder_shared::{Concept, CourseBuilderError, Result, Taxonomy};

#[derive(Debug, Serialize)]
struct GraphDocument<'a> {
    metadata: GraphMetadata<'a>,
    groups: Vec<GraphGroup>,
    nodes: Vec<GraphNode<'a>>,
    edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize)]
struct GraphMetadata<'a> {
    title: &'a str,
    #[serde(rename = "conceptCount")]
    concept_count: usize,
    #[serde(rename = "edgeCount")]
    edge_count: usize,
}

#[derive(Debug, Serialize)]
struct GraphGroup {
    id: &'static str,
    color: &'static str,
}

#[derive(Debug, Serialize)]
struct GraphNode<'a> {
    id: u32,
    label: &'a str,
    group: &'static str,
    chapter: u32,
    level: &'a str,
}

#[derive(Debug, Serialize)]
struct GraphEdge {
    from: u32,
    to: u32,
}

/// Render the graph as vis-network style JSON.
///
/// Edges point from a concept to each of its prerequisites.
pub fn render_graph_json(title: &str, concepts: &[Concept]) -> Result<String> {
    let nodes: Vec<GraphNode<'_>> = concepts
        .iter()
        .map(|c| GraphNode {
            id: c.id,
            label: &c.name,
            group: c.taxonomy.as_str(),
            chapter: c.chapter,
            level: c.level.as_str(),
        })
        .collect();

    let edges: Vec<GraphEdge> = concepts
        .iter()
        .flat_map(|c| c.dependencies.iter().map(|&dep| GraphEdge { from: c.id, to: dep }))
        .collect();

    let doc = GraphDocument {
        metadata: GraphMetadata {
            title,
            concept_count: nodes.len(),
            edge_count: edges.len(),
        },
        groups: [Taxonomy::Foundation, Taxonomy::Core, Taxonomy::Advanced]
            .iter()
            .map(|t| GraphGroup {
                id: t.as_str(),
                color: group_color(t),
            })
            .collect(),
        nodes,
        edges,
    };

    serde_json::to_string_pretty(&doc)
        .map_err(|e| CourseBuilderError::validation(format!("JSON serialization failed: {e}")))
}

/// Render the graph as CSV with `|`-joined dependency lists.
pub fn render_graph_csv(concepts: &[Concept]) -> String {
    let mut out = String::from("ConceptID,ConceptLabel,Dependencies,TaxonomyID,Chapter,BloomLevel\n");
    for c in concepts {
        let deps = join_ids(&c.dependencies, "|");
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            c.id,
            csv_field(&c.name),
            deps,
            c.taxonomy.as_str(),
            c.chapter,
            csv_field(c.level.as_str())
        );
    }
    out
}

/// Render the concept list page.
pub fn render_concept_list(title: &str, concepts: &[Concept]) -> String {
    let mut out = format!("# {title}: Concept List\n\n");
    let _ = writeln!(out, "This learning graph contains {} concepts.\n", concepts.len());
    out.push_str("| ID | Concept | Chapter | Depends On | Taxonomy | Bloom Level |\n");
    out.push_str("|---:|---|---:|---|---|---|\n");
    for c in concepts {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            c.id,
            c.name.replace('|', "\\|"),
            c.chapter,
            join_ids(&c.dependencies, ", "),
            c.taxonomy.as_str(),
            c.level.as_str()
        );
    }
    out
}

fn join_ids(ids: &[u32], sep: &str) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(sep)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn group_color(t: &Taxonomy) -> &'static str {
    match t {
        Taxonomy::Foundation => "#4caf50",
        Taxonomy::Core => "#2196f3",
        Taxonomy::Advanced => "#f44336",
    }
}
