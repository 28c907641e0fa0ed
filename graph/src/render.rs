//! Graphviz rendering for diagnostics.

use crate::{LocalSubgraph, ModelGraph, NodeKind};
use std::fmt::Write;

/// Render the whole graph, or only an endpoint's local subgraph, as DOT.
pub fn to_dot(graph: &ModelGraph, view: Option<&LocalSubgraph>) -> String {
    let mut out = String::from("digraph model {\n    rankdir=LR;\n");

    for node in graph.nodes() {
        if view.is_some_and(|v| !v.contains(node.id)) {
            continue;
        }
        let shape = match node.kind {
            NodeKind::Entity => "box",
            NodeKind::Source => "cylinder",
            NodeKind::Endpoint => "hexagon",
        };
        let _ = writeln!(out, "    {} [label=\"{}\", shape={}];", node.id, escape(&node.name), shape);
    }

    let edges: Vec<_> = match view {
        Some(v) => v.edges.iter().map(|id| graph.edge(*id)).collect(),
        None => graph.edges().collect(),
    };
    for edge in edges {
        let label = match &edge.label {
            Some(label) => format!("{} ({})", edge.kind, escape(label)),
            None => edge.kind.to_string(),
        };
        let _ = writeln!(out, "    {} -> {} [label=\"{}\"];", edge.from, edge.to, label);
    }

    out.push_str("}\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
