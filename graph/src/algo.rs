//! Structural queries over the model graph.
//!
//! Every function takes the graph explicitly and returns results in a
//! deterministic order: declaration order for ties, dependency order for
//! closures.

use crate::{EdgeKind, GraphError, GraphResult, ModelGraph, NodeKind};
use keel_core::{EdgeId, NodeId};
use std::collections::{BTreeSet, HashSet, VecDeque};

// ==================== Ancestry ====================

/// Every ancestor of `entity` over parent edges, each once, every entity
/// after all of its own ancestors. The entity itself is not included.
pub fn ancestors(graph: &ModelGraph, entity: NodeId) -> GraphResult<Vec<NodeId>> {
    let mut order = post_order(graph, entity, |e| e == EdgeKind::Parent)?;
    order.pop();
    Ok(order)
}

/// The entities `entity` needs before it can be computed: ancestors and
/// entities its attribute expressions read, transitively, dependency-first.
/// The entity itself comes last.
pub fn dependency_closure(graph: &ModelGraph, entity: NodeId) -> GraphResult<Vec<NodeId>> {
    post_order(graph, entity, |e| e.is_entity_dependency())
}

/// Post-order DFS over incoming edges accepted by `follow`.
fn post_order(
    graph: &ModelGraph,
    root: NodeId,
    follow: impl Fn(EdgeKind) -> bool,
) -> GraphResult<Vec<NodeId>> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut path: Vec<NodeId> = Vec::new();
    visit(graph, root, &follow, &mut path, &mut done, &mut order)?;
    Ok(order)
}

fn visit(
    graph: &ModelGraph,
    node: NodeId,
    follow: &impl Fn(EdgeKind) -> bool,
    path: &mut Vec<NodeId>,
    done: &mut HashSet<NodeId>,
    order: &mut Vec<NodeId>,
) -> GraphResult<()> {
    if done.contains(&node) {
        return Ok(());
    }
    if let Some(start) = path.iter().position(|n| *n == node) {
        let mut names: Vec<String> = path[start..]
            .iter()
            .map(|n| graph.name(*n).to_string())
            .collect();
        names.push(graph.name(node).to_string());
        return Err(GraphError::cycle(names, graph.node(node).span));
    }
    path.push(node);
    let deps: Vec<NodeId> = graph
        .edges_to(node, None)
        .filter(|e| follow(e.kind))
        .map(|e| e.from)
        .collect();
    for dep in deps {
        visit(graph, dep, follow, path, done, order)?;
    }
    path.pop();
    done.insert(node);
    order.push(node);
    Ok(())
}

/// Every entity descending from `entity` over parent edges, nearest first.
pub fn descendants(graph: &ModelGraph, entity: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::from([entity]);
    let mut queue = VecDeque::from([entity]);
    let mut found = Vec::new();
    while let Some(node) = queue.pop_front() {
        for child in graph.children(node) {
            if seen.insert(child) {
                found.push(child);
                queue.push_back(child);
            }
        }
    }
    found
}

/// Number of parent edges between `from` and its ancestor `to`, or None if
/// `to` is not an ancestor. Zero when both are the same entity.
pub fn distance_to_ancestor(graph: &ModelGraph, from: NodeId, to: NodeId) -> Option<usize> {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([(from, 0usize)]);
    while let Some((node, distance)) = queue.pop_front() {
        if node == to {
            return Some(distance);
        }
        for parent in graph.parents(node) {
            if seen.insert(parent) {
                queue.push_back((parent, distance + 1));
            }
        }
    }
    None
}

/// True if the entity is the payload of a write-verb source.
pub fn is_mutation_target(graph: &ModelGraph, entity: NodeId) -> bool {
    graph
        .successors(entity, EdgeKind::ConsumedBy)
        .any(|source| graph.is_write_source(source))
}

/// The mutation target closest to `entity` along its descendant chain.
/// `entity` itself counts at distance zero. Ties go to the entity declared
/// first. None for validation-only chains.
pub fn find_terminal_entity(graph: &ModelGraph, entity: NodeId) -> Option<NodeId> {
    graph
        .nodes_of(NodeKind::Entity)
        .filter(|candidate| is_mutation_target(graph, candidate.id))
        .filter_map(|candidate| {
            distance_to_ancestor(graph, candidate.id, entity).map(|d| (d, candidate.id))
        })
        .min()
        .map(|(_, id)| id)
}

// ==================== Endpoint-local subgraph ====================

/// Nodes and edges an endpoint can reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSubgraph {
    pub endpoint: NodeId,
    /// Reachable nodes in id order.
    pub nodes: Vec<NodeId>,
    /// Edges with both ends inside, in id order.
    pub edges: Vec<EdgeId>,
    /// Reachable sources left out by the selection, by name.
    pub dropped_sources: Vec<String>,
}

impl LocalSubgraph {
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.binary_search(&node).is_ok()
    }
}

/// Bidirectional reachability from an endpoint and its request/response
/// entities. `returns`, `accepted_by`, `consumed_by` and `param_dependency`
/// edges are followed forward; `provides`, `parent` and `expression` edges
/// backward. Other endpoints are never entered. With a selection, only the
/// named sources may join.
pub fn endpoint_local_subgraph(
    graph: &ModelGraph,
    endpoint: NodeId,
    selected: Option<&[&str]>,
) -> LocalSubgraph {
    const FORWARD: [EdgeKind; 4] = [
        EdgeKind::Returns,
        EdgeKind::AcceptedBy,
        EdgeKind::ConsumedBy,
        EdgeKind::ParamDependency,
    ];
    const BACKWARD: [EdgeKind; 3] = [EdgeKind::Provides, EdgeKind::Parent, EdgeKind::Expression];

    let mut nodes = BTreeSet::from([endpoint]);
    let mut dropped: Vec<String> = Vec::new();
    let mut queue = VecDeque::from([endpoint]);
    queue.extend(graph.successors(endpoint, EdgeKind::Returns));
    queue.extend(graph.predecessors(endpoint, EdgeKind::AcceptedBy));

    while let Some(node) = queue.pop_front() {
        nodes.insert(node);
        let forward = graph
            .edges_from(node, None)
            .filter(|e| FORWARD.contains(&e.kind))
            .map(|e| e.to);
        let backward = graph
            .edges_to(node, None)
            .filter(|e| BACKWARD.contains(&e.kind))
            .map(|e| e.from);
        for next in forward.chain(backward) {
            if nodes.contains(&next) || queue.contains(&next) {
                continue;
            }
            let candidate = graph.node(next);
            match candidate.kind {
                NodeKind::Endpoint => continue,
                NodeKind::Source => {
                    let allowed =
                        selected.map_or(true, |names| names.contains(&candidate.name.as_str()));
                    if !allowed {
                        if !dropped.contains(&candidate.name) {
                            tracing::warn!(
                                endpoint = %graph.name(endpoint),
                                source = %candidate.name,
                                "reachable source not selected, dropped from subgraph"
                            );
                            dropped.push(candidate.name.clone());
                        }
                        continue;
                    }
                }
                NodeKind::Entity => {}
            }
            queue.push_back(next);
        }
    }

    let edges = graph
        .edges()
        .filter(|e| nodes.contains(&e.from) && nodes.contains(&e.to))
        .map(|e| e.id)
        .collect();
    LocalSubgraph {
        endpoint,
        nodes: nodes.into_iter().collect(),
        edges,
        dropped_sources: dropped,
    }
}

// ==================== Cycles ====================

/// Every simple cycle in the graph as a closed name path
/// (`["A", "B", "A"]`). Self loops are legal and left out.
pub fn detect_cycles(graph: &ModelGraph) -> Vec<Vec<String>> {
    let successors: Vec<Vec<NodeId>> = graph
        .nodes()
        .map(|node| {
            let set: BTreeSet<NodeId> = graph
                .edges_from(node.id, None)
                .map(|e| e.to)
                .filter(|to| *to != node.id)
                .collect();
            set.into_iter().collect()
        })
        .collect();

    let mut cycles = Vec::new();
    for start in graph.nodes().map(|n| n.id) {
        // Only cycles whose smallest node is `start`, so each is found once.
        let mut path = vec![start];
        let mut on_path = HashSet::from([start]);
        let mut frames = vec![successors[start.index()].iter()];
        while let Some(frame) = frames.last_mut() {
            match frame.next() {
                Some(&next) if next == start => {
                    let mut cycle: Vec<String> =
                        path.iter().map(|n| graph.name(*n).to_string()).collect();
                    cycle.push(graph.name(start).to_string());
                    cycles.push(cycle);
                }
                Some(&next) if next > start && !on_path.contains(&next) => {
                    path.push(next);
                    on_path.insert(next);
                    frames.push(successors[next.index()].iter());
                }
                Some(_) => {}
                None => {
                    frames.pop();
                    if let Some(node) = path.pop() {
                        on_path.remove(&node);
                    }
                }
            }
        }
    }
    cycles
}
