//! Model graph storage.

use crate::index::{AdjacencyIndex, NameIndex};
use crate::{GraphError, GraphResult};
use keel_ast::Span;
use keel_core::{EdgeId, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    Source,
    Endpoint,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entity => "entity",
            NodeKind::Source => "source",
            NodeKind::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between two nodes. Every edge points in the direction data
/// flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// parent entity → child entity
    Parent,
    /// source → entity it responds with
    Provides,
    /// entity → source accepting it as payload
    ConsumedBy,
    /// entity → source whose parameters read it
    ParamDependency,
    /// referenced entity → entity whose attribute expression reads it
    Expression,
    /// endpoint → response entity
    Returns,
    /// request entity → endpoint
    AcceptedBy,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Parent => "parent",
            EdgeKind::Provides => "provides",
            EdgeKind::ConsumedBy => "consumed_by",
            EdgeKind::ParamDependency => "param_dependency",
            EdgeKind::Expression => "expression",
            EdgeKind::Returns => "returns",
            EdgeKind::AcceptedBy => "accepted_by",
        }
    }

    /// Edges an entity's data depends on, for ordering purposes.
    pub fn is_entity_dependency(&self) -> bool {
        matches!(self, EdgeKind::Parent | EdgeKind::Expression)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Attribute or parameter that produced the edge.
    pub label: Option<String>,
}

/// Derived per-entity facts, computed once after the acyclicity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFacts {
    /// Root of the first-parent chain; the entity itself when it has no parent.
    pub identity_anchor: String,
    /// Two or more parents.
    pub composite: bool,
}

/// The model graph. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    names: NameIndex,
    adjacency: AdjacencyIndex,
    facts: HashMap<NodeId, EntityFacts>,
    /// Sources whose call mutates external state.
    write_sources: HashSet<NodeId>,
}

impl ModelGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ==================== Construction ====================

    pub(crate) fn add_node(
        &mut self,
        kind: NodeKind,
        name: &str,
        span: Span,
    ) -> GraphResult<NodeId> {
        let id = NodeId::new(self.nodes.len() as u32);
        if !self.names.insert(kind, name, id) {
            return Err(GraphError::duplicate_name(kind.as_str(), name, span));
        }
        self.nodes.push(Node {
            id,
            kind,
            name: name.to_string(),
            span,
        });
        Ok(id)
    }

    /// Add an edge unless one of the same kind already joins the two nodes.
    pub(crate) fn add_edge(
        &mut self,
        kind: EdgeKind,
        from: NodeId,
        to: NodeId,
        label: Option<String>,
    ) -> EdgeId {
        if let Some(existing) = self
            .adjacency
            .edges_from(from, Some(kind))
            .find(|id| self.edges[id.index()].to == to)
        {
            return existing;
        }
        let id = EdgeId::new(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            kind,
            from,
            to,
            label,
        });
        self.adjacency.insert(id, kind, from, to);
        id
    }

    pub(crate) fn set_facts(&mut self, entity: NodeId, facts: EntityFacts) {
        self.facts.insert(entity, facts);
    }

    pub(crate) fn mark_write_source(&mut self, source: NodeId) {
        self.write_sources.insert(source);
    }

    // ==================== Lookup ====================

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn find(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.names.get(kind, name)
    }

    pub fn entity(&self, name: &str) -> Option<NodeId> {
        self.find(NodeKind::Entity, name)
    }

    pub fn source(&self, name: &str) -> Option<NodeId> {
        self.find(NodeKind::Source, name)
    }

    pub fn endpoint(&self, name: &str) -> Option<NodeId> {
        self.find(NodeKind::Endpoint, name)
    }

    /// Like `find`, but a missing node is an error.
    pub fn require(&self, kind: NodeKind, name: &str) -> GraphResult<NodeId> {
        self.find(kind, name)
            .ok_or_else(|| GraphError::unknown_node(kind.as_str(), name))
    }

    /// Nodes of one kind in declaration order.
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn facts(&self, entity: NodeId) -> Option<&EntityFacts> {
        self.facts.get(&entity)
    }

    /// True for sources called with a write verb or publishing to a channel.
    pub fn is_write_source(&self, source: NodeId) -> bool {
        self.write_sources.contains(&source)
    }

    /// True for sources whose call has no side effects.
    pub fn is_read_source(&self, source: NodeId) -> bool {
        self.node(source).kind == NodeKind::Source && !self.is_write_source(source)
    }

    // ==================== Adjacency ====================

    pub fn edges_from(&self, id: NodeId, kind: Option<EdgeKind>) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .edges_from(id, kind)
            .map(move |e| &self.edges[e.index()])
    }

    pub fn edges_to(&self, id: NodeId, kind: Option<EdgeKind>) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .edges_to(id, kind)
            .map(move |e| &self.edges[e.index()])
    }

    /// Targets of outgoing edges of one kind.
    pub fn successors(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.edges_from(id, Some(kind)).map(|e| e.to)
    }

    /// Origins of incoming edges of one kind.
    pub fn predecessors(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.edges_to(id, Some(kind)).map(|e| e.from)
    }

    /// Declared parents of an entity, in declaration order.
    pub fn parents(&self, entity: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.predecessors(entity, EdgeKind::Parent)
    }

    /// Direct children of an entity.
    pub fn children(&self, entity: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.successors(entity, EdgeKind::Parent)
    }

    pub fn has_edge(&self, kind: EdgeKind, from: NodeId, to: NodeId) -> bool {
        self.edges_from(from, Some(kind)).any(|e| e.to == to)
    }
}
