//! Indexes for efficient graph lookups.

use crate::{EdgeKind, NodeKind};
use keel_core::{EdgeId, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Name index: (NodeKind, name) -> NodeId
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    index: HashMap<NodeKind, HashMap<String, NodeId>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the name is already taken for this kind.
    pub fn insert(&mut self, kind: NodeKind, name: &str, node_id: NodeId) -> bool {
        let names = self.index.entry(kind).or_default();
        if names.contains_key(name) {
            return false;
        }
        names.insert(name.to_string(), node_id);
        true
    }

    pub fn get(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.index.get(&kind).and_then(|names| names.get(name)).copied()
    }
}

/// Adjacency index keyed by node, then edge kind.
/// Edge lists keep insertion order so every walk is deterministic.
#[derive(Debug, Default, Clone)]
pub struct AdjacencyIndex {
    /// Edges leaving the node
    outbound: HashMap<NodeId, BTreeMap<EdgeKind, Vec<EdgeId>>>,
    /// Edges entering the node
    inbound: HashMap<NodeId, BTreeMap<EdgeKind, Vec<EdgeId>>>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge_id: EdgeId, kind: EdgeKind, from: NodeId, to: NodeId) {
        self.outbound
            .entry(from)
            .or_default()
            .entry(kind)
            .or_default()
            .push(edge_id);
        self.inbound
            .entry(to)
            .or_default()
            .entry(kind)
            .or_default()
            .push(edge_id);
    }

    /// Get edges leaving a node, optionally of one kind.
    pub fn edges_from(
        &self,
        node_id: NodeId,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = EdgeId> + '_ {
        Self::collect(&self.outbound, node_id, kind)
    }

    /// Get edges entering a node, optionally of one kind.
    pub fn edges_to(
        &self,
        node_id: NodeId,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = EdgeId> + '_ {
        Self::collect(&self.inbound, node_id, kind)
    }

    fn collect(
        index: &HashMap<NodeId, BTreeMap<EdgeKind, Vec<EdgeId>>>,
        node_id: NodeId,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = EdgeId> + '_ {
        index
            .get(&node_id)
            .into_iter()
            .flat_map(move |kind_map| {
                kind_map
                    .iter()
                    .filter(move |(k, _)| kind.map_or(true, |wanted| **k == wanted))
                    .flat_map(|(_, edges)| edges.iter().copied())
            })
    }
}
