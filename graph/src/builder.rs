//! Model → graph construction.

use crate::{EdgeKind, EntityFacts, GraphError, GraphResult, ModelGraph, NodeKind};
use keel_ast::{free_names, EndpointDef, EntityDef, Expr, Model, SourceDef, SourceKind, Span};
use keel_core::NodeId;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `{Entity.attr}` placeholder in a source url.
const PLACEHOLDER: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\}";

impl ModelGraph {
    /// Build the graph for a model, rejecting dangling references and
    /// inheritance or data cycles.
    pub fn build(model: &Model) -> GraphResult<Self> {
        GraphBuilder::new(model).build()
    }
}

struct GraphBuilder<'m> {
    model: &'m Model,
    graph: ModelGraph,
}

impl<'m> GraphBuilder<'m> {
    fn new(model: &'m Model) -> Self {
        Self {
            model,
            graph: ModelGraph::new(),
        }
    }

    fn build(mut self) -> GraphResult<ModelGraph> {
        let model = self.model;

        // First pass: one node per declaration
        for entity in &model.entities {
            self.graph
                .add_node(NodeKind::Entity, &entity.name, entity.span)?;
        }
        for source in &model.sources {
            let id = self
                .graph
                .add_node(NodeKind::Source, &source.name, source.span)?;
            if source.is_write() {
                self.graph.mark_write_source(id);
            }
        }
        for endpoint in &model.endpoints {
            self.graph
                .add_node(NodeKind::Endpoint, &endpoint.name, endpoint.span)?;
        }

        // Second pass: edges
        for entity in &model.entities {
            self.add_entity_edges(entity)?;
        }
        for source in &model.sources {
            self.add_source_edges(source)?;
        }
        for endpoint in &model.endpoints {
            self.add_endpoint_edges(endpoint)?;
        }

        self.check_acyclic()?;
        self.compute_facts();

        tracing::debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "model graph built"
        );
        Ok(self.graph)
    }

    fn entity_id(&self, name: &str, span: Span) -> GraphResult<NodeId> {
        self.graph
            .entity(name)
            .ok_or_else(|| GraphError::unknown_entity(name, span))
    }

    fn add_entity_edges(&mut self, entity: &EntityDef) -> GraphResult<()> {
        let child = self.entity_id(&entity.name, entity.span)?;
        for parent in &entity.parents {
            let parent_id = self.entity_id(&parent.name, parent.span)?;
            self.graph
                .add_edge(EdgeKind::Parent, parent_id, child, parent.alias.clone());
        }

        let aliases: HashMap<&str, &str> = entity
            .parents
            .iter()
            .filter_map(|p| p.alias.as_deref().map(|alias| (alias, p.name.as_str())))
            .collect();

        for attr in &entity.attributes {
            let Some(expr) = &attr.expr else { continue };
            for name_ref in free_names(expr) {
                let name = aliases
                    .get(name_ref.name.as_str())
                    .copied()
                    .unwrap_or(name_ref.name.as_str());
                // Self references are ordered by attribute position instead.
                if name == entity.name {
                    continue;
                }
                if let Some(referenced) = self.graph.entity(name) {
                    self.graph.add_edge(
                        EdgeKind::Expression,
                        referenced,
                        child,
                        Some(attr.name.clone()),
                    );
                }
            }
        }
        Ok(())
    }

    fn add_source_edges(&mut self, source: &SourceDef) -> GraphResult<()> {
        let id = self.graph.require(NodeKind::Source, &source.name)?;
        if let Some(entity) = source.provides() {
            let entity = self.entity_id(entity, source.span)?;
            self.graph.add_edge(EdgeKind::Provides, id, entity, None);
        }
        if let Some(entity) = source.consumes() {
            let entity = self.entity_id(entity, source.span)?;
            self.graph.add_edge(EdgeKind::ConsumedBy, entity, id, None);
        }

        for param in source.params() {
            match &param.value {
                Expr::Literal(_) => {}
                Expr::Member(base, _, _) => match base.as_ref() {
                    Expr::Var(entity, span) => {
                        let entity = self.entity_id(entity, *span)?;
                        self.graph.add_edge(
                            EdgeKind::ParamDependency,
                            entity,
                            id,
                            Some(param.name.clone()),
                        );
                    }
                    _ => {
                        return Err(GraphError::unsupported_param(
                            &source.name,
                            &param.name,
                            param.span,
                        ))
                    }
                },
                _ => {
                    return Err(GraphError::unsupported_param(
                        &source.name,
                        &param.name,
                        param.span,
                    ))
                }
            }
        }

        if let SourceKind::Rest(rest) = &source.kind {
            for (entity, attr) in url_placeholders(&rest.url) {
                let entity = self.entity_id(&entity, source.span)?;
                self.graph
                    .add_edge(EdgeKind::ParamDependency, entity, id, Some(attr));
            }
        }
        Ok(())
    }

    fn add_endpoint_edges(&mut self, endpoint: &EndpointDef) -> GraphResult<()> {
        let id = self.graph.require(NodeKind::Endpoint, &endpoint.name)?;
        if let Some(request) = endpoint.request_entity() {
            let request = self.entity_id(request, endpoint.span)?;
            self.graph.add_edge(EdgeKind::AcceptedBy, request, id, None);
        }
        for response in &endpoint.responses {
            if let Some(entity) = response.schema.entity_name() {
                let entity = self.entity_id(entity, response.span)?;
                self.graph.add_edge(EdgeKind::Returns, id, entity, None);
            }
        }
        Ok(())
    }

    /// Depth-first walk from each entity towards what it depends on. A node
    /// met again while still on the stack closes a cycle.
    fn check_acyclic(&self) -> GraphResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::New; self.graph.node_count()];
        for start in self.graph.nodes_of(NodeKind::Entity) {
            if marks[start.id.index()] != Mark::New {
                continue;
            }
            // (node, remaining dependencies) frames
            let mut stack: Vec<(NodeId, Vec<NodeId>)> =
                vec![(start.id, self.dependencies(start.id))];
            marks[start.id.index()] = Mark::OnStack;

            while let Some((node, pending)) = stack.last_mut() {
                let node = *node;
                match pending.pop() {
                    Some(next) => match marks[next.index()] {
                        Mark::New => {
                            marks[next.index()] = Mark::OnStack;
                            stack.push((next, self.dependencies(next)));
                        }
                        Mark::OnStack => {
                            let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                            let mut path: Vec<String> = stack[from..]
                                .iter()
                                .map(|(n, _)| self.graph.name(*n).to_string())
                                .collect();
                            path.push(self.graph.name(next).to_string());
                            return Err(GraphError::cycle(path, self.graph.node(next).span));
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Nodes `node` waits on, in declaration order once popped. An entity
    /// fetched by a read source waits on that source, and the source on the
    /// entities its parameters read.
    fn dependencies(&self, node: NodeId) -> Vec<NodeId> {
        let graph = &self.graph;
        let mut deps: Vec<NodeId> = match graph.node(node).kind {
            NodeKind::Entity => graph
                .edges_to(node, None)
                .filter(|e| {
                    e.kind.is_entity_dependency()
                        || (e.kind == EdgeKind::Provides && graph.is_read_source(e.from))
                })
                .map(|e| e.from)
                .collect(),
            NodeKind::Source => graph
                .predecessors(node, EdgeKind::ParamDependency)
                .collect(),
            NodeKind::Endpoint => Vec::new(),
        };
        deps.reverse();
        deps
    }

    fn compute_facts(&mut self) {
        let entities: Vec<NodeId> = self
            .graph
            .nodes_of(NodeKind::Entity)
            .map(|n| n.id)
            .collect();
        for entity in entities {
            let mut anchor = entity;
            while let Some(first) = self.graph.parents(anchor).next() {
                anchor = first;
            }
            let facts = EntityFacts {
                identity_anchor: self.graph.name(anchor).to_string(),
                composite: self.graph.parents(entity).count() >= 2,
            };
            self.graph.set_facts(entity, facts);
        }
    }
}

/// `(entity, attribute)` pairs named by `{Entity.attr}` placeholders.
pub fn url_placeholders(url: &str) -> Vec<(String, String)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(PLACEHOLDER).expect("placeholder pattern"));
    pattern
        .captures_iter(url)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}
