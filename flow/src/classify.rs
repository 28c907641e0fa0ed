//! Endpoint flow classification.

use crate::{FlowError, FlowResult};
use keel_ast::{free_names, EndpointDef, HttpMethod, Model};
use keel_core::NodeId;
use keel_graph::{
    dependency_closure, descendants, find_terminal_entity, EdgeKind, ModelGraph,
};
use serde::Serialize;
use std::fmt;

/// Execution phase of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    ComputeOnly,
    Read,
    Write,
    ReadWrite,
}

impl FlowKind {
    fn from_sets(reads: bool, writes: bool) -> Self {
        match (reads, writes) {
            (false, false) => FlowKind::ComputeOnly,
            (true, false) => FlowKind::Read,
            (false, true) => FlowKind::Write,
            (true, true) => FlowKind::ReadWrite,
        }
    }

    pub fn reads(&self) -> bool {
        matches!(self, FlowKind::Read | FlowKind::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, FlowKind::Write | FlowKind::ReadWrite)
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowKind::ComputeOnly => "COMPUTE_ONLY",
            FlowKind::Read => "READ",
            FlowKind::Write => "WRITE",
            FlowKind::ReadWrite => "READ_WRITE",
        };
        f.write_str(name)
    }
}

/// Classifier output for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointFlow {
    pub endpoint: String,
    pub kind: FlowKind,
    /// Read sources, first-seen order.
    pub read_sources: Vec<String>,
    /// Write sources, first-seen order.
    pub write_targets: Vec<String>,
    /// Entities with attribute expressions the endpoint computes.
    pub computed_entities: Vec<String>,
    /// Entity handed to the write targets, when the request reaches one.
    pub terminal: Option<String>,
    /// None for duplex endpoints.
    pub method: Option<HttpMethod>,
}

impl EndpointFlow {
    /// Remove read sources whose data another endpoint already produces,
    /// reclassifying the endpoint.
    pub fn drop_reads(&mut self, sources: &[String]) {
        if sources.is_empty() {
            return;
        }
        self.read_sources.retain(|s| !sources.contains(s));
        self.kind =
            FlowKind::from_sets(!self.read_sources.is_empty(), !self.write_targets.is_empty());
        tracing::debug!(
            endpoint = %self.endpoint,
            dropped = ?sources,
            kind = %self.kind,
            "reads covered by computed parents"
        );
    }
}

/// Ordered, duplicate-free collection of node ids.
#[derive(Default)]
struct Ordered(Vec<NodeId>);

impl Ordered {
    /// False when `id` was already present.
    fn push(&mut self, id: NodeId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    fn names(&self, graph: &ModelGraph) -> Vec<String> {
        self.0.iter().map(|id| graph.name(*id).to_string()).collect()
    }
}

struct Classifier<'a> {
    graph: &'a ModelGraph,
    model: &'a Model,
    reads: Ordered,
    writes: Ordered,
    computed: Ordered,
}

impl<'a> Classifier<'a> {
    fn new(graph: &'a ModelGraph, model: &'a Model) -> Self {
        Self {
            graph,
            model,
            reads: Ordered::default(),
            writes: Ordered::default(),
            computed: Ordered::default(),
        }
    }

    /// Fold the sources feeding `entity`'s dependency closure into the sets.
    /// A read source's parameter inputs are folded in as well. With
    /// `reads_only`, write-verb providers are ignored.
    fn fold_closure(&mut self, entity: NodeId, reads_only: bool) -> FlowResult<()> {
        let graph = self.graph;
        for member in dependency_closure(graph, entity)? {
            let name = graph.name(member);
            if self.model.entity(name).is_some_and(|e| e.has_expressions()) {
                self.computed.push(member);
            }
            for source in graph.predecessors(member, EdgeKind::Provides) {
                if graph.is_write_source(source) {
                    if !reads_only {
                        self.writes.push(source);
                    }
                } else if self.reads.push(source) {
                    for input in graph.predecessors(source, EdgeKind::ParamDependency) {
                        self.fold_closure(input, reads_only)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Classify one endpoint.
pub fn classify(
    graph: &ModelGraph,
    model: &Model,
    endpoint: &EndpointDef,
) -> FlowResult<EndpointFlow> {
    if graph.endpoint(&endpoint.name).is_none() {
        return Err(FlowError::UnknownEndpoint {
            name: endpoint.name.clone(),
        });
    }
    let mut classifier = Classifier::new(graph, model);

    // Responses: everything their closures are fed by.
    for response in endpoint.response_entities() {
        if let Some(id) = graph.entity(response) {
            classifier.fold_closure(id, false)?;
        }
    }

    // Request: ancestors are read, the descendant chain ends in a write.
    let mut terminal = None;
    if let Some(request) = endpoint.request_entity().and_then(|name| graph.entity(name)) {
        classifier.fold_closure(request, true)?;
        match find_terminal_entity(graph, request) {
            Some(target) => {
                classifier.fold_closure(target, true)?;
                for source in graph.successors(target, EdgeKind::ConsumedBy) {
                    if graph.is_write_source(source) {
                        classifier.writes.push(source);
                    }
                }
                terminal = Some(graph.name(target).to_string());
            }
            None => {
                let mutating = endpoint.method().is_some_and(|m| m.is_write());
                if mutating && !descendants(graph, request).is_empty() {
                    return Err(FlowError::no_terminal(
                        &endpoint.name,
                        graph.name(request),
                        endpoint.span,
                    ));
                }
            }
        }
    }

    // Guard and error conditions: entities they read, resolved the same way.
    for condition in endpoint.conditions() {
        for name_ref in free_names(condition) {
            if let Some(id) = graph.entity(&name_ref.name) {
                classifier.fold_closure(id, false)?;
            }
        }
    }

    let read_sources = classifier.reads.names(graph);
    let write_targets = classifier.writes.names(graph);
    let kind = FlowKind::from_sets(!read_sources.is_empty(), !write_targets.is_empty());
    tracing::debug!(
        endpoint = %endpoint.name,
        kind = %kind,
        reads = read_sources.len(),
        writes = write_targets.len(),
        "flow classified"
    );

    Ok(EndpointFlow {
        endpoint: endpoint.name.clone(),
        kind,
        read_sources,
        write_targets,
        computed_entities: classifier.computed.names(graph),
        terminal,
        method: endpoint.method(),
    })
}

/// Classify every endpoint of the model, in declaration order.
pub fn classify_all(graph: &ModelGraph, model: &Model) -> FlowResult<Vec<EndpointFlow>> {
    model
        .endpoints
        .iter()
        .map(|endpoint| classify(graph, model, endpoint))
        .collect()
}
