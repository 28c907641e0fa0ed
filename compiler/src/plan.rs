//! Execution plan: the compiler's output, consumed by code emission.

use crate::CompileResult;
use keel_ast::{Decorator, Header, HttpMethod, ParamLocation};
use keel_flow::EndpointFlow;
use serde::Serialize;

/// Where an entity's data comes from at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Fetched from an external source.
    Source { source: String },
    /// Populated from the incoming request.
    Request,
    /// Produced by another endpoint of the model.
    ComputedParent { endpoint: String },
    /// Computed from entities earlier in the chain.
    Inline,
    /// Raw fields only; carried so later entities can read them.
    PassThrough,
}

/// One attribute to populate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributePlan {
    pub name: String,
    /// Compiled target code for computed attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Request parameter for decorated attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorator: Option<Decorator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStep {
    pub entity: String,
    pub origin: Origin,
    pub identity_anchor: String,
    pub composite: bool,
    pub attributes: Vec<AttributePlan>,
}

impl ChainStep {
    /// Compiled `(attribute, code)` pairs in declaration order.
    pub fn expressions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| a.expression.as_deref().map(|code| (a.name.as_str(), code)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPhase {
    /// Builds the mutation payload from the request.
    PreWrite,
    /// Builds the response entities.
    Response,
}

/// Entities in dependency order: no step reads an entity that appears
/// after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionChain {
    pub phase: ChainPhase,
    pub steps: Vec<ChainStep>,
}

impl ExecutionChain {
    pub fn step(&self, entity: &str) -> Option<&ChainStep> {
        self.steps.iter().find(|s| s.entity == entity)
    }

    pub fn position(&self, entity: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.entity == entity)
    }

    pub fn entities(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.entity.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Read,
    Write,
}

/// A parameter expression, compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledParam {
    pub name: String,
    pub location: ParamLocation,
    pub code: String,
}

/// Normalized call to an external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub source: String,
    pub role: SourceRole,
    /// Entity fetched (read) or sent (write).
    pub entity: String,
    /// Variable name the result is bound to.
    pub alias: String,
    /// Url or channel.
    pub address: String,
    pub method: String,
    pub headers: Vec<Header>,
    pub params: Vec<CompiledParam>,
    /// Computed attributes of `entity`, compiled.
    pub attributes: Vec<(String, String)>,
}

/// Response variant with its compiled guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledResponse {
    pub status: u16,
    pub entity: Option<String>,
    pub condition: Option<String>,
}

/// Declared error with its compiled condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledError {
    pub status: u16,
    pub message: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointPlan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    pub flow: EndpointFlow,
    /// Pre-write chain first when there is one.
    pub chains: Vec<ExecutionChain>,
    pub sources: Vec<SourceDescriptor>,
    pub responses: Vec<CompiledResponse>,
    pub errors: Vec<CompiledError>,
}

impl EndpointPlan {
    pub fn chain(&self, phase: ChainPhase) -> Option<&ExecutionChain> {
        self.chains.iter().find(|c| c.phase == phase)
    }

    pub fn source(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.source == name)
    }
}

/// An ancestor left out of a chain because nothing supplies its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEntity {
    pub entity: String,
    pub needed_by: String,
}

/// One endpoint's local subgraph, restricted to the sources its flow uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgraphReport {
    pub endpoint: String,
    /// Reachable sources the flow does not use.
    pub dropped_sources: Vec<String>,
    /// Graphviz rendering.
    pub dot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Closed name paths, e.g. `["Doc", "update", "Doc"]`.
    pub cycles: Vec<Vec<String>>,
    pub dropped_entities: Vec<DroppedEntity>,
    /// In endpoint declaration order.
    pub subgraphs: Vec<SubgraphReport>,
}

impl Diagnostics {
    pub fn subgraph(&self, endpoint: &str) -> Option<&SubgraphReport> {
        self.subgraphs.iter().find(|s| s.endpoint == endpoint)
    }
}

/// Compiler output for a whole model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// In endpoint declaration order.
    pub endpoints: Vec<EndpointPlan>,
    pub diagnostics: Diagnostics,
}

impl ExecutionPlan {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointPlan> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
