//! Main compiler implementation.

use crate::chain::ChainContext;
use crate::{
    ChainPhase, CompileError, CompileResult, CompiledError, CompiledResponse, CompilerConfig,
    Diagnostics, DroppedEntity, EndpointPlan, ExecutionChain, ExecutionPlan, Origin,
    SourceDescriptor, SubgraphReport,
};
use keel_ast::{free_names, EndpointDef, Model};
use keel_core::NodeId;
use keel_expr::{ExprCompiler, ExprScope, Symbols};
use keel_flow::{check_http_safety, classify, EndpointFlow};
use keel_graph::{
    detect_cycles, endpoint_local_subgraph, to_dot, EdgeKind, ModelGraph, NodeKind,
};
use std::collections::HashMap;

/// The Compiler transforms a model into an execution plan.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    /// Create a new compiler.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a model into a plan covering every endpoint.
    pub fn compile(&self, model: &Model) -> CompileResult<ExecutionPlan> {
        let graph = ModelGraph::build(model)?;
        let symbols = Symbols::from_model(model);
        let mut session = Session::new(model, &graph, &symbols, &self.config);

        for endpoint in &model.endpoints {
            session.plan_endpoint(&endpoint.name)?;
        }

        let cycles = if self.config.collect_cycles {
            detect_cycles(&graph)
        } else {
            Vec::new()
        };
        let Session {
            mut plans, dropped, ..
        } = session;
        let endpoints: Vec<EndpointPlan> = model
            .endpoints
            .iter()
            .filter_map(|e| plans.remove(&e.name))
            .collect();
        let subgraphs = if self.config.render_subgraphs {
            endpoints
                .iter()
                .map(|plan| subgraph_report(&graph, plan))
                .collect::<CompileResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(ExecutionPlan {
            endpoints,
            diagnostics: Diagnostics {
                cycles,
                dropped_entities: dropped,
                subgraphs,
            },
        })
    }

    /// Compile a model handed over as JSON.
    pub fn compile_json(&self, json: &str) -> CompileResult<ExecutionPlan> {
        self.compile(&Model::from_json(json)?)
    }

    /// The chain computing one entity outside any endpoint: every source may
    /// feed it and nothing comes from a request.
    pub fn chain_for(&self, model: &Model, entity: &str) -> CompileResult<ExecutionChain> {
        let graph = ModelGraph::build(model)?;
        let symbols = Symbols::from_model(model);
        let target = graph.require(NodeKind::Entity, entity)?;
        let mut session = Session::new(model, &graph, &symbols, &self.config);
        let mut ctx = ChainContext {
            endpoint: None,
            sources: graph.nodes_of(NodeKind::Source).map(|n| n.id).collect(),
            request: None,
            phase: ChainPhase::Response,
            skipped: Vec::new(),
        };
        session.build_chain(&mut ctx, &[target])
    }
}

/// Compile with the default configuration.
pub fn compile(model: &Model) -> CompileResult<ExecutionPlan> {
    Compiler::default().compile(model)
}

/// State for one compilation.
pub(crate) struct Session<'a> {
    pub model: &'a Model,
    pub graph: &'a ModelGraph,
    pub symbols: &'a Symbols,
    pub exprs: ExprCompiler<'a>,
    pub config: &'a CompilerConfig,
    /// Finished endpoint plans by name.
    pub plans: HashMap<String, EndpointPlan>,
    /// Endpoints being planned, outermost first.
    pub visiting: Vec<String>,
    pub dropped: Vec<DroppedEntity>,
}

impl<'a> Session<'a> {
    fn new(
        model: &'a Model,
        graph: &'a ModelGraph,
        symbols: &'a Symbols,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            model,
            graph,
            symbols,
            exprs: ExprCompiler::new(&config.functions),
            config,
            plans: HashMap::new(),
            visiting: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Plan an endpoint once. Planning may recurse into endpoints whose
    /// output this one needs.
    pub(crate) fn plan_endpoint(&mut self, name: &str) -> CompileResult<()> {
        if self.plans.contains_key(name) {
            return Ok(());
        }
        let model = self.model;
        let endpoint = model
            .endpoint(name)
            .ok_or_else(|| CompileError::UnknownEndpoint {
                name: name.to_string(),
            })?;
        if let Some(start) = self.visiting.iter().position(|v| v == name) {
            let mut path = self.visiting[start..].to_vec();
            path.push(name.to_string());
            return Err(CompileError::cyclic_computed_parent(path, endpoint.span));
        }

        self.visiting.push(name.to_string());
        let plan = self.build_plan(endpoint);
        self.visiting.pop();
        let plan = plan?;

        tracing::debug!(
            endpoint = %name,
            flow = %plan.flow.kind,
            chains = plan.chains.len(),
            sources = plan.sources.len(),
            "endpoint planned"
        );
        self.plans.insert(name.to_string(), plan);
        Ok(())
    }

    fn build_plan(&mut self, endpoint: &'a EndpointDef) -> CompileResult<EndpointPlan> {
        let graph = self.graph;
        let mut flow = classify(graph, self.model, endpoint)?;
        check_http_safety(endpoint, &flow)?;

        let reads: Vec<NodeId> = flow
            .read_sources
            .iter()
            .filter_map(|name| graph.source(name))
            .collect();
        let writes: Vec<NodeId> = flow
            .write_targets
            .iter()
            .filter_map(|name| graph.source(name))
            .collect();
        let request = endpoint.request_entity().and_then(|name| graph.entity(name));

        let mut chains = Vec::new();
        let mut skipped: Vec<NodeId> = Vec::new();
        if let Some(terminal) = flow.terminal.as_deref().and_then(|name| graph.entity(name)) {
            let mut ctx = ChainContext {
                endpoint: Some(endpoint),
                sources: reads.clone(),
                request,
                phase: ChainPhase::PreWrite,
                skipped: Vec::new(),
            };
            chains.push(self.build_chain(&mut ctx, &[terminal])?);
            skipped.extend(ctx.skipped);
        }

        let targets = response_targets(graph, endpoint);
        if !targets.is_empty() {
            let mut ctx = ChainContext {
                endpoint: Some(endpoint),
                sources: reads.iter().chain(&writes).copied().collect(),
                request,
                phase: ChainPhase::Response,
                skipped: Vec::new(),
            };
            chains.push(self.build_chain(&mut ctx, &targets)?);
            skipped.extend(ctx.skipped);
        }
        let covered = covered_reads(graph, &flow, &chains, &skipped);
        flow.drop_reads(&covered);

        let mut sources: Vec<SourceDescriptor> = Vec::new();
        for chain in &chains {
            for descriptor in self.read_descriptors(chain)? {
                push_unique(&mut sources, descriptor);
            }
        }
        for source in &writes {
            push_unique(&mut sources, self.write_descriptor(*source)?);
        }

        let (responses, errors) = self.compile_conditions(endpoint)?;
        Ok(EndpointPlan {
            name: endpoint.name.clone(),
            method: endpoint.method(),
            flow,
            chains,
            sources,
            responses,
            errors,
        })
    }

    fn compile_conditions(
        &self,
        endpoint: &EndpointDef,
    ) -> CompileResult<(Vec<CompiledResponse>, Vec<CompiledError>)> {
        let scope = ExprScope::global(self.symbols);
        let mut responses = Vec::with_capacity(endpoint.responses.len());
        for response in &endpoint.responses {
            let condition = match &response.condition {
                Some(expr) => Some(self.exprs.compile(expr, &scope)?),
                None => None,
            };
            responses.push(CompiledResponse {
                status: response.status,
                entity: response.schema.entity_name().map(str::to_string),
                condition,
            });
        }
        let mut errors = Vec::with_capacity(endpoint.errors.len());
        for error in &endpoint.errors {
            errors.push(CompiledError {
                status: error.status,
                message: error.message.clone(),
                condition: self.exprs.compile(&error.condition, &scope)?,
            });
        }
        Ok((responses, errors))
    }
}

/// The endpoint's local subgraph over the sources its flow selected.
fn subgraph_report(graph: &ModelGraph, plan: &EndpointPlan) -> CompileResult<SubgraphReport> {
    let endpoint = graph.require(NodeKind::Endpoint, &plan.name)?;
    let selected: Vec<&str> = plan
        .flow
        .read_sources
        .iter()
        .chain(&plan.flow.write_targets)
        .map(String::as_str)
        .collect();
    let view = endpoint_local_subgraph(graph, endpoint, Some(selected.as_slice()));
    Ok(SubgraphReport {
        endpoint: plan.name.clone(),
        dot: to_dot(graph, Some(&view)),
        dropped_sources: view.dropped_sources,
    })
}

/// Read sources no chain fetches from, whose entities were all left to the
/// endpoints producing computed parents.
fn covered_reads(
    graph: &ModelGraph,
    flow: &EndpointFlow,
    chains: &[ExecutionChain],
    skipped: &[NodeId],
) -> Vec<String> {
    let fetched: Vec<&str> = chains
        .iter()
        .flat_map(|chain| &chain.steps)
        .filter_map(|step| match &step.origin {
            Origin::Source { source } => Some(source.as_str()),
            _ => None,
        })
        .collect();
    flow.read_sources
        .iter()
        .filter(|name| !fetched.contains(&name.as_str()))
        .filter(|name| {
            graph.source(name).is_some_and(|id| {
                graph
                    .successors(id, EdgeKind::Provides)
                    .all(|entity| skipped.contains(&entity))
            })
        })
        .cloned()
        .collect()
}

/// Response entities, then entities read by guard and error conditions.
fn response_targets(graph: &ModelGraph, endpoint: &EndpointDef) -> Vec<NodeId> {
    let mut targets: Vec<NodeId> = Vec::new();
    let named = endpoint.response_entities().into_iter().map(str::to_string);
    let referenced = endpoint
        .conditions()
        .flat_map(free_names)
        .map(|name_ref| name_ref.name);
    for name in named.chain(referenced) {
        if let Some(id) = graph.entity(&name) {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
    }
    targets
}

/// Descriptors are keyed by (entity, address).
fn push_unique(sources: &mut Vec<SourceDescriptor>, descriptor: SourceDescriptor) {
    let duplicate = sources
        .iter()
        .any(|s| s.entity == descriptor.entity && s.address == descriptor.address);
    if !duplicate {
        sources.push(descriptor);
    }
}
