//! Execution chain construction: origin resolution and ordering.

use crate::compiler::Session;
use crate::{
    AttributePlan, ChainPhase, ChainStep, CompileError, CompileResult, DroppedEntity,
    ExecutionChain, Origin,
};
use keel_ast::{EndpointDef, EntityDef};
use keel_core::NodeId;
use keel_expr::ExprScope;
use keel_graph::{dependency_closure, EdgeKind, GraphError};
use std::collections::HashSet;

/// What one chain may draw on.
pub(crate) struct ChainContext<'a> {
    /// None when a chain is built for a bare entity.
    pub endpoint: Option<&'a EndpointDef>,
    /// Sources the flow classifier admitted for this phase.
    pub sources: Vec<NodeId>,
    /// Entity populated from the incoming request.
    pub request: Option<NodeId>,
    pub phase: ChainPhase,
    /// Filled in while building: entities left to the endpoints producing
    /// computed parents.
    pub skipped: Vec<NodeId>,
}

impl<'a> Session<'a> {
    /// Chain computing `targets`: the union of their dependency closures,
    /// each member after everything it reads. Entities another endpoint
    /// produces are taken from it, so their own closures are left out.
    pub(crate) fn build_chain(
        &mut self,
        ctx: &mut ChainContext<'a>,
        targets: &[NodeId],
    ) -> CompileResult<ExecutionChain> {
        let needed = self.reach(ctx, targets, true);
        let mut skipped: Vec<NodeId> = self
            .reach(ctx, targets, false)
            .into_iter()
            .filter(|e| !needed.contains(e))
            .collect();
        skipped.sort();
        ctx.skipped.extend(skipped);

        let mut members: Vec<NodeId> = Vec::new();
        let mut pending: Vec<NodeId> = Vec::new();
        for target in targets {
            self.collect(ctx, *target, &needed, &mut members, &mut pending)?;
        }

        let mut steps = Vec::with_capacity(members.len());
        for member in members {
            let Some(origin) = self.resolve_origin(ctx, member, targets)? else {
                continue;
            };
            steps.push(self.step(member, origin)?);
        }

        tracing::debug!(
            endpoint = ctx.endpoint.map(|e| e.name.as_str()).unwrap_or_default(),
            phase = ?ctx.phase,
            steps = steps.len(),
            "chain built"
        );
        Ok(ExecutionChain {
            phase: ctx.phase,
            steps,
        })
    }

    /// Entities reachable from `targets` over what they read. With
    /// `stop_at_parents`, computed parents are kept but not walked through.
    fn reach(
        &self,
        ctx: &ChainContext<'a>,
        targets: &[NodeId],
        stop_at_parents: bool,
    ) -> HashSet<NodeId> {
        let graph = self.graph;
        let mut reached = HashSet::new();
        let mut stack: Vec<NodeId> = targets.iter().rev().copied().collect();
        while let Some(entity) = stack.pop() {
            if !reached.insert(entity) {
                continue;
            }
            if stop_at_parents && self.computed_parent(ctx, entity, targets).is_some() {
                continue;
            }
            stack.extend(
                graph
                    .edges_to(entity, None)
                    .filter(|e| e.kind.is_entity_dependency())
                    .map(|e| e.from),
            );
            if let Some(source) = self.fetching_source(ctx, entity) {
                stack.extend(graph.predecessors(source, EdgeKind::ParamDependency));
            }
        }
        reached
    }

    /// Append the needed part of `entity`'s dependency closure to `members`.
    /// Entities a fetching source's parameters read are placed before what
    /// it fetches. A parameter reading an entity still being placed is a
    /// cycle.
    fn collect(
        &self,
        ctx: &ChainContext<'a>,
        entity: NodeId,
        needed: &HashSet<NodeId>,
        members: &mut Vec<NodeId>,
        pending: &mut Vec<NodeId>,
    ) -> CompileResult<()> {
        let graph = self.graph;
        for member in dependency_closure(graph, entity)? {
            if !needed.contains(&member) || members.contains(&member) {
                continue;
            }
            pending.push(member);
            if let Some(source) = self.fetching_source(ctx, member) {
                for input in graph.predecessors(source, EdgeKind::ParamDependency) {
                    let closure = dependency_closure(graph, input)?;
                    if let Some(start) = pending.iter().position(|p| closure.contains(p)) {
                        let mut path: Vec<NodeId> = pending[start..].to_vec();
                        path.push(source);
                        if input != pending[start] {
                            path.push(input);
                        }
                        path.push(pending[start]);
                        let path = path.iter().map(|n| graph.name(*n).to_string()).collect();
                        return Err(GraphError::cycle(path, graph.node(source).span).into());
                    }
                    self.collect(ctx, input, needed, members, pending)?;
                }
            }
            pending.pop();
            members.push(member);
        }
        Ok(())
    }

    /// The allowed source providing `entity`, if any.
    fn fetching_source(&self, ctx: &ChainContext<'a>, entity: NodeId) -> Option<NodeId> {
        self.graph
            .predecessors(entity, EdgeKind::Provides)
            .find(|s| ctx.sources.contains(s))
    }

    /// Where `entity` gets its data, or None when nothing supplies it and
    /// it is dropped from the chain.
    fn resolve_origin(
        &mut self,
        ctx: &ChainContext<'a>,
        entity: NodeId,
        targets: &[NodeId],
    ) -> CompileResult<Option<Origin>> {
        let graph = self.graph;
        let model = self.model;
        let name = graph.name(entity);
        let def = model.entity(name);

        if let Some(source) = self.fetching_source(ctx, entity) {
            return Ok(Some(Origin::Source {
                source: graph.name(source).to_string(),
            }));
        }

        if self.is_requested(ctx, entity) {
            return Ok(Some(Origin::Request));
        }

        if let Some(producer) = self.computed_parent(ctx, entity, targets) {
            self.plan_endpoint(&producer)?;
            return Ok(Some(Origin::ComputedParent { endpoint: producer }));
        }

        if targets.contains(&entity) || def.is_some_and(EntityDef::has_expressions) {
            return Ok(Some(Origin::Inline));
        }
        if def.is_some_and(|d| !d.attributes.is_empty()) {
            return Ok(Some(Origin::PassThrough));
        }

        let needed_by = match ctx.endpoint {
            Some(endpoint) => endpoint.name.clone(),
            None => targets
                .first()
                .map(|t| graph.name(*t).to_string())
                .unwrap_or_default(),
        };
        if self.config.strict_abstract_entities {
            let span = def.map(|d| d.span).unwrap_or_default();
            return Err(CompileError::unresolved_entity(name, needed_by, span));
        }
        tracing::warn!(entity = %name, needed_by = %needed_by, "dropping entity with no data");
        let dropped = DroppedEntity {
            entity: name.to_string(),
            needed_by,
        };
        if !self.dropped.contains(&dropped) {
            self.dropped.push(dropped);
        }
        Ok(None)
    }

    fn is_requested(&self, ctx: &ChainContext<'a>, entity: NodeId) -> bool {
        ctx.request == Some(entity)
            || self
                .model
                .entity(self.graph.name(entity))
                .is_some_and(EntityDef::has_decorators)
    }

    /// The endpoint supplying `entity` when no allowed source or request
    /// does and the chain is not building it as a target.
    fn computed_parent(
        &self,
        ctx: &ChainContext<'a>,
        entity: NodeId,
        targets: &[NodeId],
    ) -> Option<String> {
        if targets.contains(&entity)
            || self.fetching_source(ctx, entity).is_some()
            || self.is_requested(ctx, entity)
        {
            return None;
        }
        self.producer_of(ctx, self.graph.name(entity))
    }

    /// First other endpoint, in declaration order, that returns `entity`.
    fn producer_of(&self, ctx: &ChainContext<'a>, entity: &str) -> Option<String> {
        let current = ctx.endpoint.map(|e| e.name.as_str());
        self.model
            .endpoints
            .iter()
            .filter(|e| Some(e.name.as_str()) != current)
            .find(|e| e.response_entities().contains(&entity))
            .map(|e| e.name.clone())
    }

    fn step(&self, entity: NodeId, origin: Origin) -> CompileResult<ChainStep> {
        let name = self.graph.name(entity);
        let facts = self.graph.facts(entity);
        let attributes = match (&origin, self.model.entity(name)) {
            (Origin::ComputedParent { .. }, _) | (_, None) => Vec::new(),
            (_, Some(def)) => self.attribute_plans(def)?,
        };
        Ok(ChainStep {
            entity: name.to_string(),
            origin,
            identity_anchor: facts
                .map(|f| f.identity_anchor.clone())
                .unwrap_or_else(|| name.to_string()),
            composite: facts.is_some_and(|f| f.composite),
            attributes,
        })
    }

    /// Attributes the step populates itself, in declaration order.
    pub(crate) fn attribute_plans(&self, def: &EntityDef) -> CompileResult<Vec<AttributePlan>> {
        let mut plans = Vec::new();
        for attribute in &def.attributes {
            if let Some(expr) = &attribute.expr {
                let scope = ExprScope::for_attribute(self.symbols, &def.name, &attribute.name)?;
                plans.push(AttributePlan {
                    name: attribute.name.clone(),
                    expression: Some(self.exprs.compile(expr, &scope)?),
                    decorator: None,
                });
            } else if let Some(decorator) = &attribute.decorator {
                plans.push(AttributePlan {
                    name: attribute.name.clone(),
                    expression: None,
                    decorator: Some(decorator.clone()),
                });
            }
        }
        Ok(plans)
    }
}
