//! Source descriptors: normalized calls to external sources.

use crate::compiler::Session;
use crate::{CompileResult, CompiledParam, ExecutionChain, Origin, SourceDescriptor, SourceRole};
use keel_ast::{Expr, ParamLocation, SourceDef};
use keel_core::NodeId;
use keel_expr::ExprScope;
use keel_graph::url_placeholders;

impl<'a> Session<'a> {
    /// Descriptors for the read sources a chain fetches from, in step order.
    /// Write sources are described once, by their write descriptor.
    pub(crate) fn read_descriptors(
        &self,
        chain: &ExecutionChain,
    ) -> CompileResult<Vec<SourceDescriptor>> {
        let mut descriptors = Vec::new();
        for step in &chain.steps {
            let Origin::Source { source } = &step.origin else {
                continue;
            };
            let Some(id) = self.graph.source(source) else {
                continue;
            };
            if self.graph.is_write_source(id) {
                continue;
            }
            if let Some(def) = self.model.source(source) {
                descriptors.push(self.describe(def, SourceRole::Read, &step.entity)?);
            }
        }
        Ok(descriptors)
    }

    /// Descriptor for a write target: the payload entity with its computed
    /// attributes compiled.
    pub(crate) fn write_descriptor(&self, source: NodeId) -> CompileResult<SourceDescriptor> {
        let name = self.graph.name(source);
        let Some(def) = self.model.source(name) else {
            return Err(keel_graph::GraphError::unknown_node("source", name).into());
        };
        let entity = def.consumes().or_else(|| def.provides()).unwrap_or_default();
        let mut descriptor = self.describe(def, SourceRole::Write, entity)?;
        if let Some(entity_def) = self.model.entity(entity) {
            descriptor.attributes = self
                .attribute_plans(entity_def)?
                .into_iter()
                .filter_map(|a| a.expression.map(|code| (a.name, code)))
                .collect();
        }
        Ok(descriptor)
    }

    fn describe(
        &self,
        def: &SourceDef,
        role: SourceRole,
        entity: &str,
    ) -> CompileResult<SourceDescriptor> {
        Ok(SourceDescriptor {
            source: def.name.clone(),
            role,
            entity: entity.to_string(),
            alias: snake_case(entity),
            address: def.address().to_string(),
            method: def.method_name().to_string(),
            headers: def.headers().to_vec(),
            params: self.compile_params(def)?,
            attributes: Vec::new(),
        })
    }

    /// Declared parameters, then url placeholders as path parameters.
    fn compile_params(&self, def: &SourceDef) -> CompileResult<Vec<CompiledParam>> {
        let scope = ExprScope::global(self.symbols);
        let mut params = Vec::new();
        for param in def.params() {
            params.push(CompiledParam {
                name: param.name.clone(),
                location: param.location,
                code: self.exprs.compile(&param.value, &scope)?,
            });
        }
        for (entity, attr) in url_placeholders(def.address()) {
            let expr = Expr::member(Expr::var(&entity), &attr).with_span(def.span);
            params.push(CompiledParam {
                name: format!("{}.{}", entity, attr),
                location: ParamLocation::Path,
                code: self.exprs.compile(&expr, &scope)?,
            });
        }
        Ok(params)
    }
}

/// `OrderLine` → `order_line`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}
