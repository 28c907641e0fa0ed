//! Allow-list validation of parsed target code.

use crate::ast::{NodeKind, PyExpr};
use crate::{parser, SandboxError, SandboxResult};
use std::collections::HashSet;

/// Node kinds generated code may contain. Attribute access is absent:
/// member access always goes through the defensive accessor.
pub const ALLOWED_NODES: &[NodeKind] = &[
    NodeKind::Constant,
    NodeKind::Name,
    NodeKind::BinOp,
    NodeKind::UnaryOp,
    NodeKind::BoolOp,
    NodeKind::Compare,
    NodeKind::Call,
    NodeKind::Subscript,
    NodeKind::List,
    NodeKind::Tuple,
    NodeKind::Dict,
    NodeKind::IfExp,
    NodeKind::ListComp,
    NodeKind::DictComp,
    NodeKind::Lambda,
];

/// Checks target code against the node allow-list and a set of callable
/// names.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    allowed_calls: HashSet<String>,
}

impl Validator {
    pub fn new<S: Into<String>>(allowed_calls: impl IntoIterator<Item = S>) -> Self {
        Self {
            allowed_calls: allowed_calls.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows_call(&self, name: &str) -> bool {
        self.allowed_calls.contains(name)
    }

    /// Parse `code` and validate the resulting tree.
    pub fn check(&self, code: &str) -> SandboxResult<PyExpr> {
        let expr = parser::parse(code)?;
        self.validate(&expr)?;
        Ok(expr)
    }

    /// Walk the tree, rejecting any node outside the allow-list.
    pub fn validate(&self, expr: &PyExpr) -> SandboxResult<()> {
        let kind = expr.kind();
        if !ALLOWED_NODES.contains(&kind) {
            return Err(SandboxError::disallowed_node(kind.name(), expr.span()));
        }

        match expr {
            PyExpr::Name(name, span) if is_dunder(name) => {
                return Err(SandboxError::disallowed_name(name, *span));
            }
            PyExpr::Call(func, _, span) => match func.as_ref() {
                PyExpr::Name(name, _) if self.allows_call(name) => {}
                PyExpr::Name(name, _) => {
                    return Err(SandboxError::disallowed_call(name, *span));
                }
                other => {
                    return Err(SandboxError::disallowed_call(
                        other.kind().name(),
                        *span,
                    ));
                }
            },
            PyExpr::Lambda(params, _, span) => {
                if let Some(param) = params.iter().find(|p| is_dunder(p)) {
                    return Err(SandboxError::disallowed_name(param, *span));
                }
            }
            PyExpr::ListComp(_, generator, span) | PyExpr::DictComp(_, _, generator, span)
                if is_dunder(&generator.target) =>
            {
                return Err(SandboxError::disallowed_name(&generator.target, *span));
            }
            _ => {}
        }

        for child in expr.children() {
            self.validate(child)?;
        }
        Ok(())
    }
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}
