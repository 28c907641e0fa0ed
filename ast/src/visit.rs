//! Static walk over expressions.

use crate::{Expr, Span};
use std::collections::HashSet;

/// A free identifier and where it first occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub name: String,
    pub span: Span,
}

/// Collect every identifier not bound by an enclosing lambda or
/// comprehension, first occurrence only, in traversal order.
pub fn free_names(expr: &Expr) -> Vec<NameRef> {
    let mut collector = FreeNames::default();
    collector.visit(expr);
    collector.names
}

#[derive(Default)]
struct FreeNames {
    bound: Vec<String>,
    seen: HashSet<String>,
    names: Vec<NameRef>,
}

impl FreeNames {
    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Var(name, span) => {
                if !self.bound.contains(name) && self.seen.insert(name.clone()) {
                    self.names.push(NameRef {
                        name: name.clone(),
                        span: *span,
                    });
                }
            }
            Expr::Member(base, _, _) => self.visit(base),
            Expr::Index(base, key, _) => {
                self.visit(base);
                self.visit(key);
            }
            Expr::Call(call) => {
                for arg in &call.args {
                    self.visit(arg);
                }
            }
            Expr::Unary(_, operand, _) => self.visit(operand),
            Expr::Binary(_, left, right, _)
            | Expr::Compare(_, left, right, _)
            | Expr::Logical(_, left, right, _) => {
                self.visit(left);
                self.visit(right);
            }
            Expr::Ternary(cond, then, otherwise, _) => {
                self.visit(cond);
                self.visit(then);
                self.visit(otherwise);
            }
            Expr::Lambda(lambda) => {
                let depth = self.bound.len();
                self.bound.extend(lambda.params.iter().cloned());
                self.visit(&lambda.body);
                self.bound.truncate(depth);
            }
            Expr::ListComp(comp) => {
                // The iterable is evaluated outside the loop binding.
                self.visit(&comp.iter);
                self.bound.push(comp.var.clone());
                self.visit(&comp.element);
                if let Some(cond) = &comp.cond {
                    self.visit(cond);
                }
                self.bound.pop();
            }
            Expr::DictComp(comp) => {
                self.visit(&comp.iter);
                self.bound.push(comp.var.clone());
                self.visit(&comp.key);
                self.visit(&comp.value);
                if let Some(cond) = &comp.cond {
                    self.visit(cond);
                }
                self.bound.pop();
            }
            Expr::List(items, _) => {
                for item in items {
                    self.visit(item);
                }
            }
            Expr::Dict(entries, _) => {
                for (key, value) in entries {
                    self.visit(key);
                    self.visit(value);
                }
            }
        }
    }
}
