//! Expression → target code.

use crate::scope::Current;
use crate::{ExprError, ExprResult, ExprScope, FunctionRegistry, SAFE_GET};
use keel_ast::{
    BinaryOp, Call, Comprehension, DictComprehension, Expr, Lambda, LiteralKind, LogicalOp, Span,
    UnaryOp,
};
use keel_sandbox::Validator;

// Binding strength of emitted forms, weakest first.
const LAMBDA: u8 = 1;
const TERNARY: u8 = 2;
const OR: u8 = 3;
const AND: u8 = 4;
const NOT: u8 = 5;
const COMPARE: u8 = 6;
const ADDITIVE: u8 = 7;
const MULTIPLICATIVE: u8 = 8;
const UNARY: u8 = 9;
const POWER: u8 = 10;
const ATOM: u8 = 11;

/// Emitted code with the precedence of its outermost form.
struct Code {
    text: String,
    prec: u8,
}

impl Code {
    fn new(text: String, prec: u8) -> Self {
        Self { text, prec }
    }

    fn atom(text: String) -> Self {
        Self::new(text, ATOM)
    }

    /// Text usable where at least `min` binding strength is required.
    fn at(self, min: u8) -> String {
        if self.prec < min {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

/// Compiles expressions against an injected function registry.
pub struct ExprCompiler<'r> {
    registry: &'r FunctionRegistry,
    validator: Validator,
}

impl<'r> ExprCompiler<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self {
            registry,
            validator: Validator::new(registry.callable_targets()),
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        self.registry
    }

    /// The validator compiled code is checked with.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Compile `expr` in `scope` and verify the result.
    pub fn compile(&self, expr: &Expr, scope: &ExprScope) -> ExprResult<String> {
        let mut scope = scope.clone();
        let code = self.emit(expr, &mut scope)?.text;
        self.validator
            .check(&code)
            .map_err(|e| ExprError::disallowed_shape(code.clone(), e, expr.span()))?;
        Ok(code)
    }

    fn emit(&self, expr: &Expr, scope: &mut ExprScope) -> ExprResult<Code> {
        match expr {
            Expr::Literal(lit) => emit_literal(&lit.kind, lit.span),
            Expr::Var(name, span) => self.emit_var(name, *span, scope),
            Expr::Member(base, attr, span) => self.emit_member(base, attr, *span, scope),
            Expr::Index(base, key, _) => {
                let base = self.emit(base, scope)?.at(LAMBDA);
                let key = self.emit(key, scope)?.at(LAMBDA);
                Ok(Code::atom(format!("{}({}, {})", SAFE_GET, base, key)))
            }
            Expr::Call(call) => self.emit_call(call, scope),
            Expr::Unary(op, operand, _) => {
                let (symbol, prec) = match op {
                    UnaryOp::Not => ("not ", NOT),
                    UnaryOp::Neg => ("-", UNARY),
                    UnaryOp::Pos => ("+", UNARY),
                };
                let operand = self.emit(operand, scope)?.at(prec);
                Ok(Code::new(format!("{}{}", symbol, operand), prec))
            }
            Expr::Binary(op, left, right, _) => {
                let prec = binary_prec(*op);
                // `**` is right-associative and its base must be an atom so
                // that a signed base keeps its grouping.
                let (left_min, right_min) = if *op == BinaryOp::Pow {
                    (ATOM, UNARY)
                } else {
                    (prec, prec + 1)
                };
                let left = self.emit(left, scope)?.at(left_min);
                let right = self.emit(right, scope)?.at(right_min);
                Ok(Code::new(format!("{} {} {}", left, op, right), prec))
            }
            Expr::Compare(op, left, right, _) => {
                // Operands bind tighter than comparison so that no chain forms.
                let left = self.emit(left, scope)?.at(COMPARE + 1);
                let right = self.emit(right, scope)?.at(COMPARE + 1);
                Ok(Code::new(format!("{} {} {}", left, op, right), COMPARE))
            }
            Expr::Logical(op, left, right, _) => {
                let (word, prec) = match op {
                    LogicalOp::And => ("and", AND),
                    LogicalOp::Or => ("or", OR),
                };
                let left = self.emit(left, scope)?.at(prec);
                let right = self.emit(right, scope)?.at(prec + 1);
                Ok(Code::new(format!("{} {} {}", left, word, right), prec))
            }
            Expr::Ternary(cond, then, otherwise, _) => {
                let then = self.emit(then, scope)?.at(OR);
                let cond = self.emit(cond, scope)?.at(OR);
                let otherwise = self.emit(otherwise, scope)?.at(TERNARY);
                Ok(Code::new(
                    format!("{} if {} else {}", then, cond, otherwise),
                    TERNARY,
                ))
            }
            Expr::Lambda(lambda) => self.emit_lambda(lambda, scope),
            Expr::ListComp(comp) => self.emit_list_comp(comp, scope),
            Expr::DictComp(comp) => self.emit_dict_comp(comp, scope),
            Expr::List(items, _) => {
                let items = items
                    .iter()
                    .map(|item| Ok(self.emit(item, scope)?.at(LAMBDA)))
                    .collect::<ExprResult<Vec<_>>>()?;
                Ok(Code::atom(format!("[{}]", items.join(", "))))
            }
            Expr::Dict(entries, _) => {
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.emit(key, scope)?.at(TERNARY);
                    let value = self.emit(value, scope)?.at(LAMBDA);
                    parts.push(format!("{}: {}", key, value));
                }
                Ok(Code::atom(format!("{{{}}}", parts.join(", "))))
            }
        }
    }

    /// Bare identifier resolution, in order: bound variable, sibling
    /// attribute, parent alias, declared entity/source/endpoint.
    fn emit_var(&self, name: &str, span: Span, scope: &ExprScope) -> ExprResult<Code> {
        if scope.is_bound(name) {
            return Ok(Code::atom(name.to_string()));
        }
        if let Some(current) = scope.current() {
            if let Some(index) = current.entity.attribute_index(name) {
                check_ready(current, name, index, span)?;
                return Ok(Code::atom(subscript(&current.entity.name, name)));
            }
            if let Some(parent) = current.entity.aliases.get(name) {
                return Ok(Code::atom(parent.clone()));
            }
        }
        if scope.symbols().is_declared(name) {
            return Ok(Code::atom(name.to_string()));
        }
        Err(ExprError::unresolved_reference(name, span))
    }

    fn emit_member(
        &self,
        base: &Expr,
        attr: &str,
        span: Span,
        scope: &mut ExprScope,
    ) -> ExprResult<Code> {
        if let Expr::Var(name, _) = base {
            if let Some(entity) = scope.entity_named(name) {
                match scope.current() {
                    Some(current) if current.entity.name == entity.name => {
                        // Own attributes must already be computed; inherited
                        // ones come from resolved ancestors.
                        if let Some(index) = entity.attribute_index(attr) {
                            check_ready(current, attr, index, span)?;
                        } else if !scope.symbols().has_attribute(&entity.name, attr) {
                            return Err(ExprError::unknown_attribute(attr, &entity.name, span));
                        }
                    }
                    _ => {
                        if !scope.symbols().has_attribute(&entity.name, attr) {
                            return Err(ExprError::unknown_attribute(attr, &entity.name, span));
                        }
                    }
                }
                return Ok(Code::atom(subscript(&entity.name, attr)));
            }
        }
        let base = self.emit(base, scope)?.at(LAMBDA);
        Ok(Code::atom(format!(
            "{}({}, {})",
            SAFE_GET,
            base,
            quote(attr)
        )))
    }

    fn emit_call(&self, call: &Call, scope: &mut ExprScope) -> ExprResult<Code> {
        let def = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ExprError::unknown_function(&call.name, call.span))?;
        if !def.arity.accepts(call.args.len()) {
            return Err(ExprError::arity_mismatch(
                &call.name,
                def.arity.to_string(),
                call.args.len(),
                call.span,
            ));
        }
        let args = call
            .args
            .iter()
            .map(|arg| Ok(self.emit(arg, scope)?.at(LAMBDA)))
            .collect::<ExprResult<Vec<_>>>()?;
        Ok(Code::atom(format!("{}({})", def.target, args.join(", "))))
    }

    fn emit_lambda(&self, lambda: &Lambda, scope: &mut ExprScope) -> ExprResult<Code> {
        scope.push();
        for param in &lambda.params {
            scope.bind(param.clone());
        }
        let body = self.emit(&lambda.body, scope);
        scope.pop();
        let body = body?.at(LAMBDA);
        let text = if lambda.params.is_empty() {
            format!("lambda: {}", body)
        } else {
            format!("lambda {}: {}", lambda.params.join(", "), body)
        };
        Ok(Code::new(text, LAMBDA))
    }

    fn emit_list_comp(&self, comp: &Comprehension, scope: &mut ExprScope) -> ExprResult<Code> {
        let iter = self.emit(&comp.iter, scope)?.at(OR);
        scope.push();
        scope.bind(comp.var.clone());
        let parts = (|| -> ExprResult<_> {
            let element = self.emit(&comp.element, scope)?.at(TERNARY);
            let cond = self.emit_filter(comp.cond.as_deref(), scope)?;
            Ok((element, cond))
        })();
        scope.pop();
        let (element, cond) = parts?;
        Ok(Code::atom(format!(
            "[{} for {} in {}{}]",
            element, comp.var, iter, cond
        )))
    }

    fn emit_dict_comp(
        &self,
        comp: &DictComprehension,
        scope: &mut ExprScope,
    ) -> ExprResult<Code> {
        let iter = self.emit(&comp.iter, scope)?.at(OR);
        scope.push();
        scope.bind(comp.var.clone());
        let parts = (|| -> ExprResult<_> {
            let key = self.emit(&comp.key, scope)?.at(TERNARY);
            let value = self.emit(&comp.value, scope)?.at(TERNARY);
            let cond = self.emit_filter(comp.cond.as_deref(), scope)?;
            Ok((key, value, cond))
        })();
        scope.pop();
        let (key, value, cond) = parts?;
        Ok(Code::atom(format!(
            "{{{}: {} for {} in {}{}}}",
            key, value, comp.var, iter, cond
        )))
    }

    fn emit_filter(&self, cond: Option<&Expr>, scope: &mut ExprScope) -> ExprResult<String> {
        match cond {
            Some(cond) => Ok(format!(" if {}", self.emit(cond, scope)?.at(OR))),
            None => Ok(String::new()),
        }
    }
}

fn check_ready(current: Current<'_>, referenced: &str, index: usize, span: Span) -> ExprResult<()> {
    if index < current.position {
        Ok(())
    } else {
        Err(ExprError::forward_self_reference(
            &current.entity.name,
            current.attribute(),
            referenced,
            span,
        ))
    }
}

fn subscript(entity: &str, attr: &str) -> String {
    format!("{}[{}]", entity, quote(attr))
}

fn emit_literal(kind: &LiteralKind, span: Span) -> ExprResult<Code> {
    Ok(match kind {
        LiteralKind::Null => Code::atom("None".to_string()),
        LiteralKind::Bool(true) => Code::atom("True".to_string()),
        LiteralKind::Bool(false) => Code::atom("False".to_string()),
        LiteralKind::Int(i) => signed(i.to_string()),
        LiteralKind::Float(f) => {
            if !f.is_finite() {
                return Err(ExprError::invalid_literal(f.to_string(), span));
            }
            signed(format!("{:?}", f))
        }
        LiteralKind::String(s) => Code::atom(quote(s)),
    })
}

/// Negative numbers read as a unary minus in target code.
fn signed(text: String) -> Code {
    let prec = if text.starts_with('-') { UNARY } else { ATOM };
    Code::new(text, prec)
}

/// Single-quoted target string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn binary_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod => MULTIPLICATIVE,
        BinaryOp::Pow => POWER,
    }
}
