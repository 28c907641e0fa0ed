//! Expression tree for computed attributes, guard conditions and source
//! parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span pointing at a line and column only.
    pub fn at(line: usize, column: usize) -> Self {
        Self {
            start: 0,
            end: 0,
            line,
            column,
        }
    }
}

/// Expression types.
///
/// The set of variants is the fixed front-end taxonomy; every consumer
/// matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Var(String, Span),
    /// Member access: base.name
    Member(Box<Expr>, String, Span),
    /// Index access: base[key]
    Index(Box<Expr>, Box<Expr>, Span),
    /// Function call
    Call(Call),
    /// Unary operation
    Unary(UnaryOp, Box<Expr>, Span),
    /// Arithmetic operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>, Span),
    /// Comparison
    Compare(CompareOp, Box<Expr>, Box<Expr>, Span),
    /// Short-circuit logical operation
    Logical(LogicalOp, Box<Expr>, Box<Expr>, Span),
    /// cond ? then : otherwise
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>, Span),
    /// params -> body
    Lambda(Lambda),
    /// [element for var in iter if cond]
    ListComp(Comprehension),
    /// {key: value for var in iter if cond}
    DictComp(DictComprehension),
    /// List literal: [a, b, c]
    List(Vec<Expr>, Span),
    /// Dict literal: {k: v}
    Dict(Vec<(Expr, Expr)>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span,
            Expr::Var(_, span) => *span,
            Expr::Member(_, _, span) => *span,
            Expr::Index(_, _, span) => *span,
            Expr::Call(call) => call.span,
            Expr::Unary(_, _, span) => *span,
            Expr::Binary(_, _, _, span) => *span,
            Expr::Compare(_, _, _, span) => *span,
            Expr::Logical(_, _, _, span) => *span,
            Expr::Ternary(_, _, _, span) => *span,
            Expr::Lambda(lambda) => lambda.span,
            Expr::ListComp(comp) => comp.span,
            Expr::DictComp(comp) => comp.span,
            Expr::List(_, span) => *span,
            Expr::Dict(_, span) => *span,
        }
    }

    /// Replace the span of the outermost node.
    pub fn with_span(mut self, span: Span) -> Self {
        match &mut self {
            Expr::Literal(lit) => lit.span = span,
            Expr::Var(_, s)
            | Expr::Member(_, _, s)
            | Expr::Index(_, _, s)
            | Expr::Unary(_, _, s)
            | Expr::Binary(_, _, _, s)
            | Expr::Compare(_, _, _, s)
            | Expr::Logical(_, _, _, s)
            | Expr::Ternary(_, _, _, s)
            | Expr::List(_, s)
            | Expr::Dict(_, s) => *s = span,
            Expr::Call(call) => call.span = span,
            Expr::Lambda(lambda) => lambda.span = span,
            Expr::ListComp(comp) => comp.span = span,
            Expr::DictComp(comp) => comp.span = span,
        }
        self
    }

    // ==================== CONSTRUCTORS ====================

    pub fn null() -> Self {
        Expr::Literal(Literal::new(LiteralKind::Null))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::new(LiteralKind::Bool(value)))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::new(LiteralKind::Int(value)))
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal(Literal::new(LiteralKind::Float(value)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::new(LiteralKind::String(value.into())))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into(), Span::default())
    }

    /// Dotted path: `Expr::path("Order.customer.name")`.
    pub fn path(dotted: &str) -> Self {
        let mut parts = dotted.split('.');
        let head = Expr::var(parts.next().unwrap_or_default());
        parts.fold(head, |base, name| Expr::member(base, name))
    }

    pub fn member(base: Expr, name: impl Into<String>) -> Self {
        Expr::Member(Box::new(base), name.into(), Span::default())
    }

    pub fn index(base: Expr, key: Expr) -> Self {
        Expr::Index(Box::new(base), Box::new(key), Span::default())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Call {
            name: name.into(),
            args,
            span: Span::default(),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand), Span::default())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right), Span::default())
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare(op, Box::new(left), Box::new(right), Span::default())
    }

    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Expr::Logical(op, Box::new(left), Box::new(right), Span::default())
    }

    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Ternary(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
            Span::default(),
        )
    }

    pub fn lambda<S: Into<String>>(params: impl IntoIterator<Item = S>, body: Expr) -> Self {
        Expr::Lambda(Lambda {
            params: params.into_iter().map(Into::into).collect(),
            body: Box::new(body),
            span: Span::default(),
        })
    }

    pub fn list_comp(
        element: Expr,
        var: impl Into<String>,
        iter: Expr,
        cond: Option<Expr>,
    ) -> Self {
        Expr::ListComp(Comprehension {
            element: Box::new(element),
            var: var.into(),
            iter: Box::new(iter),
            cond: cond.map(Box::new),
            span: Span::default(),
        })
    }

    pub fn dict_comp(
        key: Expr,
        value: Expr,
        var: impl Into<String>,
        iter: Expr,
        cond: Option<Expr>,
    ) -> Self {
        Expr::DictComp(DictComprehension {
            key: Box::new(key),
            value: Box::new(value),
            var: var.into(),
            iter: Box::new(iter),
            cond: cond.map(Box::new),
            span: Span::default(),
        })
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Expr::List(items, Span::default())
    }

    pub fn dict(entries: Vec<(Expr, Expr)>) -> Self {
        Expr::Dict(entries, Span::default())
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LiteralKind,
    #[serde(default)]
    pub span: Span,
}

impl Literal {
    pub fn new(kind: LiteralKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralKind::Null => write!(f, "null"),
            LiteralKind::Bool(b) => write!(f, "{}", b),
            LiteralKind::Int(i) => write!(f, "{}", i),
            LiteralKind::Float(fl) => write!(f, "{}", fl),
            LiteralKind::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::FloorDiv => write!(f, "//"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Pow => write!(f, "**"),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::LtEq => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::GtEq => write!(f, ">="),
            CompareOp::In => write!(f, "in"),
            CompareOp::NotIn => write!(f, "not in"),
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

/// Function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Anonymous function, only meaningful as a call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// List comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub element: Box<Expr>,
    pub var: String,
    pub iter: Box<Expr>,
    pub cond: Option<Box<Expr>>,
    #[serde(default)]
    pub span: Span,
}

/// Dict comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictComprehension {
    pub key: Box<Expr>,
    pub value: Box<Expr>,
    pub var: String,
    pub iter: Box<Expr>,
    pub cond: Option<Box<Expr>>,
    #[serde(default)]
    pub span: Span,
}
