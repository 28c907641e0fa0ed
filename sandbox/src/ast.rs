//! Parsed target code.

use keel_ast::Span;

/// A target-code expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum PyExpr {
    Constant(Constant, Span),
    Name(String, Span),
    BinOp(BinOp, Box<PyExpr>, Box<PyExpr>, Span),
    UnaryOp(UnaryOp, Box<PyExpr>, Span),
    /// Short-circuit chain: `a and b and c`
    BoolOp(BoolOp, Vec<PyExpr>, Span),
    /// Comparison chain: `a < b <= c`
    Compare(Box<PyExpr>, Vec<(CmpOp, PyExpr)>, Span),
    Call(Box<PyExpr>, Vec<PyExpr>, Span),
    Subscript(Box<PyExpr>, Box<PyExpr>, Span),
    Attribute(Box<PyExpr>, String, Span),
    List(Vec<PyExpr>, Span),
    Tuple(Vec<PyExpr>, Span),
    Dict(Vec<(PyExpr, PyExpr)>, Span),
    /// `body if test else orelse`
    IfExp(Box<PyExpr>, Box<PyExpr>, Box<PyExpr>, Span),
    ListComp(Box<PyExpr>, Generator, Span),
    DictComp(Box<PyExpr>, Box<PyExpr>, Generator, Span),
    Lambda(Vec<String>, Box<PyExpr>, Span),
}

/// `for target in iter if cond...`
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub target: String,
    pub iter: Box<PyExpr>,
    pub conds: Vec<PyExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    USub,
    UAdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

/// Node kinds, as checked against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Constant,
    Name,
    BinOp,
    UnaryOp,
    BoolOp,
    Compare,
    Call,
    Subscript,
    Attribute,
    List,
    Tuple,
    Dict,
    IfExp,
    ListComp,
    DictComp,
    Lambda,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant => "Constant",
            NodeKind::Name => "Name",
            NodeKind::BinOp => "BinOp",
            NodeKind::UnaryOp => "UnaryOp",
            NodeKind::BoolOp => "BoolOp",
            NodeKind::Compare => "Compare",
            NodeKind::Call => "Call",
            NodeKind::Subscript => "Subscript",
            NodeKind::Attribute => "Attribute",
            NodeKind::List => "List",
            NodeKind::Tuple => "Tuple",
            NodeKind::Dict => "Dict",
            NodeKind::IfExp => "IfExp",
            NodeKind::ListComp => "ListComp",
            NodeKind::DictComp => "DictComp",
            NodeKind::Lambda => "Lambda",
        }
    }
}

impl PyExpr {
    pub fn kind(&self) -> NodeKind {
        match self {
            PyExpr::Constant(..) => NodeKind::Constant,
            PyExpr::Name(..) => NodeKind::Name,
            PyExpr::BinOp(..) => NodeKind::BinOp,
            PyExpr::UnaryOp(..) => NodeKind::UnaryOp,
            PyExpr::BoolOp(..) => NodeKind::BoolOp,
            PyExpr::Compare(..) => NodeKind::Compare,
            PyExpr::Call(..) => NodeKind::Call,
            PyExpr::Subscript(..) => NodeKind::Subscript,
            PyExpr::Attribute(..) => NodeKind::Attribute,
            PyExpr::List(..) => NodeKind::List,
            PyExpr::Tuple(..) => NodeKind::Tuple,
            PyExpr::Dict(..) => NodeKind::Dict,
            PyExpr::IfExp(..) => NodeKind::IfExp,
            PyExpr::ListComp(..) => NodeKind::ListComp,
            PyExpr::DictComp(..) => NodeKind::DictComp,
            PyExpr::Lambda(..) => NodeKind::Lambda,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            PyExpr::Constant(_, span)
            | PyExpr::Name(_, span)
            | PyExpr::BinOp(_, _, _, span)
            | PyExpr::UnaryOp(_, _, span)
            | PyExpr::BoolOp(_, _, span)
            | PyExpr::Compare(_, _, span)
            | PyExpr::Call(_, _, span)
            | PyExpr::Subscript(_, _, span)
            | PyExpr::Attribute(_, _, span)
            | PyExpr::List(_, span)
            | PyExpr::Tuple(_, span)
            | PyExpr::Dict(_, span)
            | PyExpr::IfExp(_, _, _, span)
            | PyExpr::ListComp(_, _, span)
            | PyExpr::DictComp(_, _, _, span)
            | PyExpr::Lambda(_, _, span) => *span,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&PyExpr> {
        match self {
            PyExpr::Constant(..) | PyExpr::Name(..) => vec![],
            PyExpr::BinOp(_, left, right, _) => vec![&**left, &**right],
            PyExpr::UnaryOp(_, operand, _) => vec![&**operand],
            PyExpr::BoolOp(_, values, _) | PyExpr::List(values, _) | PyExpr::Tuple(values, _) => {
                values.iter().collect()
            }
            PyExpr::Compare(left, rest, _) => {
                let mut out = vec![&**left];
                out.extend(rest.iter().map(|(_, e)| e));
                out
            }
            PyExpr::Call(func, args, _) => {
                let mut out = vec![&**func];
                out.extend(args.iter());
                out
            }
            PyExpr::Subscript(base, key, _) => vec![&**base, &**key],
            PyExpr::Attribute(base, _, _) => vec![&**base],
            PyExpr::Dict(entries, _) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            PyExpr::IfExp(test, body, orelse, _) => vec![&**test, &**body, &**orelse],
            PyExpr::ListComp(element, gen, _) => {
                let mut out = vec![&*gen.iter, &**element];
                out.extend(gen.conds.iter());
                out
            }
            PyExpr::DictComp(key, value, gen, _) => {
                let mut out = vec![&*gen.iter, &**key, &**value];
                out.extend(gen.conds.iter());
                out
            }
            PyExpr::Lambda(_, body, _) => vec![&**body],
        }
    }
}
