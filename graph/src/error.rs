//! Graph construction and traversal errors.

use keel_ast::Span;
use thiserror::Error;

/// Errors that can occur while building or walking the model graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two declarations of the same kind share a name.
    #[error("Duplicate {kind} name '{name}' at line {line}, column {column}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        line: usize,
        column: usize,
    },

    /// Reference to an entity that is not declared.
    #[error("Unknown entity '{name}' at line {line}, column {column}")]
    UnknownEntity {
        name: String,
        line: usize,
        column: usize,
    },

    /// Lookup of a node that is not in the graph.
    #[error("Unknown {kind} '{name}'")]
    UnknownNode { kind: &'static str, name: String },

    /// Source parameter that is neither `Entity.attribute` nor a literal.
    #[error(
        "Parameter '{param}' of source '{source_name}' must be Entity.attribute or a literal at line {line}, column {column}"
    )]
    UnsupportedParamExpression {
        source_name: String,
        param: String,
        line: usize,
        column: usize,
    },

    /// Inheritance or data dependency cycle.
    #[error("Cycle detected: {} at line {line}, column {column}", .path.join(" -> "))]
    Cycle {
        path: Vec<String>,
        line: usize,
        column: usize,
    },
}

impl GraphError {
    pub fn duplicate_name(kind: &'static str, name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unknown_entity(name: impl Into<String>, span: Span) -> Self {
        Self::UnknownEntity {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unknown_node(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownNode {
            kind,
            name: name.into(),
        }
    }

    pub fn unsupported_param(
        source_name: impl Into<String>,
        param: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnsupportedParamExpression {
            source_name: source_name.into(),
            param: param.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn cycle(path: Vec<String>, span: Span) -> Self {
        Self::Cycle {
            path,
            line: span.line,
            column: span.column,
        }
    }
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
