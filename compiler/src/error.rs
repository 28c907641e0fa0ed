//! Compiler error types.

use keel_ast::Span;
use thiserror::Error;

/// Errors that can occur during compilation. Every one aborts the build.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Model could not be loaded.
    #[error("Model error: {0}")]
    Ast(#[from] keel_ast::AstError),

    /// Graph construction or traversal error.
    #[error("Graph error: {0}")]
    Graph(#[from] keel_graph::GraphError),

    /// Expression compilation error.
    #[error("Expression error: {0}")]
    Expr(#[from] keel_expr::ExprError),

    /// Flow classification or policy error.
    #[error("Flow error: {0}")]
    Flow(#[from] keel_flow::FlowError),

    /// Plan serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint missing from the model.
    #[error("Unknown endpoint '{name}'")]
    UnknownEndpoint { name: String },

    /// Endpoints that need each other's output.
    #[error("Cyclic computed parent: {} at line {line}, column {column}", .path.join(" -> "))]
    CyclicComputedParent {
        path: Vec<String>,
        line: usize,
        column: usize,
    },

    /// Ancestor with no way to obtain its data, in strict mode.
    #[error(
        "Entity '{entity}' needed by '{needed_by}' has no source, producer or expressions at line {line}, column {column}"
    )]
    UnresolvedEntity {
        entity: String,
        needed_by: String,
        line: usize,
        column: usize,
    },
}

impl CompileError {
    pub fn cyclic_computed_parent(path: Vec<String>, span: Span) -> Self {
        Self::CyclicComputedParent {
            path,
            line: span.line,
            column: span.column,
        }
    }

    pub fn unresolved_entity(
        entity: impl Into<String>,
        needed_by: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnresolvedEntity {
            entity: entity.into(),
            needed_by: needed_by.into(),
            line: span.line,
            column: span.column,
        }
    }
}

/// Result type for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
