//! Flow classification errors.

use keel_ast::Span;
use keel_graph::GraphError;
use thiserror::Error;

/// Errors that can occur while classifying an endpoint.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Graph walk failed.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Endpoint missing from the graph.
    #[error("Unknown endpoint '{name}'")]
    UnknownEndpoint { name: String },

    /// Mutation endpoint whose request never reaches a write source.
    #[error(
        "No mutation target found for endpoint '{endpoint}' from request '{request}' at line {line}, column {column}"
    )]
    NoTerminal {
        endpoint: String,
        request: String,
        line: usize,
        column: usize,
    },

    /// Safe HTTP verb whose flow writes.
    #[error(
        "Endpoint '{endpoint}' uses {method} but writes to {} at line {line}, column {column}",
        .sources.join(", ")
    )]
    UnsafeWrite {
        endpoint: String,
        method: String,
        sources: Vec<String>,
        line: usize,
        column: usize,
    },
}

impl FlowError {
    pub fn no_terminal(endpoint: impl Into<String>, request: impl Into<String>, span: Span) -> Self {
        Self::NoTerminal {
            endpoint: endpoint.into(),
            request: request.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unsafe_write(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        sources: Vec<String>,
        span: Span,
    ) -> Self {
        Self::UnsafeWrite {
            endpoint: endpoint.into(),
            method: method.into(),
            sources,
            line: span.line,
            column: span.column,
        }
    }
}

/// Result type for flow classification.
pub type FlowResult<T> = Result<T, FlowError>;
