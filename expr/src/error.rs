//! Expression compiler error types.

use keel_ast::Span;
use keel_sandbox::SandboxError;
use thiserror::Error;

/// Errors that can occur while compiling an expression.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Identifier that names nothing in scope.
    #[error("Unresolved reference '{name}' at line {line}, column {column}")]
    UnresolvedReference {
        name: String,
        line: usize,
        column: usize,
    },

    /// Attribute referring to itself or a later sibling.
    #[error(
        "Attribute '{entity}.{attribute}' references '{referenced}' which is not computed yet at line {line}, column {column}"
    )]
    ForwardSelfReference {
        entity: String,
        attribute: String,
        referenced: String,
        line: usize,
        column: usize,
    },

    /// `Entity.attr` where the entity has no such attribute.
    #[error("Unknown attribute '{attr}' on entity '{entity}' at line {line}, column {column}")]
    UnknownAttribute {
        attr: String,
        entity: String,
        line: usize,
        column: usize,
    },

    /// Call to a name missing from the registry.
    #[error("Unknown function '{name}' at line {line}, column {column}")]
    UnknownFunction {
        name: String,
        line: usize,
        column: usize,
    },

    /// Call with an argument count outside the registered arity.
    #[error(
        "Function '{name}' expects {expected} arguments, got {actual} at line {line}, column {column}"
    )]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
        line: usize,
        column: usize,
    },

    /// Literal that has no target-code spelling.
    #[error("Invalid literal {literal} at line {line}, column {column}")]
    InvalidLiteral {
        literal: String,
        line: usize,
        column: usize,
    },

    /// Generated code failed the sandbox check.
    #[error("Compiled code `{code}` rejected at line {line}, column {column}: {source}")]
    DisallowedShape {
        code: String,
        #[source]
        source: SandboxError,
        line: usize,
        column: usize,
    },

    /// Registry built with the same name twice.
    #[error("Duplicate function '{name}'")]
    DuplicateFunction { name: String },

    /// Registry target that is not a plain identifier.
    #[error("Invalid target '{target}' for function '{name}'")]
    InvalidTarget { name: String, target: String },
}

impl ExprError {
    pub fn unresolved_reference(name: impl Into<String>, span: Span) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn forward_self_reference(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        referenced: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::ForwardSelfReference {
            entity: entity.into(),
            attribute: attribute.into(),
            referenced: referenced.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unknown_attribute(attr: impl Into<String>, entity: impl Into<String>, span: Span) -> Self {
        Self::UnknownAttribute {
            attr: attr.into(),
            entity: entity.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unknown_function(name: impl Into<String>, span: Span) -> Self {
        Self::UnknownFunction {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn arity_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: usize,
        span: Span,
    ) -> Self {
        Self::ArityMismatch {
            name: name.into(),
            expected: expected.into(),
            actual,
            line: span.line,
            column: span.column,
        }
    }

    pub fn invalid_literal(literal: impl Into<String>, span: Span) -> Self {
        Self::InvalidLiteral {
            literal: literal.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn disallowed_shape(code: impl Into<String>, source: SandboxError, span: Span) -> Self {
        Self::DisallowedShape {
            code: code.into(),
            source,
            line: span.line,
            column: span.column,
        }
    }
}

/// Result type for expression compilation.
pub type ExprResult<T> = Result<T, ExprError>;
