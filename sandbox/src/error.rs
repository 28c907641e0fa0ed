//! Sandbox error types.

use keel_ast::Span;
use thiserror::Error;

/// Errors raised while checking or previewing target code.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Target code does not parse.
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// A node kind outside the allow-list.
    #[error("Disallowed node '{node}' at line {line}, column {column}")]
    DisallowedNode {
        node: &'static str,
        line: usize,
        column: usize,
    },

    /// A call whose target is not an allowed function name.
    #[error("Disallowed call target '{name}' at line {line}, column {column}")]
    DisallowedCall {
        name: String,
        line: usize,
        column: usize,
    },

    /// A reserved (dunder) identifier.
    #[error("Disallowed name '{name}' at line {line}, column {column}")]
    DisallowedName {
        name: String,
        line: usize,
        column: usize,
    },

    /// Unbound name during evaluation.
    #[error("Name '{name}' is not defined")]
    UndefinedName { name: String },

    /// Operand types do not support the operation.
    #[error("type error: {message}")]
    TypeError { message: String },

    /// Missing record key on strict subscript.
    #[error("Key error: '{key}'")]
    KeyError { key: String },

    /// List position out of range on strict subscript.
    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Division or modulo by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer result does not fit.
    #[error("Integer overflow in '{op}'")]
    Overflow { op: String },

    /// Builtin called with the wrong number of arguments.
    #[error("Function '{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// Unknown builtin during evaluation.
    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },
}

impl SandboxError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn disallowed_node(node: &'static str, span: Span) -> Self {
        Self::DisallowedNode {
            node,
            line: span.line,
            column: span.column,
        }
    }

    pub fn disallowed_call(name: impl Into<String>, span: Span) -> Self {
        Self::DisallowedCall {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn disallowed_name(name: impl Into<String>, span: Span) -> Self {
        Self::DisallowedName {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn undefined_name(name: impl Into<String>) -> Self {
        Self::UndefinedName { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn key_error(key: impl Into<String>) -> Self {
        Self::KeyError { key: key.into() }
    }

    pub fn overflow(op: impl Into<String>) -> Self {
        Self::Overflow { op: op.into() }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::Arity {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    /// True for errors found before evaluation.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::DisallowedNode { .. }
                | Self::DisallowedCall { .. }
                | Self::DisallowedName { .. }
        )
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
