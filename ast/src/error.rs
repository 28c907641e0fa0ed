//! AST loading errors.

use thiserror::Error;

/// Errors raised while loading a model handed over by a front end.
#[derive(Debug, Error)]
pub enum AstError {
    /// Malformed or mistyped JSON.
    #[error("Invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for AST operations.
pub type AstResult<T> = Result<T, AstError>;
