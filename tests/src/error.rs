//! Error types for scenario runs.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read fixture {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Scenario '{scenario}' has no model")]
    MissingModel { scenario: String },

    #[error("Endpoint '{endpoint}' is not in the compiled plan")]
    EndpointNotFound { endpoint: String },

    #[error("Assertion failed at '{step}': {message}")]
    AssertionFailed { step: String, message: String },
}

impl ScenarioError {
    pub fn file_read(path: &Path, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn model_load(path: &Path, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn endpoint_not_found(endpoint: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            endpoint: endpoint.into(),
        }
    }

    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Result type for scenario runs.
pub type ScenarioResult<T> = Result<T, ScenarioError>;
