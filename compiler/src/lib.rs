//! Keel Compiler
//!
//! Turn a parsed model into an execution plan.
//!
//! Responsibilities:
//! - Build and validate the model graph
//! - Classify every endpoint's flow and enforce HTTP safety
//! - Resolve each entity's origin and order entities into execution chains
//! - Compile attribute, condition and source parameter expressions
//! - Normalize external source calls into descriptors

mod chain;
mod compiler;
mod config;
mod error;
mod plan;
mod source;

pub use compiler::{compile, Compiler};
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
pub use plan::*;
