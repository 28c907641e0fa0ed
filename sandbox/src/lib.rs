//! Keel Sandbox
//!
//! The safety net behind the expression compiler. Generated target code is
//! re-parsed here and every node is checked against a fixed allow-list
//! before it is accepted. The same tree can then be previewed against
//! sample data with the runtime semantics the generated backend uses.

pub mod ast;
mod builtins;
mod error;
mod eval;
mod lexer;
mod parser;
mod validate;

pub use ast::{NodeKind, PyExpr};
pub use error::{SandboxError, SandboxResult};
pub use eval::{Env, Evaluator};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;
pub use validate::{Validator, ALLOWED_NODES};

use keel_core::Value;

/// Check `code` against `validator`, then evaluate it under `env`.
pub fn preview(validator: &Validator, code: &str, env: &mut Env) -> SandboxResult<Value> {
    let expr = validator.check(code)?;
    Evaluator::new().eval(&expr, env)
}
