//! Keel Expression Compiler
//!
//! Translates computed-attribute expressions into target code:
//! - Identifiers resolve only against declared entities, sources, endpoints,
//!   sibling attributes and lambda/comprehension bindings
//! - Member and index access compile to the defensive `_get` accessor
//! - Calls resolve through an injected, immutable function registry
//! - Every result is re-parsed and checked against the sandbox allow-list

mod compiler;
mod error;
mod registry;
mod scope;
mod symbols;

pub use compiler::ExprCompiler;
pub use error::{ExprError, ExprResult};
pub use registry::{Arity, FunctionDef, FunctionRegistry, RegistryBuilder, SAFE_GET};
pub use scope::ExprScope;
pub use symbols::{EntitySymbol, Symbols};
