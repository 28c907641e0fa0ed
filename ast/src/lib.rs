//! Keel AST
//!
//! The contract between the front-end parser and the compiler core:
//! - Source locations (Span)
//! - The closed expression tree used by computed attributes and conditions
//! - Entity, Source and Endpoint definitions making up a Model
//! - A fluent builder for assembling models in code
//! - A static walk collecting the free names an expression refers to

mod builder;
mod error;
mod expr;
mod model;
mod visit;

pub use builder::*;
pub use error::{AstError, AstResult};
pub use expr::*;
pub use model::*;
pub use visit::{free_names, NameRef};
