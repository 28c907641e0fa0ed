//! Keel Model Graph
//!
//! This crate materializes a model as a typed graph and answers the
//! structural questions the later phases ask:
//! - Node arena for entities, sources and endpoints
//! - Adjacency index: edges from/to a node, by kind
//! - Ancestor walks, distances and terminal entity lookup
//! - Endpoint-local subgraphs and cycle diagnostics
//! - Graphviz rendering

mod algo;
mod builder;
mod error;
mod graph;
mod index;
mod render;

pub use algo::*;
pub use builder::url_placeholders;
pub use error::{GraphError, GraphResult};
pub use graph::*;
pub use render::to_dot;
