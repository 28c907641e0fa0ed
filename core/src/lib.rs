//! Keel Core Types
//!
//! This crate provides the foundational types shared by the Keel crates:
//! - Arena identifiers for the model graph (NodeId, EdgeId)
//! - Runtime values used when previewing compiled expressions (Value)

mod id;
mod value;

pub use id::*;
pub use value::*;
