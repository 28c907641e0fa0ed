//! Keel Flow Classifier
//!
//! Decides, per endpoint, which external sources are read and which are
//! written, and from that the endpoint's execution phase:
//! - COMPUTE_ONLY: nothing external
//! - READ: fetch, then compute
//! - WRITE: compute, then write
//! - READ_WRITE: fetch, compute, write, then build the response
//!
//! The HTTP-safety policy is a separate check over the classifier output.

mod classify;
mod error;
mod policy;

pub use classify::{classify, classify_all, EndpointFlow, FlowKind};
pub use error::{FlowError, FlowResult};
pub use policy::check_http_safety;
