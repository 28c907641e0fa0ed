//! Keel integration test framework.
//!
//! Scenarios compile a fixture model and check the plan of each endpoint:
//!
//! ```ignore
//! Scenario::new("weather")
//!     .fixture("weather.json")
//!     .step("forecast", |a| a.flow(FlowKind::Read).reads(&["forecasts"]))
//!     .run()
//!     .unwrap();
//! ```

pub mod assertion;
pub mod error;
pub mod fixtures;
pub mod loader;
pub mod runner;
pub mod scenario;

pub mod prelude {
    pub use crate::assertion::{Assertion, Outcome};
    pub use crate::error::{ScenarioError, ScenarioResult};
    pub use crate::fixtures;
    pub use crate::scenario::Scenario;
    pub use keel_ast::{
        BinaryOp, CompareOp, Expr, HttpMethod, Model, ModelBuilder, ParamLocation, Schema, Span,
    };
    pub use keel_compiler::{
        compile, ChainPhase, CompileError, Compiler, CompilerConfig, Origin, SourceRole,
    };
    pub use keel_flow::{FlowError, FlowKind};
    pub use keel_graph::{GraphError, ModelGraph};
}
