//! Compiler configuration.

use keel_expr::FunctionRegistry;

/// Options for one compilation.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Functions model expressions may call.
    pub functions: FunctionRegistry,
    /// Fail instead of dropping ancestors that carry no data.
    pub strict_abstract_entities: bool,
    /// Report every graph cycle in the plan diagnostics.
    pub collect_cycles: bool,
    /// Render each endpoint's local subgraph into the plan diagnostics.
    pub render_subgraphs: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            functions: FunctionRegistry::standard(),
            strict_abstract_entities: false,
            collect_cycles: true,
            render_subgraphs: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_strict_abstract_entities(mut self, strict: bool) -> Self {
        self.strict_abstract_entities = strict;
        self
    }

    pub fn with_collect_cycles(mut self, collect: bool) -> Self {
        self.collect_cycles = collect;
        self
    }

    pub fn with_render_subgraphs(mut self, render: bool) -> Self {
        self.render_subgraphs = render;
        self
    }
}
