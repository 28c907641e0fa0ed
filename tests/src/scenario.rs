//! Scenario definition: a model, a compiler configuration and the
//! expectations on each endpoint.

use keel_ast::Model;
use keel_compiler::CompilerConfig;

use crate::assertion::{Assertion, Outcome};
use crate::error::{ScenarioError, ScenarioResult};
use crate::loader;
use crate::runner::Runner;

/// A step: one endpoint and what its plan must look like.
#[derive(Debug)]
pub struct Step {
    pub endpoint: String,
    pub assertion: Assertion,
}

/// A compilation scenario.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    model: Option<Model>,
    fixture: Option<String>,
    config: CompilerConfig,
    outcome: Outcome,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            fixture: None,
            config: CompilerConfig::default(),
            outcome: Outcome::Success,
            steps: Vec::new(),
        }
    }

    /// Use an in-memory model.
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Load the model from a JSON fixture, relative to the fixtures dir.
    pub fn fixture(mut self, path: impl Into<String>) -> Self {
        self.fixture = Some(path.into());
        self
    }

    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Expect compilation to fail with a message containing `text`.
    pub fn fails_with(mut self, text: impl Into<String>) -> Self {
        self.outcome = Outcome::Error(text.into());
        self
    }

    /// Expect compilation to fail with a message matching `pattern`.
    pub fn fails_matching(mut self, pattern: impl Into<String>) -> Self {
        self.outcome = Outcome::ErrorPattern(pattern.into());
        self
    }

    /// Add a step with an assertion on one endpoint.
    pub fn step<F>(mut self, endpoint: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Assertion) -> Assertion,
    {
        self.steps.push(Step {
            endpoint: endpoint.into(),
            assertion: f(Assertion::new()),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compiler_config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The model to compile: the in-memory one, else the fixture.
    pub fn load_model(&self) -> ScenarioResult<Model> {
        if let Some(ref model) = self.model {
            return Ok(model.clone());
        }
        match self.fixture {
            Some(ref path) => loader::load_model(&loader::fixture_path(path)),
            None => Err(ScenarioError::MissingModel {
                scenario: self.name.clone(),
            }),
        }
    }

    /// Run the scenario.
    pub fn run(&self) -> ScenarioResult<()> {
        Runner::new(self).run()
    }
}
