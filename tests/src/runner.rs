//! Scenario runner.

use keel_compiler::Compiler;

use crate::error::{ScenarioError, ScenarioResult};
use crate::scenario::Scenario;

/// Runs a scenario against the compiler.
pub struct Runner<'s> {
    scenario: &'s Scenario,
}

impl<'s> Runner<'s> {
    /// Create a new runner for a scenario.
    pub fn new(scenario: &'s Scenario) -> Self {
        Self { scenario }
    }

    /// Run the scenario.
    pub fn run(&self) -> ScenarioResult<()> {
        // 1. Load the model
        let model = self.scenario.load_model()?;

        // 2. Compile it
        let compiler = Compiler::new(self.scenario.compiler_config().clone());
        let plan = match compiler.compile(&model) {
            Ok(plan) => plan,
            Err(e) => {
                return self
                    .scenario
                    .outcome()
                    .verify_error(self.scenario.name(), &e.to_string())
            }
        };
        if self.scenario.outcome().expects_error() {
            return Err(ScenarioError::assertion_failed(
                self.scenario.name(),
                format!("expected {:?}, but compilation succeeded", self.scenario.outcome()),
            ));
        }

        // 3. Verify each endpoint
        for step in self.scenario.steps() {
            let endpoint = plan
                .endpoint(&step.endpoint)
                .ok_or_else(|| ScenarioError::endpoint_not_found(&step.endpoint))?;
            step.assertion.verify(&step.endpoint, endpoint)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use crate::scenario::Scenario;
    use keel_flow::FlowKind;

    #[test]
    fn test_runner_reports_unexpected_success() {
        let scenario = Scenario::new("expects failure")
            .model(fixtures::derived())
            .fails_with("Cycle");

        assert!(scenario.run().is_err());
    }

    #[test]
    fn test_runner_reports_missing_endpoint() {
        let scenario = Scenario::new("missing")
            .model(fixtures::derived())
            .step("nope", |a| a.flow(FlowKind::Read));

        assert!(scenario.run().is_err());
    }
}
