//! Assertion types and builders for verifying compiled endpoints.

use keel_compiler::{ChainPhase, EndpointPlan, Origin};
use keel_flow::FlowKind;

use crate::error::{ScenarioError, ScenarioResult};

/// A complete assertion for one endpoint plan.
#[derive(Default)]
pub struct Assertion {
    // Flow assertions
    pub flow: Option<FlowKind>,
    pub reads: Option<Vec<String>>,
    pub writes: Option<Vec<String>>,
    pub terminal: Option<String>,

    // Chain assertions
    pub chains: Vec<(ChainPhase, Vec<String>)>,
    pub origins: Vec<(ChainPhase, String, Origin)>,
    /// (entity, attribute, compiled code), looked up in every chain.
    pub expressions: Vec<(String, String, String)>,

    // Source assertions
    pub sources: Option<Vec<String>>,

    // Custom assertion function
    #[allow(clippy::type_complexity)]
    pub custom: Option<Box<dyn Fn(&EndpointPlan) -> bool + Send + Sync>>,
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("flow", &self.flow)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("terminal", &self.terminal)
            .field("chains", &self.chains)
            .field("origins", &self.origins)
            .field("expressions", &self.expressions)
            .field("sources", &self.sources)
            .field("custom", &self.custom.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Assertion {
    /// Create a new empty assertion.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow(mut self, kind: FlowKind) -> Self {
        self.flow = Some(kind);
        self
    }

    pub fn reads(mut self, sources: &[&str]) -> Self {
        self.reads = Some(owned(sources));
        self
    }

    pub fn writes(mut self, sources: &[&str]) -> Self {
        self.writes = Some(owned(sources));
        self
    }

    pub fn terminal(mut self, entity: &str) -> Self {
        self.terminal = Some(entity.to_string());
        self
    }

    /// Expect the chain of `phase` to hold exactly `entities`, in order.
    pub fn chain(mut self, phase: ChainPhase, entities: &[&str]) -> Self {
        self.chains.push((phase, owned(entities)));
        self
    }

    pub fn origin(mut self, phase: ChainPhase, entity: &str, origin: Origin) -> Self {
        self.origins.push((phase, entity.to_string(), origin));
        self
    }

    pub fn expression(mut self, entity: &str, attribute: &str, code: &str) -> Self {
        self.expressions
            .push((entity.to_string(), attribute.to_string(), code.to_string()));
        self
    }

    /// Expect these source descriptors, in order.
    pub fn sources(mut self, sources: &[&str]) -> Self {
        self.sources = Some(owned(sources));
        self
    }

    pub fn check(mut self, f: impl Fn(&EndpointPlan) -> bool + Send + Sync + 'static) -> Self {
        self.custom = Some(Box::new(f));
        self
    }

    /// Verify the assertion against an endpoint plan.
    pub fn verify(&self, step: &str, plan: &EndpointPlan) -> ScenarioResult<()> {
        if let Some(expected) = self.flow {
            if plan.flow.kind != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected flow {}, got {}", expected, plan.flow.kind),
                ));
            }
        }

        if let Some(ref expected) = self.reads {
            compare(step, "read sources", expected, &plan.flow.read_sources)?;
        }
        if let Some(ref expected) = self.writes {
            compare(step, "write targets", expected, &plan.flow.write_targets)?;
        }
        if let Some(ref expected) = self.terminal {
            if plan.flow.terminal.as_ref() != Some(expected) {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!(
                        "expected terminal {}, got {:?}",
                        expected, plan.flow.terminal
                    ),
                ));
            }
        }

        for (phase, expected) in &self.chains {
            let chain = plan.chain(*phase).ok_or_else(|| {
                ScenarioError::assertion_failed(step, format!("no {:?} chain", phase))
            })?;
            let actual: Vec<String> = chain.steps.iter().map(|s| s.entity.clone()).collect();
            compare(step, "chain", expected, &actual)?;
        }

        for (phase, entity, expected) in &self.origins {
            let actual = plan
                .chain(*phase)
                .and_then(|c| c.step(entity))
                .map(|s| &s.origin);
            if actual != Some(expected) {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!(
                        "origin mismatch for {}:\n  expected: {:?}\n  actual:   {:?}",
                        entity, expected, actual
                    ),
                ));
            }
        }

        for (entity, attribute, code) in &self.expressions {
            let found = plan
                .chains
                .iter()
                .filter_map(|c| c.step(entity))
                .flat_map(|s| s.expressions())
                .any(|(name, compiled)| name == attribute && compiled == code);
            if !found {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("no expression {}.{} compiled to \"{}\"", entity, attribute, code),
                ));
            }
        }

        if let Some(ref expected) = self.sources {
            let actual: Vec<String> = plan.sources.iter().map(|s| s.source.clone()).collect();
            compare(step, "sources", expected, &actual)?;
        }

        if let Some(ref custom) = self.custom {
            if !custom(plan) {
                return Err(ScenarioError::assertion_failed(
                    step,
                    "custom assertion failed",
                ));
            }
        }

        Ok(())
    }
}

/// What a scenario expects of the whole compilation.
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    #[default]
    Success,
    /// Compilation fails with a message containing the text.
    Error(String),
    /// Compilation fails with a message matching the pattern.
    ErrorPattern(String),
}

impl Outcome {
    /// Check a failed compilation against the expectation.
    pub fn verify_error(&self, scenario: &str, message: &str) -> ScenarioResult<()> {
        match self {
            Outcome::Success => Err(ScenarioError::assertion_failed(
                scenario,
                format!("compilation failed: {}", message),
            )),
            Outcome::Error(expected) if message.contains(expected.as_str()) => Ok(()),
            Outcome::Error(expected) => Err(ScenarioError::assertion_failed(
                scenario,
                format!("expected error containing '{}', got: {}", expected, message),
            )),
            Outcome::ErrorPattern(pattern) => {
                let re = regex_lite::Regex::new(pattern).map_err(|e| {
                    ScenarioError::assertion_failed(
                        scenario,
                        format!("invalid regex pattern: {}", e),
                    )
                })?;
                if re.is_match(message) {
                    Ok(())
                } else {
                    Err(ScenarioError::assertion_failed(
                        scenario,
                        format!("expected error matching '{}', got: {}", pattern, message),
                    ))
                }
            }
        }
    }

    pub fn expects_error(&self) -> bool {
        !matches!(self, Outcome::Success)
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn compare(step: &str, what: &str, expected: &[String], actual: &[String]) -> ScenarioResult<()> {
    if expected != actual {
        return Err(ScenarioError::assertion_failed(
            step,
            format!(
                "{} mismatch:\n  expected: {:?}\n  actual:   {:?}",
                what, expected, actual
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_outcome_matches_substring() {
        let outcome = Outcome::Error("Cycle detected".into());

        assert!(outcome
            .verify_error("s", "Graph error: Cycle detected: A -> B -> A")
            .is_ok());
        assert!(outcome.verify_error("s", "Unknown endpoint 'x'").is_err());
    }

    #[test]
    fn test_error_pattern_outcome() {
        let outcome = Outcome::ErrorPattern(r"line \d+, column \d+".into());

        assert!(outcome.verify_error("s", "at line 3, column 7").is_ok());
        assert!(Outcome::Success.verify_error("s", "boom").is_err());
    }
}
