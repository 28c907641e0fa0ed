//! Model fixture loading.

use std::fs;
use std::path::{Path, PathBuf};

use keel_ast::Model;

use crate::error::{ScenarioError, ScenarioResult};

/// Resolve a fixture path against the crate's `fixtures/` directory.
pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(relative)
}

/// Load a model serialized by a front end.
pub fn load_model(path: &Path) -> ScenarioResult<Model> {
    let source = fs::read_to_string(path).map_err(|e| ScenarioError::file_read(path, e))?;
    Model::from_json(&source).map_err(|e| ScenarioError::model_load(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_weather_fixture() {
        let model = load_model(&fixture_path("weather.json")).unwrap();

        assert_eq!(model.entities.len(), 2);
        assert!(model.source("forecasts").is_some());
        assert!(model.endpoint("forecast").is_some());
    }

    #[test]
    fn test_missing_fixture() {
        let result = load_model(&fixture_path("missing.json"));

        assert!(matches!(result, Err(ScenarioError::FileRead { .. })));
    }
}
