use std::path::Path;

use serde::Deserialize;

use crate::definition::ScenarioDefinition;
use crate::error::ConfigError;

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(rename = "Scenario")]
    scenario: ScenarioDefinition,
}

/// Parse a YAML scenario with a top level `Scenario` key and check it is runnable.
pub fn parse_scenario(content: &str) -> Result<ScenarioDefinition, ConfigError> {
    let file: ScenarioFile = serde_yaml::from_str(content)?;
    file.scenario.validate()?;

    Ok(file.scenario)
}

pub fn load_scenario_file(path: impl AsRef<Path>) -> Result<ScenarioDefinition, ConfigError> {
    let path = path.as_ref();
    log::debug!("Loading scenario from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_scenario(&content)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::definition::OperationDefinition;

    use super::*;

    const SCENARIO: &str = r#"
Scenario:
  Database: testdb
  Collection: testcol
  Parallel: 4
  Queries:
    - Name: insert-seed
      Action: InsertOne
      Repeat: 3
      Meta:
        Data: { name: Ash, age: 10 }
    - Name: read-back
      Action: Find
      Meta:
        Filter: { name: Ash }
        Options:
          Limit: 2
"#;

    #[test]
    fn parse_full_scenario() {
        let scenario = parse_scenario(SCENARIO).unwrap();

        let expected = ScenarioDefinition::new("testdb", "testcol")
            .with_parallelism(4)
            .with_operation(
                OperationDefinition::new("insert-seed", "InsertOne")
                    .with_repeat(3)
                    .with_param("Data", json!({"name": "Ash", "age": 10})),
            )
            .with_operation(
                OperationDefinition::new("read-back", "Find")
                    .with_param("Filter", json!({"name": "Ash"}))
                    .with_param("Options", json!({"Limit": 2})),
            );
        assert_eq!(expected, scenario);
        assert_eq!(1000, scenario.buffer_size);
    }

    #[test]
    fn missing_collection_is_a_parse_error() {
        let err = parse_scenario("Scenario:\n  Database: testdb\n  Queries: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_scenario_is_rejected_on_load() {
        let err = parse_scenario(
            "Scenario:\n  Database: testdb\n  Collection: testcol\n  BufferSize: 0\n  Queries: []\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BufferSize));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, SCENARIO).unwrap();

        let scenario = load_scenario_file(&path).unwrap();
        assert_eq!(2, scenario.operations.len());
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_scenario_file("/does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with("exist.yaml")));
    }
}
