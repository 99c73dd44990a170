//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "gsim.toml";

/// Loads `<dir>/gsim.toml`, or the defaults when the file does not exist.
///
/// The result is not validated: command-line overrides are usually applied
/// first, followed by [`validate_config`].
pub fn load_config(dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(ProjectConfig::default());
    }
    load_config_file(&path)
}

/// Loads and parses an explicit configuration file.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Checks that the settings describe a runnable simulation.
pub fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    let sim = &config.sim;
    if config.vectors.input.is_none() && sim.num_vectors == 0 {
        return Err(ConfigError::MissingField("sim.num_vectors".to_string()));
    }
    if sim.workers == 0 {
        return Err(ConfigError::ValidationError(
            "sim.workers must be at least 1".to_string(),
        ));
    }
    if let Some(coverage) = sim.min_coverage {
        if !(0.0..=100.0).contains(&coverage) {
            return Err(ConfigError::ValidationError(format!(
                "sim.min_coverage must be a percentage, got {coverage}"
            )));
        }
    }
    if let Some(max) = sim.max_vectors {
        if max < sim.num_vectors {
            return Err(ConfigError::ValidationError(format!(
                "sim.max_vectors ({max}) is below sim.num_vectors ({})",
                sim.num_vectors
            )));
        }
    }
    if let Some(name) = config
        .vectors
        .hold_high
        .iter()
        .find(|name| config.vectors.hold_low.contains(name))
    {
        return Err(ConfigError::ValidationError(format!(
            "'{name}' is listed in both vectors.hold_high and vectors.hold_low"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InitialValue;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[sim]
num_vectors = 200
min_coverage = 85.5
achieve_best = true
max_vectors = 5000
workers = 4
initial_value = "0"
read_mif = true
mif_dir = "mem"

[vectors]
seed = 7
hold_high = ["reset"]
hold_low = ["enable"]
three_valued = true
additional_pins = ["counter"]

[output]
directory = "out"
vectors = "out_vec"
expected = "golden_vec"
activity = "design.act"
modelsim_script = "test.do"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.sim.num_vectors, 200);
        assert_eq!(config.sim.min_coverage, Some(85.5));
        assert!(config.sim.achieve_best);
        assert_eq!(config.sim.workers, 4);
        assert_eq!(config.sim.initial_value, InitialValue::Zero);
        assert_eq!(config.sim.mif_dir.as_deref(), Some("mem"));
        assert_eq!(config.vectors.seed, Some(7));
        assert_eq!(config.vectors.hold_high, vec!["reset"]);
        assert!(config.vectors.three_valued);
        assert_eq!(config.output.expected.as_deref(), Some("golden_vec"));
        validate_config(&config).unwrap();
    }

    #[test]
    fn defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.sim.workers, 1);
        assert_eq!(config.sim.initial_value, InitialValue::Unknown);
        assert_eq!(config.output.vectors, "output_vectors");
        assert_eq!(config.output.input_vectors, "input_vectors");
        assert!(config.vectors.input.is_none());
    }

    #[test]
    fn initial_value_accepts_upper_case_x() {
        let config = load_config_from_str("[sim]\ninitial_value = \"X\"").unwrap();
        assert_eq!(config.sim.initial_value.to_logic(), gsim_common::Logic::X);
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let err = load_config_from_str("[sim]\nthreads = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn vector_count_required_without_input_file() {
        let config = load_config_from_str("").unwrap();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField(_))
        ));
        let config = load_config_from_str("[vectors]\ninput = \"in_vec\"").unwrap();
        validate_config(&config).unwrap();
    }

    #[test]
    fn coverage_out_of_range() {
        let config = load_config_from_str("[sim]\nnum_vectors = 1\nmin_coverage = 120.0").unwrap();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_workers_rejected() {
        let config = load_config_from_str("[sim]\nnum_vectors = 1\nworkers = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn conflicting_hold_lists_rejected() {
        let toml = "[sim]\nnum_vectors = 1\n[vectors]\nhold_high = [\"rst\"]\nhold_low = [\"rst\"]";
        let config = load_config_from_str(toml).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.sim.num_vectors, 0);
    }

    #[test]
    fn reads_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[sim]\nnum_vectors = 12\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.sim.num_vectors, 12);
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let err = load_config_file(Path::new("/nonexistent/gsim.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
