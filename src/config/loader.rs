//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{MedBundleConfig, SourceKind};
use super::secret_string;
use crate::domain::errors::MedBundleError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "MEDBUNDLE";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Substitutes `${VAR}` placeholders from the environment
/// 3. Parses the TOML into [`MedBundleConfig`]
/// 4. Applies `MEDBUNDLE_<SECTION>_<KEY>` environment overrides
/// 5. Validates the result
///
/// # Errors
///
/// Returns [`MedBundleError::Configuration`] if the file is missing or
/// unreadable, a placeholder refers to an unset variable, parsing fails, an
/// override cannot be parsed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use medbundle::config::load_config;
///
/// let config = load_config("medbundle.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MedBundleConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MedBundleError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MedBundleError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text; the same pipeline as [`load_config`] minus the file read
pub fn parse_config(contents: &str) -> Result<MedBundleConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: MedBundleConfig = toml::from_str(&contents)
        .map_err(|e| MedBundleError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        MedBundleError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. Every unset variable is reported, not
/// just the first one.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| MedBundleError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }

            re.replace_all(line, |caps: &regex::Captures<'_>| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                })
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(MedBundleError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_override(section: &str, key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{section}_{key}")).ok()
}

fn parse_override<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        MedBundleError::Configuration(format!(
            "Invalid value '{value}' for {ENV_PREFIX}_{section}_{key}"
        ))
    })
}

/// Applies environment variable overrides
///
/// Environment variables follow the pattern `MEDBUNDLE_<SECTION>_<KEY>`, for
/// example `MEDBUNDLE_EXPORT_WORKERS` or `MEDBUNDLE_POSTGRESQL_CONNECTION_STRING`.
/// `MEDBUNDLE_SOURCE` selects the data source.
fn apply_env_overrides(config: &mut MedBundleConfig) -> Result<()> {
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_SOURCE")) {
        config.source = SourceKind::from_str(&val).map_err(MedBundleError::Configuration)?;
    }

    // Application overrides
    if let Some(val) = env_override("APPLICATION", "LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_override("APPLICATION", "DRY_RUN") {
        config.application.dry_run = parse_override("APPLICATION", "DRY_RUN", &val)?;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = env_override("POSTGRESQL", "CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = env_override("POSTGRESQL", "SCHEMA") {
            pg.schema = val;
        }
        if let Some(val) = env_override("POSTGRESQL", "MAX_CONNECTIONS") {
            pg.max_connections = parse_override("POSTGRESQL", "MAX_CONNECTIONS", &val)?;
        }
    }

    // Fixture overrides
    if let Some(ref mut fixture) = config.fixture {
        if let Some(val) = env_override("FIXTURE", "PATH") {
            fixture.path = val;
        }
    }

    // Export overrides
    if let Some(val) = env_override("EXPORT", "OUTPUT_DIR") {
        config.export.output_dir = val;
    }
    if let Some(val) = env_override("EXPORT", "WORKERS") {
        config.export.workers = parse_override("EXPORT", "WORKERS", &val)?;
    }
    if let Some(val) = env_override("EXPORT", "LIMIT") {
        config.export.limit = Some(parse_override("EXPORT", "LIMIT", &val)?);
    }
    if let Some(val) = env_override("EXPORT", "ID_STRATEGY") {
        config.export.id_strategy = val;
    }
    if let Some(val) = env_override("EXPORT", "PRETTY_PRINT") {
        config.export.pretty_print = parse_override("EXPORT", "PRETTY_PRINT", &val)?;
    }

    // Logging overrides
    if let Some(val) = env_override("LOGGING", "LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("LOGGING", "LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env_override("LOGGING", "LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("MEDBUNDLE_TEST_PG_PASSWORD", "s3cret");
        let input = "connection_string = \"postgresql://u:${MEDBUNDLE_TEST_PG_PASSWORD}@db/mimic\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(
            result,
            "connection_string = \"postgresql://u:s3cret@db/mimic\""
        );
        std::env::remove_var("MEDBUNDLE_TEST_PG_PASSWORD");
    }

    #[test]
    fn test_substitute_env_vars_reports_all_missing() {
        std::env::remove_var("MEDBUNDLE_TEST_MISSING_A");
        std::env::remove_var("MEDBUNDLE_TEST_MISSING_B");
        let input = "a = \"${MEDBUNDLE_TEST_MISSING_A}\"\nb = \"${MEDBUNDLE_TEST_MISSING_B}\"";

        let message = substitute_env_vars(input).unwrap_err().to_string();
        assert!(message.contains("MEDBUNDLE_TEST_MISSING_A"));
        assert!(message.contains("MEDBUNDLE_TEST_MISSING_B"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("MEDBUNDLE_TEST_IN_COMMENT");
        let input = "# password = \"${MEDBUNDLE_TEST_IN_COMMENT}\"\nsource = \"fixture\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${MEDBUNDLE_TEST_IN_COMMENT}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-medbundle.toml");
        assert!(matches!(result, Err(MedBundleError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
source = "fixture"

[application]
log_level = "debug"

[fixture]
path = "tests/fixtures/mimic_sample.json"

[export]
output_dir = "out"
workers = 2
id_strategy = "sequential"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source, SourceKind::Fixture);
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.export.workers, 2);
        assert!(config.export.pretty_print);
        assert!(config.postgresql.is_none());
    }

    #[test]
    fn test_parse_config_rejects_invalid_section() {
        let result = parse_config("source = \"postgresql\"\n");
        assert!(result.is_err());
    }
}
