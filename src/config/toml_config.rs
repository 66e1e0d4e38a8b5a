use super::{DEFAULT_API_ENDPOINT, DEFAULT_OUTPUT_PATH};
use crate::core::dag::DagSettings;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub dag: DagSettings,
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub url: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_ENDPOINT.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub path: String,
    pub persist: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
            persist: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.extract.url
    }

    fn output_path(&self) -> &str {
        &self.load.path
    }

    fn persist_output(&self) -> bool {
        self.load.persist
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.extract.timeout_seconds.map(Duration::from_secs)
    }

    fn dag_settings(&self) -> DagSettings {
        self.dag.clone()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("dag.dag_id", &self.dag.dag_id)?;
        validate_url("extract.url", &self.extract.url)?;
        validate_path("load.path", &self.load.path)?;
        if let Some(timeout) = self.extract.timeout_seconds {
            validate_positive_number("extract.timeout_seconds", timeout, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::Schedule;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[dag]
dag_id = "nightly_users"
description = "Users, every night"
schedule = "@daily"
start_date = "2024-01-01"

[extract]
url = "https://api.example.com/users"
timeout_seconds = 15

[load]
path = "exports/users.csv"
persist = true

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.dag.dag_id, "nightly_users");
        assert_eq!(config.dag.schedule, Schedule::Daily);
        assert_eq!(config.dag.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.api_endpoint(), "https://api.example.com/users");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.output_path(), "exports/users.csv");
        assert!(config.persist_output());
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = TomlConfig::from_toml_str("[dag]\nschedule = \"@weekly\"\n").unwrap();

        assert_eq!(config.dag.dag_id, "users_etl");
        assert_eq!(config.dag.schedule, Schedule::Weekly);
        assert_eq!(config.api_endpoint(), "https://jsonplaceholder.typicode.com/users");
        assert_eq!(config.output_path(), "user.csv");
        assert!(!config.persist_output());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_bare_monitoring_table_parses() {
        let config = TomlConfig::from_toml_str("[monitoring]\n").unwrap();

        assert!(config.monitoring.is_some());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("USERS_ETL_TEST_ENDPOINT", "https://test.api.com/users");

        let toml_content = r#"
[extract]
url = "${USERS_ETL_TEST_ENDPOINT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.extract.url, "https://test.api.com/users");

        std::env::remove_var("USERS_ETL_TEST_ENDPOINT");
    }

    #[test]
    fn test_unknown_env_var_is_kept_and_fails_validation() {
        let config =
            TomlConfig::from_toml_str("[extract]\nurl = \"${USERS_ETL_UNSET_VAR}\"\n").unwrap();

        assert_eq!(config.extract.url, "${USERS_ETL_UNSET_VAR}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_schedule_is_a_parse_error() {
        let err = TomlConfig::from_toml_str("[dag]\nschedule = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[dag]\ndag_id = \"file-test\"\n\n[load]\npath = \"out.csv\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.dag.dag_id, "file-test");
        assert_eq!(config.output_path(), "out.csv");
    }
}
