use super::{DEFAULT_API_ENDPOINT, DEFAULT_OUTPUT_PATH};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use chrono::NaiveDate;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "users-etl")]
#[command(about = "Fetch users from an API, reshape them and print them as a table")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
    pub api_endpoint: String,

    /// CSV path used by the load step when --persist is set
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, help = "Write the loaded table to --output-path as CSV")]
    pub persist: bool,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// TOML configuration file; replaces the flags above except --persist
    #[arg(short, long)]
    pub config: Option<String>,

    /// Logical date of the run (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub logical_date: Option<NaiveDate>,

    #[arg(long, help = "Print the DAG and its upcoming runs, then exit")]
    pub show_dag: bool,

    #[arg(long, default_value = "3")]
    pub upcoming: usize,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn persist_output(&self) -> bool {
        self.persist
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_endpoint", &self.api_endpoint)?;
        validate_path("output_path", &self.output_path)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_positive_number("timeout_seconds", timeout, 1)?;
        }
        Ok(())
    }
}
