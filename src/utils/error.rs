use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("DAG definition error: {message}")]
    DagDefinitionError { message: String },

    #[error("No value for key '{key}' pushed by task '{task_id}'")]
    HandoffMissing { task_id: String, key: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Task '{task_id}' failed: {source}")]
    TaskFailed {
        task_id: String,
        #[source]
        source: Box<EtlError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Workflow,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::DagDefinitionError { .. } | EtlError::HandoffMissing { .. } => {
                ErrorCategory::Workflow
            }
            EtlError::IoError(_) => ErrorCategory::System,
            EtlError::TaskFailed { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // upstream hiccups usually clear up by the next daily run
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::HandoffMissing { .. } => ErrorSeverity::High,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::DagDefinitionError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            EtlError::TaskFailed { source, .. } => source.severity(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ApiError(_) => {
                "Check network connectivity and that the API endpoint is reachable".to_string()
            }
            EtlError::HttpStatusError { status, .. } if *status >= 500 => {
                "The upstream service is failing; try again later".to_string()
            }
            EtlError::HttpStatusError { .. } => {
                "Verify the API endpoint URL points at the users resource".to_string()
            }
            EtlError::CsvError(_) => "Check that the output path is writable".to_string(),
            EtlError::SerializationError(_) => {
                "The API response does not match the expected user schema".to_string()
            }
            EtlError::ConfigValidationError { field, .. }
            | EtlError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in your configuration", field)
            }
            EtlError::MissingConfigError { field } => {
                format!("Add '{}' to your configuration", field)
            }
            EtlError::DagDefinitionError { .. } => {
                "Check task ids and dependencies in the DAG definition".to_string()
            }
            EtlError::HandoffMissing { task_id, .. } => {
                format!("Make sure '{}' runs upstream of this task", task_id)
            }
            EtlError::ProcessingError { .. } => "Inspect the input records".to_string(),
            EtlError::IoError(_) => "Check file permissions and available disk space".to_string(),
            EtlError::TaskFailed { source, .. } => source.recovery_suggestion(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => {
                format!("Could not fetch users: {}", self)
            }
            EtlError::SerializationError(e) => format!("Unexpected data from the API: {}", e),
            EtlError::TaskFailed { task_id, source } => {
                format!("Step '{}' failed. {}", task_id, source.user_friendly_message())
            }
            _ => self.to_string(),
        }
    }

    /// Exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
