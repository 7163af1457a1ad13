use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Lookup request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Tier {tier} requires a parent key")]
    MissingParentKey { tier: String },

    #[error("Classification entry {index} does not exist (form holds {len})")]
    EntryOutOfRange { index: usize, len: usize },

    #[error("Cannot select a {child} before a {parent} is selected")]
    ParentNotSelected { parent: String, child: String },

    #[error("Listing cannot be submitted: {message}")]
    SubmissionError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IntakeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IntakeError::HttpError(_) => ErrorCategory::Network,
            IntakeError::ConfigError { .. }
            | IntakeError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            IntakeError::MissingParentKey { .. }
            | IntakeError::EntryOutOfRange { .. }
            | IntakeError::ParentNotSelected { .. }
            | IntakeError::SubmissionError { .. } => ErrorCategory::Input,
            IntakeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IntakeError::HttpError(_) => "無法連線到查詢服務".to_string(),
            IntakeError::InvalidConfigValueError { field, reason, .. } => {
                format!("設定欄位 {} 無效: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration file and environment variables",
            ErrorCategory::Network => "Verify the lookup service is reachable and retry",
            ErrorCategory::Input => "Review the selection and try again",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
