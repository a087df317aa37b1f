use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration {version} failed: {message}")]
    MigrationFailed { version: usize, message: String },

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Mandatory column for '{field}' not found. Headers: {headers:?}")]
    MissingColumn { field: String, headers: Vec<String> },

    #[error("Error in row {row}: {message}")]
    RowError { row: usize, message: String },

    #[error("Required tool '{tool}' was not found in PATH")]
    ToolNotFound { tool: String },

    #[error("Database dump failed: {message}")]
    DumpFailed { message: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    Database,
    ExternalTool,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a command that failed with this severity.
    /// Always non-zero.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl OpsError {
    pub fn storage(message: impl Into<String>) -> Self {
        OpsError::StorageError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        OpsError::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        OpsError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. }
            | OpsError::TomlError(_) => ErrorCategory::Configuration,
            OpsError::InputNotFound { .. }
            | OpsError::MissingColumn { .. }
            | OpsError::RowError { .. }
            | OpsError::SpreadsheetError(_)
            | OpsError::CsvError(_)
            | OpsError::ValidationError { .. } => ErrorCategory::Input,
            OpsError::StorageError { .. } | OpsError::ObjectNotFound { .. } => {
                ErrorCategory::Storage
            }
            OpsError::DatabaseError(_)
            | OpsError::MigrationFailed { .. }
            | OpsError::NotFound { .. } => ErrorCategory::Database,
            OpsError::ToolNotFound { .. } | OpsError::DumpFailed { .. } => {
                ErrorCategory::ExternalTool
            }
            OpsError::ZipError(_)
            | OpsError::SerializationError(_)
            | OpsError::ProcessingError { .. } => ErrorCategory::Processing,
            OpsError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路或儲存暫時性問題，可重試
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Input
            | ErrorCategory::Database
            | ErrorCategory::ExternalTool
            | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OpsError::MissingColumn { field, .. } => {
                format!("The spreadsheet has no column for '{}'", field)
            }
            OpsError::InputNotFound { path } => format!("Could not find input: {}", path),
            OpsError::ToolNotFound { tool } => format!("'{}' is not installed", tool),
            OpsError::StorageError { .. } | OpsError::ObjectNotFound { .. } => {
                format!("Object storage operation failed: {}", self)
            }
            OpsError::DatabaseError(_) => format!("Catalog database operation failed: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OpsError::MissingColumn { .. } => {
                "Check the header row; accepted synonyms are listed in the import documentation"
            }
            OpsError::RowError { .. } => "Fix the offending row and run the import again",
            OpsError::InputNotFound { .. } => "Verify the path passed on the command line",
            OpsError::ToolNotFound { .. } => {
                "Install the database client tools (postgresql-client or sqlite3) in this image"
            }
            OpsError::DumpFailed { .. } => "Check database credentials and connectivity",
            OpsError::StorageError { .. } | OpsError::ObjectNotFound { .. } => {
                "Check bucket name, endpoint, region and credentials, then retry"
            }
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. }
            | OpsError::TomlError(_) => {
                "Review depoauto.toml and the related environment variables"
            }
            OpsError::DatabaseError(_) => "Make sure the catalog database path is writable",
            _ => "Run again with --verbose for more details",
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
