use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Invalid blood group: '{value}'")]
    InvalidBloodGroup { value: String },

    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("Unknown operation: '{operation}'")]
    UnknownOperation { operation: String },

    #[error("Invalid donation record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 請求本身有問題，呼叫端需修正輸入
    Request,
    /// 單筆紀錄無效，批次內部自行略過
    Record,
    Configuration,
    System,
}

impl CalcError {
    pub fn malformed(message: impl Into<String>) -> Self {
        CalcError::MalformedRequest {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CalcError::InvalidBloodGroup { .. }
            | CalcError::MalformedRequest { .. }
            | CalcError::UnknownOperation { .. } => ErrorCategory::Request,
            CalcError::InvalidRecord { .. } => ErrorCategory::Record,
            CalcError::ConfigError { .. } | CalcError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            CalcError::IoError(_) | CalcError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Stable tag written next to the message in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CalcError::InvalidBloodGroup { .. } => "invalid_blood_group",
            CalcError::MalformedRequest { .. } => "malformed_request",
            CalcError::UnknownOperation { .. } => "unknown_operation",
            CalcError::InvalidRecord { .. } => "invalid_record",
            CalcError::ConfigError { .. } | CalcError::InvalidConfigValueError { .. } => {
                "configuration"
            }
            CalcError::IoError(_) => "io",
            CalcError::SerializationError(_) => "serialization",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Request | ErrorCategory::Record => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::System => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
