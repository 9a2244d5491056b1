//! CLI-specific error types
//!
//! Engine errors keep their kind in the code, e.g. `MDR_CLI_CONFLICT`.

use std::fmt;
use std::io;

use crate::errors::{ErrorKind, LifecycleError};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// Malformed argument or payload
    InvalidArgument,
    /// Refused or failed by the engine
    Rejected(ErrorKind),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "MDR_CLI_CONFIG_ERROR",
            Self::IoError => "MDR_CLI_IO_ERROR",
            Self::AlreadyInitialized => "MDR_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "MDR_CLI_NOT_INITIALIZED",
            Self::InvalidArgument => "MDR_CLI_INVALID_ARGUMENT",
            Self::Rejected(ErrorKind::NotFound) => "MDR_CLI_NOT_FOUND",
            Self::Rejected(ErrorKind::Conflict) => "MDR_CLI_CONFLICT",
            Self::Rejected(ErrorKind::Validation) => "MDR_CLI_VALIDATION",
            Self::Rejected(ErrorKind::BusinessLogic) => "MDR_CLI_BUSINESS_LOGIC",
            Self::Rejected(ErrorKind::Storage) => "MDR_CLI_STORAGE",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'mdr-lifecycle init' first.",
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<LifecycleError> for CliError {
    fn from(e: LifecycleError) -> Self {
        Self::new(CliErrorCode::Rejected(e.kind()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
