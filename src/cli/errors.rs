//! CLI-specific error types

use std::fmt;
use std::io;

use crate::errors::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed batch on stdin
    InvalidInput,
    /// Error raised by the store, carrying its code
    Store(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ODXY_CLI_CONFIG_ERROR",
            Self::IoError => "ODXY_CLI_IO_ERROR",
            Self::InvalidInput => "ODXY_CLI_INVALID_INPUT",
            Self::Store(code) => *code,
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

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Malformed input line
    pub fn invalid_input(line: usize, msg: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::InvalidInput, format!("line {}: {}", line, msg))
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

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Config(msg) => Self::config_error(msg),
            other => Self::new(CliErrorCode::Store(other.code()), other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_code() {
        let err: CliError = StoreError::RowOutOfRange { row: 4, total: 2 }.into();
        assert_eq!(err.code_str(), "ODXY_ROW_OUT_OF_RANGE");
        assert!(err.to_string().starts_with("ODXY_ROW_OUT_OF_RANGE: "));
    }

    #[test]
    fn test_config_error_mapped() {
        let err: CliError = StoreError::Config("bad".into()).into();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert_eq!(err.message(), "bad");
    }

    #[test]
    fn test_invalid_input_names_line() {
        let err = CliError::invalid_input(3, "expected array");
        assert_eq!(err.code_str(), "ODXY_CLI_INVALID_INPUT");
        assert_eq!(err.message(), "line 3: expected array");
    }
}
