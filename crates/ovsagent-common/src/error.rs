//! Error types for OVS agent operations.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for OVS agent operations.
pub type OvsResult<T> = Result<T, OvsError>;

/// Errors that can occur while driving Open vSwitch.
#[derive(Debug, Error)]
pub enum OvsError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// A flow specification cannot be rendered into a valid expression.
    #[error("Invalid flow specification: {message}")]
    InvalidFlow {
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl OvsError {
    /// Creates an invalid flow error.
    pub fn invalid_flow(message: impl Into<String>) -> Self {
        Self::InvalidFlow {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    ///
    /// `ovs-vsctl` transiently fails while `ovsdb-server` is starting
    /// up, so command failures are considered retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OvsError::CommandFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OvsError::invalid_flow("cannot match priority on deletion");
        assert_eq!(
            err.to_string(),
            "Invalid flow specification: cannot match priority on deletion"
        );
    }

    #[test]
    fn test_command_failed_display() {
        let err = OvsError::CommandFailed {
            command: "/usr/bin/ovs-vsctl add-br br-int".to_string(),
            exit_code: 1,
            output: "database connection failed".to_string(),
        };
        assert!(err.to_string().contains("ovs-vsctl add-br"));
        assert!(err.to_string().contains("exit code 1"));
    }

    #[test]
    fn test_invalid_config() {
        let err = OvsError::invalid_config("integration_bridge", "empty bridge name");
        assert!(err.to_string().contains("integration_bridge"));
    }

    #[test]
    fn test_is_retryable() {
        let failed = OvsError::CommandFailed {
            command: "ovs-vsctl list-br".to_string(),
            exit_code: 1,
            output: "timed out".to_string(),
        };
        assert!(failed.is_retryable());
        assert!(!OvsError::internal("bug").is_retryable());
        assert!(!OvsError::invalid_flow("no actions").is_retryable());
    }
}
