//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Exit code for a run with failed scenarios
pub const EXIT_FAILED: u8 = 1;

/// Exit code for usage and configuration mistakes
pub const EXIT_USAGE: u8 = 2;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("{failed} scenario(s) failed")]
    ScenariosFailed {
        /// Number of failed scenarios
        failed: usize,
    },

    /// The run was interrupted before it finished
    #[error("Run cancelled")]
    Cancelled,

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vitrine library error
    #[error("{0}")]
    Vitrine(#[from] vitrine::VitrineError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config { .. } | Self::InvalidArgument { .. } => EXIT_USAGE,
            Self::Vitrine(err) if err.is_usage() => EXIT_USAGE,
            _ => EXIT_FAILED,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use vitrine::VitrineError;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn test_failed_scenarios_exit_one() {
        let err = CliError::ScenariosFailed { failed: 2 };
        assert_eq!(err.to_string(), "2 scenario(s) failed");
        assert_eq!(err.exit_code(), EXIT_FAILED);
        assert_eq!(CliError::Cancelled.exit_code(), EXIT_FAILED);
    }

    #[test]
    fn test_unknown_group_is_usage() {
        let err: CliError = VitrineError::UnknownGroup {
            name: "wishlist".to_string(),
            available: vec!["cart".to_string()],
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(err.to_string().contains("wishlist"));
    }

    #[test]
    fn test_driver_error_is_failure() {
        let err: CliError = VitrineError::driver("boom").into();
        assert_eq!(err.exit_code(), EXIT_FAILED);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
