//! Error taxonomy for step application.
//!
//! Appliers and collaborators return a [`StepError`] instead of panicking or
//! bubbling arbitrary errors. The category decides what the executor does
//! next: transient and verification failures are retried with backoff,
//! configuration failures stop the step immediately.

use std::io;
use thiserror::Error;

/// Categories of step errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network timeout, package manager lock, flaky daemon
    Transient,
    /// Missing parameter, invalid path, unknown package
    Configuration,
    /// Apply reported success but the postcondition does not hold
    Verification,
    /// Run was interrupted from outside
    Cancelled,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient | Self::Verification)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transient => "Transient failure",
            Self::Configuration => "Configuration error",
            Self::Verification => "Postcondition not met",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Errors produced while applying or verifying a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Temporary failure, safe to retry
    #[error("transient failure: {0}")]
    Transient(String),

    /// The step cannot succeed as configured
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Apply looked successful but the system is not in the desired state
    #[error("verification failed: {0}")]
    Verification(String),

    /// Cancellation was requested while the step was running
    #[error("cancelled")]
    Cancelled,
}

impl StepError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }

    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transient(_) => ErrorCategory::Transient,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Verification(_) => ErrorCategory::Verification,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether the executor should try this step again.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Classify an I/O error raised while touching `what`.
    ///
    /// Permission and not-found errors will not fix themselves between
    /// attempts; everything else is treated as transient.
    pub fn from_io(err: &io::Error, what: &str) -> Self {
        let message = format!("{what}: {err}");
        match err.kind() {
            io::ErrorKind::PermissionDenied
            | io::ErrorKind::NotFound
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::ReadOnlyFilesystem
            | io::ErrorKind::IsADirectory
            | io::ErrorKind::NotADirectory => Self::Configuration(message),
            _ => Self::Transient(message),
        }
    }
}
