//! Error types for Driftline.
//!
//! This module defines the crate-level error type used throughout Driftline,
//! providing rich error information for debugging and caller feedback.

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for Driftline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Driftline.
#[derive(Error, Debug)]
pub enum Error {
    /// The tokenizer encountered an indent structure it cannot parse.
    #[error("Malformed configuration at line {line_number}: {message}: '{line}'")]
    MalformedConfig {
        /// 1-based line number of the offending line
        line_number: usize,
        /// The offending line, verbatim
        line: String,
        /// What was wrong with it
        message: String,
    },

    /// A failure from the external device connection.
    ///
    /// Retry policy, if any, belongs to the transport implementation; this
    /// crate surfaces the failure verbatim and aborts the reconciliation.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An invalid combination of reconciliation options, detected before any
    /// transport call is issued.
    #[error("Invalid reconciliation options: {0}")]
    Policy(String),

    /// Failure reading a desired-state source file or writing a backup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a malformed-config error for the given line.
    pub fn malformed_config(
        line_number: usize,
        line: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedConfig {
            line_number,
            line: line.into(),
            message: message.into(),
        }
    }

    /// Creates a policy error.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy(message.into())
    }

    /// Returns true if this error was raised before any device interaction.
    pub fn is_pre_transport(&self) -> bool {
        matches!(self, Error::MalformedConfig { .. } | Error::Policy(_))
    }
}
