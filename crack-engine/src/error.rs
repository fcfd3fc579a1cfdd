//! Error types for the crack engine

use thiserror::Error;

/// Main error type for crack engine operations
#[derive(Debug, Error)]
pub enum CrackError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid rule '{rule}' at position {position}")]
    InvalidRule { rule: String, position: usize },

    #[error("Wordlist unreadable: {path}: {reason}")]
    WordlistUnreadable { path: String, reason: String },

    #[error("Candidate generation failed in '{strategy}': {reason}")]
    GenerationFailed { strategy: String, reason: String },

    #[error("Failed to write rule file {path}: {reason}")]
    RuleFileWrite { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrackError {
    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a wordlist error for the given path.
    pub fn wordlist(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WordlistUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Configuration errors are raised at construction time and require the
    /// caller to fix its inputs; everything else is recovered mid-run.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CrackError::InvalidConfig { .. } | CrackError::InvalidRule { .. }
        )
    }
}

/// Result type for crack engine operations
pub type CrackResult<T> = Result<T, CrackError>;
