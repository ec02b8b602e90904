//! Error types for the orchestration core.

use thiserror::Error;

/// Router output could not be turned into a decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("Router output is not valid JSON: {0}")]
    Parse(String),

    #[error("Router output is missing required fields: {missing:?}")]
    Schema { missing: Vec<String> },

    #[error("requires_confirmation is set but confirmation_prompt is empty")]
    MissingConfirmationPrompt,
}

/// Errors raised by an LLM backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout after {0} ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Illegal dialog state transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    #[error("Cannot enter {requested} while {current} is pending")]
    AlreadyPending {
        current: &'static str,
        requested: &'static str,
    },

    #[error("Disambiguation request has fewer than two candidates")]
    NotEnoughCandidates,
}

/// Configuration could not be parsed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl RouterError {
    /// Stable short label used in logs and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::Parse(_) => "parse_error",
            RouterError::Schema { .. } => "schema_error",
            RouterError::MissingConfirmationPrompt => "missing_confirmation_prompt",
        }
    }
}
