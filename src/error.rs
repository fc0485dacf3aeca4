//! Library error types.

use thiserror::Error;

/// Errors that stop a whole extraction (as opposed to per-entity diagnostics).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid module input: {0}")]
    Input(String),
    #[error("failed to parse {path}: {message}")]
    Frontend { path: String, message: String },
    #[error("no front-end for extension {0:?}")]
    UnsupportedLanguage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of a single provider call that did not produce values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The label or feature does not apply to this view.
    #[error("not applicable")]
    NotApplicable,
    #[error("{0}")]
    Failed(String),
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        ProviderError::Failed(message.into())
    }
}
