//! Error types for the category suggester.

use std::fmt;

use crate::llm::LlmError;

/// Outcomes of [`CategorySuggester::suggest`](crate::suggest::CategorySuggester::suggest)
/// that did not produce a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestError {
    /// The product name was empty after trimming.
    InvalidInput(String),
    /// The product already carries a category. Informational, not a failure.
    AlreadyCategorized(String),
    /// The completion provider rejected the call for rate limiting.
    RateLimited,
    /// The completion provider rejected the credentials.
    AuthError(String),
    /// Any other provider or network failure.
    ProviderError(String),
}

impl SuggestError {
    /// True for outcomes callers should report as a notice rather than an error.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::AlreadyCategorized(_))
    }
}

impl fmt::Display for SuggestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::AlreadyCategorized(category) => {
                write!(f, "Product is already categorized as '{category}'")
            }
            Self::RateLimited => write!(
                f,
                "Category suggestions are rate limited, please try again later"
            ),
            Self::AuthError(msg) => write!(f, "Provider authentication failed: {msg}"),
            Self::ProviderError(msg) => write!(f, "Provider error: {msg}"),
        }
    }
}

impl std::error::Error for SuggestError {}

impl From<LlmError> for SuggestError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited(_) => Self::RateLimited,
            LlmError::Unauthorized(msg) => Self::AuthError(msg),
            other => Self::ProviderError(other.to_string()),
        }
    }
}
