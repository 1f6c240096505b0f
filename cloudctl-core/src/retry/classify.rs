//! Message-based error classification
//!
//! Provider SDKs only hand back a message string, so the category of a
//! failure is read off its text: case-insensitive substring matching against
//! a fixed vocabulary, checked in priority order, first match wins. This is
//! best-effort by nature. It lives behind [`ErrorClassifier`] so a
//! structured matcher can replace it once providers expose error codes.

use crate::error::ErrorCategory;

/// Maps a failure message to an [`ErrorCategory`].
///
/// Implementations must be pure: the same message always yields the same
/// category.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, message: &str) -> ErrorCategory;
}

/// Vocabulary per category, in matching priority order. Terms are lowercase.
const RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::Auth,
        &[
            "authentication",
            "unauthorized",
            "invalid token",
            "invalid api token",
        ],
    ),
    (ErrorCategory::NotFound, &["not found", "does not exist"]),
    (
        ErrorCategory::Conflict,
        &["already exists", "conflict", "duplicate"],
    ),
    (
        ErrorCategory::RateLimit,
        &["rate limit", "too many requests"],
    ),
    (
        ErrorCategory::Network,
        &["network", "connection", "timeout", "dial"],
    ),
    (
        ErrorCategory::Validation,
        &["invalid", "validation", "bad request"],
    ),
    (
        ErrorCategory::Permission,
        &["forbidden", "permission denied", "access denied"],
    ),
];

/// The default classifier: case-insensitive substring matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringClassifier;

impl ErrorClassifier for SubstringClassifier {
    fn classify(&self, message: &str) -> ErrorCategory {
        let message = message.to_lowercase();
        RULES
            .iter()
            .find(|(_, terms)| terms.iter().any(|term| message.contains(term)))
            .map_or(ErrorCategory::Unknown, |(category, _)| *category)
    }
}

/// Classify `message` with the default [`SubstringClassifier`].
pub fn classify(message: &str) -> ErrorCategory {
    SubstringClassifier.classify(message)
}
