//! Log sanitization utilities
//!
//! Provider error bodies and item payloads can be arbitrarily long; these
//! helpers keep log lines bounded without splitting UTF-8 characters.

/// Default number of characters kept by [`truncate_for_log`].
pub const TRUNCATE_LIMIT: usize = 256;

/// Truncate a string for logging, keeping at most [`TRUNCATE_LIMIT`] characters.
pub fn truncate_for_log(s: &str) -> String {
    truncate_chars(s, TRUNCATE_LIMIT)
}

/// Truncate to `limit` characters, appending the total character count when
/// anything was cut.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        None => s.to_string(),
        Some((cut, _)) => format!(
            "{}... [truncated, total {} chars]",
            &s[..cut],
            s.chars().count()
        ),
    }
}
