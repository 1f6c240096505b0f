//! Utility modules.

/// Truncation helpers so long provider payloads and messages stay readable in logs.
pub mod log_sanitizer;
