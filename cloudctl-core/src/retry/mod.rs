//! Resilient call executor
//!
//! Wraps a single provider call in a policy-driven retry loop: bounded
//! attempts, capped exponential backoff, cooperative cancellation, and a
//! message-based classification of every failure.

mod classify;
mod executor;
mod policy;

pub use classify::{classify, ErrorClassifier, SubstringClassifier};
pub use executor::{CallResult, RetryExecutor};
pub use policy::{RetryOn, RetryPolicy, BACKOFF_MULTIPLIER};
