use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

const TOKEN_PREFIX: &str = "cloudctl";

/// Counter shared by every token source in the process, so two sources
/// created in the same millisecond still never hand out equal tokens.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Synthesizes idempotency tokens (caller references) for calls that are not
/// naturally idempotent.
///
/// Tokens look like `cloudctl-<unix millis>-<sequence>`. One token is drawn
/// per item, before its first attempt, and reused for all of its retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyTokenSource;

impl IdempotencyTokenSource {
    pub fn next_token(&self) -> String {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{TOKEN_PREFIX}-{}-{sequence}",
            Utc::now().timestamp_millis()
        )
    }
}
