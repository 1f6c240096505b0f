//! Preview provider: walks a batch without touching any remote API.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::ResourceApi;
use crate::utils::log_sanitizer::truncate_for_log;

const PROVIDER_NAME: &str = "dry-run";

/// A [`ResourceApi`] that logs what it would do and always succeeds.
///
/// Groups resolve to `dry-run:<group key>`, items get a fresh UUID as their
/// resource id.
pub struct DryRunProvider {
    group_kind: &'static str,
    item_kind: &'static str,
    requires_token: bool,
    resolved: AtomicUsize,
    created: AtomicUsize,
}

impl DryRunProvider {
    /// Create a preview provider labelled with the given group/item kinds.
    pub fn new(group_kind: &'static str, item_kind: &'static str) -> Self {
        Self {
            group_kind,
            item_kind,
            requires_token: false,
            resolved: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        }
    }

    /// Preview a non-idempotent operation, so the batch engine attaches
    /// idempotency tokens exactly as it would for the real provider.
    #[must_use]
    pub fn with_idempotency_tokens(mut self, required: bool) -> Self {
        self.requires_token = required;
        self
    }

    /// Number of groups resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    /// Number of items "created" so far.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<T> ResourceApi<T> for DryRunProvider
where
    T: Debug + Send + Sync,
{
    fn id(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn group_kind(&self) -> &'static str {
        self.group_kind
    }

    fn item_kind(&self) -> &'static str {
        self.item_kind
    }

    fn requires_idempotency_token(&self) -> bool {
        self.requires_token
    }

    async fn resolve_group(&self, group_key: &str) -> Result<String> {
        self.resolved.fetch_add(1, Ordering::Relaxed);
        log::info!("[{PROVIDER_NAME}] would resolve {} {group_key}", self.group_kind);
        Ok(format!("{PROVIDER_NAME}:{group_key}"))
    }

    async fn create_item(
        &self,
        target_id: &str,
        item: &T,
        idempotency_token: Option<&str>,
    ) -> Result<String> {
        self.created.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "[{PROVIDER_NAME}] would create {} under {target_id} (token: {}): {}",
            self.item_kind,
            idempotency_token.unwrap_or("-"),
            truncate_for_log(&format!("{item:?}"))
        );
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
