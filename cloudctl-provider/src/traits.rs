use async_trait::async_trait;

use crate::error::Result;

/// Resource API consumed by the batch engine.
///
/// One implementation covers one kind of batch: DNS records inside zones,
/// certificate requests, cache invalidations on a distribution. The item
/// payload type `T` is whatever that provider needs to build its request.
///
/// Errors carry a human-readable message only; callers must not expect a
/// structured error code.
#[async_trait]
pub trait ResourceApi<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Provider identifier, used in logs and error messages.
    fn id(&self) -> &'static str;

    /// Name of a group in progress messages ("zone", "distribution", ...).
    fn group_kind(&self) -> &'static str {
        "group"
    }

    /// Name of an item in progress messages ("record", "certificate", ...).
    fn item_kind(&self) -> &'static str {
        "item"
    }

    /// Whether `create_item` is not naturally idempotent.
    ///
    /// When `true` every item must be sent with an idempotency token, and the
    /// same token must be reused on every retry of that item.
    fn requires_idempotency_token(&self) -> bool {
        false
    }

    /// Resolve a group key (zone name, distribution id, region) to the
    /// concrete target identifier items are created under.
    async fn resolve_group(&self, group_key: &str) -> Result<String>;

    /// Create one item under `target_id`, returning the new resource id.
    async fn create_item(
        &self,
        target_id: &str,
        item: &T,
        idempotency_token: Option<&str>,
    ) -> Result<String>;
}
