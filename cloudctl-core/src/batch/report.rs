use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ClassifiedError;
use crate::retry::CallResult;

/// Outcome of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_key: String,
    pub succeeded: bool,
    /// Id of the created resource, on success.
    pub resource_id: Option<String>,
    pub error: Option<ClassifiedError>,
    pub attempts: u32,
    /// Token sent with every attempt of this item, if the call needed one.
    pub idempotency_token: Option<String>,
}

impl ItemResult {
    pub(crate) fn from_call(
        item_key: &str,
        idempotency_token: Option<String>,
        call: CallResult<String>,
    ) -> Self {
        let (resource_id, error) = match call.outcome {
            Ok(id) => (Some(id), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            item_key: item_key.to_string(),
            succeeded: error.is_none(),
            resource_id,
            error,
            attempts: call.attempts,
            idempotency_token,
        }
    }
}

/// Outcome of one group, in the same item order as its `GroupSpec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub group_key: String,
    /// Target the group key resolved to.
    pub target_id: Option<String>,
    /// `true` iff resolution succeeded and no item failed.
    pub succeeded: bool,
    pub total_items: usize,
    pub success_items: usize,
    pub failed_items: usize,
    /// Empty when resolution failed: no item was attempted.
    pub item_results: Vec<ItemResult>,
    pub resolution_error: Option<ClassifiedError>,
}

impl GroupResult {
    /// A group whose key could not be resolved: every item counts as failed.
    pub(crate) fn resolution_failed(
        group_key: &str,
        total_items: usize,
        error: ClassifiedError,
    ) -> Self {
        Self {
            group_key: group_key.to_string(),
            target_id: None,
            succeeded: false,
            total_items,
            success_items: 0,
            failed_items: total_items,
            item_results: Vec::new(),
            resolution_error: Some(error),
        }
    }

    pub(crate) fn from_items(
        group_key: &str,
        target_id: String,
        item_results: Vec<ItemResult>,
    ) -> Self {
        let success_items = item_results.iter().filter(|r| r.succeeded).count();
        let failed_items = item_results.len() - success_items;
        Self {
            group_key: group_key.to_string(),
            target_id: Some(target_id),
            succeeded: failed_items == 0,
            total_items: item_results.len(),
            success_items,
            failed_items,
            item_results,
            resolution_error: None,
        }
    }

    /// Failed items, in plan order.
    pub fn failed_item_results(&self) -> impl Iterator<Item = &ItemResult> {
        self.item_results.iter().filter(|r| !r.succeeded)
    }
}

/// Final artifact of a batch run.
///
/// The counters are a pure reduction over `group_results`; they are computed
/// once in [`BatchReport::from_groups`] and never touched afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_groups: usize,
    pub success_groups: usize,
    pub failed_groups: usize,
    pub total_items: usize,
    pub success_items: usize,
    pub failed_items: usize,
    /// One entry per `GroupSpec`, in plan order.
    pub group_results: Vec<GroupResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
}

impl BatchReport {
    pub(crate) fn from_groups(
        group_results: Vec<GroupResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let success_groups = group_results.iter().filter(|g| g.succeeded).count();
        Self {
            total_groups: group_results.len(),
            success_groups,
            failed_groups: group_results.len() - success_groups,
            total_items: group_results.iter().map(|g| g.total_items).sum(),
            success_items: group_results.iter().map(|g| g.success_items).sum(),
            failed_items: group_results.iter().map(|g| g.failed_items).sum(),
            group_results,
            started_at,
            finished_at,
            duration,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed_items > 0 || self.failed_groups > 0
    }

    /// `0` when everything succeeded, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failures())
    }

    /// Every failed item with the group it belongs to, in plan order.
    pub fn failed_item_results(&self) -> impl Iterator<Item = (&GroupResult, &ItemResult)> {
        self.group_results
            .iter()
            .flat_map(|g| g.failed_item_results().map(move |item| (g, item)))
    }
}
