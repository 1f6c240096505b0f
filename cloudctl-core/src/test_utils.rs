//! Test helpers
//!
//! A scriptable in-memory `ResourceApi` that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cloudctl_provider::{ProviderError, ResourceApi, Result};
use tokio::sync::RwLock;

const PROVIDER: &str = "fake";

/// A recorded `create_item` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub target_id: String,
    pub item: String,
    pub token: Option<String>,
}

// ===== FakeResourceApi =====

/// Items are plain strings. Groups resolve to `target-<key>` unless marked
/// missing; items succeed with `id-<item>` unless scripted to fail.
pub struct FakeResourceApi {
    missing_groups: HashSet<String>,
    /// item -> (message, number of failures; `None` fails forever)
    failures: HashMap<String, (String, Option<u32>)>,
    requires_token: bool,
    latency: Option<Duration>,

    resolve_calls: AtomicUsize,
    create_calls: RwLock<Vec<CreateCall>>,
    attempts: RwLock<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeResourceApi {
    pub fn new() -> Self {
        Self {
            missing_groups: HashSet::new(),
            failures: HashMap::new(),
            requires_token: false,
            latency: None,
            resolve_calls: AtomicUsize::new(0),
            create_calls: RwLock::new(Vec::new()),
            attempts: RwLock::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_missing_group(mut self, group_key: &str) -> Self {
        self.missing_groups.insert(group_key.to_string());
        self
    }

    pub fn with_failing_item(mut self, item: &str, message: &str) -> Self {
        self.failures
            .insert(item.to_string(), (message.to_string(), None));
        self
    }

    /// Fail the first `times` attempts for `item`, then succeed.
    pub fn with_flaky_item(mut self, item: &str, times: u32, message: &str) -> Self {
        self.failures
            .insert(item.to_string(), (message.to_string(), Some(times)));
        self
    }

    pub fn with_idempotency_tokens(mut self) -> Self {
        self.requires_token = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub async fn create_calls(&self) -> Vec<CreateCall> {
        self.create_calls.read().await.clone()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceApi<String> for FakeResourceApi {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn group_kind(&self) -> &'static str {
        "zone"
    }

    fn item_kind(&self) -> &'static str {
        "record"
    }

    fn requires_idempotency_token(&self) -> bool {
        self.requires_token
    }

    async fn resolve_group(&self, group_key: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.missing_groups.contains(group_key) {
            return Err(ProviderError::api(
                PROVIDER,
                format!("zone not found: {group_key}"),
            ));
        }
        Ok(format!("target-{group_key}"))
    }

    async fn create_item(
        &self,
        target_id: &str,
        item: &String,
        idempotency_token: Option<&str>,
    ) -> Result<String> {
        self.create_calls.write().await.push(CreateCall {
            target_id: target_id.to_string(),
            item: item.clone(),
            token: idempotency_token.map(str::to_string),
        });
        let attempt = {
            let mut attempts = self.attempts.write().await;
            let count = attempts.entry(item.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.simulate_latency().await;

        match self.failures.get(item) {
            Some((message, None)) => Err(ProviderError::api(PROVIDER, message.clone())),
            Some((message, Some(times))) if attempt <= *times => {
                Err(ProviderError::api(PROVIDER, message.clone()))
            }
            _ => Ok(format!("id-{item}")),
        }
    }
}
