use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use cloudctl_provider::ResourceApi;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::idempotency::IdempotencyTokenSource;
use super::plan::{ExecutionPlan, GroupSpec, ItemSpec};
use super::report::{BatchReport, GroupResult, ItemResult};
use crate::retry::RetryExecutor;

/// Upper bound on concurrently processed groups.
pub const MAX_CONCURRENCY: usize = 10;

/// Progress callback, invoked with one human-readable line per group and per
/// item.
///
/// Called inline from the batch loop, so it must return quickly and never
/// block. Delivery is best effort.
pub type ProgressFn<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Runs an [`ExecutionPlan`] against one [`ResourceApi`].
///
/// Groups run sequentially or up to `concurrency` at a time; the items of a
/// group always run in order. Every call goes through the [`RetryExecutor`].
/// A failure only ever affects its own item (or, when the group key cannot
/// be resolved, its own group): the batch always runs to completion and the
/// report mirrors the plan index for index.
pub struct BatchCoordinator<T> {
    api: Arc<dyn ResourceApi<T>>,
    executor: RetryExecutor,
    tokens: IdempotencyTokenSource,
}

impl<T> BatchCoordinator<T>
where
    T: Send + Sync,
{
    pub fn new(api: Arc<dyn ResourceApi<T>>, executor: RetryExecutor) -> Self {
        Self {
            api,
            executor,
            tokens: IdempotencyTokenSource,
        }
    }

    pub async fn run_batch(
        &self,
        cancel: &CancellationToken,
        plan: &ExecutionPlan<T>,
        concurrency: usize,
        progress: Option<&ProgressFn<'_>>,
    ) -> BatchReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let limit = concurrency.clamp(1, MAX_CONCURRENCY);

        log::info!(
            "[{}] Starting batch: {} {}(s), {} {}(s), concurrency {}",
            self.api.id(),
            plan.groups().len(),
            self.api.group_kind(),
            plan.total_items(),
            self.api.item_kind(),
            limit
        );

        let group_results = if limit == 1 {
            self.run_sequential(cancel, plan, progress).await
        } else {
            self.run_concurrent(cancel, plan, limit, progress).await
        };

        let report =
            BatchReport::from_groups(group_results, started_at, Utc::now(), clock.elapsed());

        log::info!(
            "[{}] Batch finished in {:.1}s: {}/{} {}(s) succeeded, {}/{} {}(s) succeeded",
            self.api.id(),
            report.duration.as_secs_f32(),
            report.success_groups,
            report.total_groups,
            self.api.group_kind(),
            report.success_items,
            report.total_items,
            self.api.item_kind()
        );
        report
    }

    async fn run_sequential(
        &self,
        cancel: &CancellationToken,
        plan: &ExecutionPlan<T>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<GroupResult> {
        let total = plan.groups().len();
        let mut results = Vec::with_capacity(total);
        for (index, group) in plan.groups().iter().enumerate() {
            results.push(self.run_group(cancel, index, total, group, progress).await);
        }
        results
    }

    async fn run_concurrent(
        &self,
        cancel: &CancellationToken,
        plan: &ExecutionPlan<T>,
        limit: usize,
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<GroupResult> {
        let total = plan.groups().len();
        let semaphore = Semaphore::new(limit);
        let mut slots: Vec<Option<GroupResult>> = (0..total).map(|_| None).collect();

        let mut pending: FuturesUnordered<_> = plan
            .groups()
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let semaphore = &semaphore;
                async move {
                    // The semaphore is never closed, so acquire cannot fail.
                    let _permit = semaphore.acquire().await;
                    let result = self.run_group(cancel, index, total, group, progress).await;
                    (index, result)
                }
            })
            .collect();

        while let Some((index, result)) = pending.next().await {
            slots[index] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }

    async fn run_group(
        &self,
        cancel: &CancellationToken,
        index: usize,
        total: usize,
        group: &GroupSpec<T>,
        progress: Option<&ProgressFn<'_>>,
    ) -> GroupResult {
        let group_key = group.group_key.as_str();
        emit(
            progress,
            &format!(
                "Processing {} {}/{}: {}",
                self.api.group_kind(),
                index + 1,
                total,
                group_key
            ),
        );

        let api = &self.api;
        let resolved = self
            .executor
            .execute(cancel, &format!("resolve:{group_key}"), move || {
                api.resolve_group(group_key)
            })
            .await;

        let target_id = match resolved.outcome {
            Ok(target_id) => target_id,
            Err(error) => {
                log::error!(
                    "[{}] Skipping {} {}(s) of {}: {}",
                    self.api.id(),
                    group.items.len(),
                    self.api.item_kind(),
                    group_key,
                    error
                );
                return GroupResult::resolution_failed(group_key, group.items.len(), error);
            }
        };
        log::debug!("[{}] Resolved {group_key} to {target_id}", self.api.id());

        let count = group.items.len();
        let mut item_results = Vec::with_capacity(count);
        for (position, item) in group.items.iter().enumerate() {
            emit(
                progress,
                &format!(
                    "  └─ {}: Creating {} {}/{} ({})",
                    group_key,
                    self.api.item_kind(),
                    position + 1,
                    count,
                    item.key
                ),
            );
            item_results.push(self.run_item(cancel, &target_id, item).await);
        }

        GroupResult::from_items(group_key, target_id, item_results)
    }

    async fn run_item(
        &self,
        cancel: &CancellationToken,
        target_id: &str,
        item: &ItemSpec<T>,
    ) -> ItemResult {
        // Drawn once so every retry carries the same token.
        let token = item.idempotency_token.clone().or_else(|| {
            self.api
                .requires_idempotency_token()
                .then(|| self.tokens.next_token())
        });

        let api = &self.api;
        let payload = &item.payload;
        let token_ref = token.as_deref();
        let call = self
            .executor
            .execute(cancel, &format!("create:{}", item.key), move || {
                api.create_item(target_id, payload, token_ref)
            })
            .await;

        if let Some(error) = call.error() {
            log::warn!("[{}] {} failed: {}", self.api.id(), item.key, error.message);
        }
        ItemResult::from_call(&item.key, token, call)
    }
}

fn emit(progress: Option<&ProgressFn<'_>>, message: &str) {
    if let Some(progress) = progress {
        progress(message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorCategory;
    use crate::retry::RetryPolicy;
    use crate::test_utils::FakeResourceApi;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            ..RetryPolicy::default()
        }
    }

    fn coordinator(api: &Arc<FakeResourceApi>) -> BatchCoordinator<String> {
        BatchCoordinator::new(api.clone(), RetryExecutor::new(policy()))
    }

    fn group(key: &str, items: &[&str]) -> GroupSpec<String> {
        GroupSpec::new(
            key,
            items
                .iter()
                .map(|item| ItemSpec::new(*item, (*item).to_string()))
                .collect(),
        )
    }

    /// Zone `a.com` with three records (the second one rejected), zone
    /// `b.com` with two.
    fn mixed_plan() -> ExecutionPlan<String> {
        ExecutionPlan::new(vec![
            group("a.com", &["a1", "a2", "a3"]),
            group("b.com", &["b1", "b2"]),
        ])
    }

    fn mixed_api() -> Arc<FakeResourceApi> {
        Arc::new(FakeResourceApi::new().with_failing_item("a2", "invalid content for A record"))
    }

    fn assert_counters_consistent(report: &BatchReport) {
        assert_eq!(
            report.total_items,
            report.group_results.iter().map(|g| g.total_items).sum::<usize>()
        );
        assert_eq!(report.success_items + report.failed_items, report.total_items);
        assert_eq!(report.success_groups + report.failed_groups, report.total_groups);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failure_is_isolated_to_its_item() {
        let api = mixed_api();
        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &mixed_plan(), 1, None)
            .await;

        assert_eq!(report.total_groups, 2);
        assert_eq!(report.success_groups, 1);
        assert_eq!(report.failed_groups, 1);
        assert_eq!(report.total_items, 5);
        assert_eq!(report.success_items, 4);
        assert_eq!(report.failed_items, 1);
        assert_counters_consistent(&report);

        let a = &report.group_results[0];
        assert_eq!(a.group_key, "a.com");
        assert_eq!(a.target_id.as_deref(), Some("target-a.com"));
        assert!(!a.succeeded);
        let keys: Vec<_> = a.item_results.iter().map(|r| r.item_key.as_str()).collect();
        assert_eq!(keys, vec!["a1", "a2", "a3"]);

        let failed = &a.item_results[1];
        assert!(!failed.succeeded);
        assert_eq!(failed.attempts, 3);
        let error = failed.error.as_ref().unwrap();
        assert_eq!(error.category, ErrorCategory::Validation);
        assert_eq!(error.operation, "create:a2");
        assert_eq!(a.item_results[2].resource_id.as_deref(), Some("id-a3"));

        let b = &report.group_results[1];
        assert!(b.succeeded);
        assert_eq!(b.success_items, 2);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_run_matches_sequential_run() {
        let plan = ExecutionPlan::new(vec![
            group("a.com", &["a1", "a2", "a3"]),
            group("b.com", &["b1", "b2"]),
            group("c.com", &["c1"]),
            group("d.com", &[]),
            group("e.com", &["e1", "e2"]),
        ]);
        let build = || {
            Arc::new(
                FakeResourceApi::new()
                    .with_failing_item("a2", "invalid content")
                    .with_flaky_item("e1", 1, "too many requests")
                    .with_missing_group("c.com")
                    .with_latency(Duration::from_millis(100)),
            )
        };

        let sequential_api = build();
        let sequential = coordinator(&sequential_api)
            .run_batch(&CancellationToken::new(), &plan, 1, None)
            .await;
        let concurrent_api = build();
        let concurrent = coordinator(&concurrent_api)
            .run_batch(&CancellationToken::new(), &plan, 8, None)
            .await;

        assert_eq!(sequential.group_results, concurrent.group_results);
        assert_eq!(sequential.total_items, concurrent.total_items);
        assert_eq!(sequential.success_items, concurrent.success_items);
        assert_eq!(sequential.failed_groups, concurrent.failed_groups);
        assert_counters_consistent(&concurrent);
        let keys: Vec<_> = concurrent
            .group_results
            .iter()
            .map(|g| g.group_key.as_str())
            .collect();
        assert_eq!(keys, vec!["a.com", "b.com", "c.com", "d.com", "e.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_group_makes_no_create_calls() {
        let api = Arc::new(FakeResourceApi::new().with_missing_group("gone.com"));
        let plan = ExecutionPlan::new(vec![
            group("gone.com", &["g1", "g2"]),
            group("b.com", &["b1"]),
        ]);

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 1, None)
            .await;

        let gone = &report.group_results[0];
        assert!(!gone.succeeded);
        assert_eq!(gone.total_items, 2);
        assert_eq!(gone.failed_items, 2);
        assert!(gone.item_results.is_empty());
        let error = gone.resolution_error.as_ref().unwrap();
        assert_eq!(error.category, ErrorCategory::NotFound);
        assert_eq!(error.operation, "resolve:gone.com");

        let calls = api.create_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_id, "target-b.com");
        assert_eq!(calls[0].item, "b1");
        assert_eq!(report.failed_items, 2);
        assert_eq!(report.success_items, 1);
        assert_counters_consistent(&report);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let api = Arc::new(FakeResourceApi::new().with_latency(Duration::from_secs(1)));
        let plan = ExecutionPlan::new(
            (0..6)
                .map(|i| group(&format!("zone{i}.com"), &["www"]))
                .collect(),
        );

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 2, None)
            .await;

        assert_eq!(report.success_items, 6);
        assert_eq!(api.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_clamped_to_max() {
        let api = Arc::new(FakeResourceApi::new().with_latency(Duration::from_secs(1)));
        let plan = ExecutionPlan::new(
            (0..15)
                .map(|i| group(&format!("zone{i}.com"), &["www"]))
                .collect(),
        );

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 64, None)
            .await;

        assert_eq!(report.total_groups, 15);
        assert_eq!(api.max_in_flight(), MAX_CONCURRENCY);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_concurrency_runs_sequentially() {
        let api = Arc::new(FakeResourceApi::new().with_latency(Duration::from_secs(1)));
        let plan = ExecutionPlan::new(vec![group("a.com", &["a1"]), group("b.com", &["b1"])]);

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 0, None)
            .await;

        assert_eq!(report.success_items, 2);
        assert_eq!(api.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_messages_follow_plan_order() {
        let api = mixed_api();
        let messages = Mutex::new(Vec::new());
        let progress: &ProgressFn<'_> = &|line: &str| {
            messages.lock().unwrap().push(line.to_string());
        };

        coordinator(&api)
            .run_batch(&CancellationToken::new(), &mixed_plan(), 1, Some(progress))
            .await;

        let messages = messages.lock().unwrap().clone();
        assert_eq!(
            messages,
            vec![
                "Processing zone 1/2: a.com",
                "  └─ a.com: Creating record 1/3 (a1)",
                "  └─ a.com: Creating record 2/3 (a2)",
                "  └─ a.com: Creating record 3/3 (a3)",
                "Processing zone 2/2: b.com",
                "  └─ b.com: Creating record 1/2 (b1)",
                "  └─ b.com: Creating record 2/2 (b2)",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn synthesized_token_is_reused_across_retries() {
        let api = Arc::new(
            FakeResourceApi::new()
                .with_idempotency_tokens()
                .with_flaky_item("a1", 2, "connection reset"),
        );
        let plan = ExecutionPlan::single_group("E123", vec![
            ItemSpec::new("a1", "a1".to_string()),
            ItemSpec::new("a2", "a2".to_string()),
        ]);

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 1, None)
            .await;

        assert_eq!(report.success_items, 2);
        let calls = api.create_calls().await;
        assert_eq!(calls.len(), 4);
        let first = calls[0].token.clone().unwrap();
        assert!(first.starts_with("cloudctl-"));
        assert_eq!(calls[1].token.as_deref(), Some(first.as_str()));
        assert_eq!(calls[2].token.as_deref(), Some(first.as_str()));
        assert_ne!(calls[3].token.as_deref(), Some(first.as_str()));

        let items = &report.group_results[0].item_results;
        assert_eq!(items[0].attempts, 3);
        assert_eq!(items[0].idempotency_token.as_deref(), Some(first.as_str()));
        assert_eq!(items[1].idempotency_token, calls[3].token);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_token_takes_precedence() {
        let api = Arc::new(FakeResourceApi::new().with_idempotency_tokens());
        let plan = ExecutionPlan::single_group(
            "E123",
            vec![ItemSpec::new("a1", "a1".to_string()).with_idempotency_token("release-42")],
        );

        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &plan, 1, None)
            .await;

        let calls = api.create_calls().await;
        assert_eq!(calls[0].token.as_deref(), Some("release-42"));
        assert_eq!(
            report.group_results[0].item_results[0]
                .idempotency_token
                .as_deref(),
            Some("release-42")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_token_when_not_required() {
        let api = mixed_api();
        coordinator(&api)
            .run_batch(&CancellationToken::new(), &mixed_plan(), 1, None)
            .await;
        assert!(api.create_calls().await.iter().all(|c| c.token.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_fails_remaining_items_without_calls() {
        let api = mixed_api();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let progress: &ProgressFn<'_> = &move |line: &str| {
            if line.ends_with("(a2)") {
                trigger.cancel();
            }
        };

        let report = coordinator(&api)
            .run_batch(&cancel, &mixed_plan(), 1, Some(progress))
            .await;

        assert_eq!(api.create_calls().await.len(), 1);
        assert_eq!(api.resolve_calls(), 1);
        assert_eq!(report.total_items, 5);
        assert_eq!(report.success_items, 1);
        assert_eq!(report.failed_items, 4);
        assert_counters_consistent(&report);

        let a = &report.group_results[0];
        assert_eq!(a.item_results.len(), 3);
        for item in &a.item_results[1..] {
            assert_eq!(item.attempts, 0);
            assert!(item.error.as_ref().unwrap().is_cancelled());
        }
        let b = &report.group_results[1];
        assert!(b.resolution_error.as_ref().unwrap().is_cancelled());
        assert_eq!(b.failed_items, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_concurrent_run_keeps_every_slot() {
        let api = Arc::new(FakeResourceApi::new().with_latency(Duration::from_secs(1)));
        let plan = ExecutionPlan::new(
            (0..6)
                .map(|i| group(&format!("z{i}"), &["r1", "r2", "r3"]))
                .collect(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let report = coordinator(&api).run_batch(&cancel, &plan, 3, None).await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(report.total_items, 18);
        assert_eq!(report.success_items, 3);
        assert_eq!(report.failed_items, 15);
        assert_counters_consistent(&report);
        assert_eq!(api.resolve_calls(), 3);
        assert_eq!(api.create_calls().await.len(), 6);

        let keys: Vec<_> = report
            .group_results
            .iter()
            .map(|g| g.group_key.as_str())
            .collect();
        assert_eq!(keys, vec!["z0", "z1", "z2", "z3", "z4", "z5"]);

        for started_group in &report.group_results[..3] {
            let items = &started_group.item_results;
            assert_eq!(items.len(), 3);
            assert!(items[0].succeeded);
            assert!(items[1].error.as_ref().unwrap().is_cancelled());
            assert!(items[2].error.as_ref().unwrap().is_cancelled());
            assert_eq!(items[2].attempts, 0);
        }
        for waiting_group in &report.group_results[3..] {
            assert!(waiting_group.item_results.is_empty());
            assert_eq!(waiting_group.failed_items, 3);
            assert!(waiting_group
                .resolution_error
                .as_ref()
                .unwrap()
                .is_cancelled());
        }
    }

    #[tokio::test]
    async fn empty_plan_yields_empty_report() {
        let api = mixed_api();
        let report = coordinator(&api)
            .run_batch(&CancellationToken::new(), &ExecutionPlan::new(Vec::new()), 4, None)
            .await;

        assert_eq!(report.total_groups, 0);
        assert_eq!(report.total_items, 0);
        assert!(!report.has_failures());
        assert_eq!(api.resolve_calls(), 0);
    }
}
