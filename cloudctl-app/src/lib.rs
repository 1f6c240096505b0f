//! Application bootstrap for cloudctl.
//!
//! Loads configuration and batch files, initialises logging and wires a
//! [`BatchCoordinator`] from the configured retry policy and concurrency.
//! Front-ends construct one [`CloudCtl`] per invocation.

pub mod batch_file;
pub mod config;
pub mod error;
pub mod logging;

use std::fmt::Debug;
use std::sync::Arc;

use cloudctl_core::batch::{BatchCoordinator, BatchReport, ExecutionPlan, ProgressFn};
use cloudctl_core::retry::RetryExecutor;
use cloudctl_provider::{DryRunProvider, ResourceApi};
use tokio_util::sync::CancellationToken;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// One configured cloudctl invocation.
pub struct CloudCtl {
    config: AppConfig,
    cancel: CancellationToken,
}

impl CloudCtl {
    /// Validate `config` and the retry policy derived from it.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        if config.api.retry.enabled {
            config.retry_policy().validate()?;
        }
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Token shared by every call of a run. Cancelling it (e.g. from a
    /// Ctrl-C handler) stops further attempts; the run still returns a
    /// complete report.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// `api`, or a dry-run stand-in with the same labels when `dry_run` is
    /// configured.
    pub fn select_api<T>(&self, api: Arc<dyn ResourceApi<T>>) -> Arc<dyn ResourceApi<T>>
    where
        T: Debug + Send + Sync + 'static,
    {
        if !self.config.dry_run {
            return api;
        }
        log::info!("Dry run: no changes will be made ({} replaced)", api.id());
        Arc::new(
            DryRunProvider::new(api.group_kind(), api.item_kind())
                .with_idempotency_tokens(api.requires_idempotency_token()),
        )
    }

    pub fn coordinator<T>(&self, api: Arc<dyn ResourceApi<T>>) -> BatchCoordinator<T>
    where
        T: Send + Sync,
    {
        BatchCoordinator::new(api, RetryExecutor::new(self.config.retry_policy()))
    }

    /// Run `plan` against `api`.
    ///
    /// Progress lines go to `progress`, or to the log at info level when
    /// none is given. Only a structurally invalid plan is an error; provider
    /// failures are in the report.
    pub async fn run<T>(
        &self,
        api: Arc<dyn ResourceApi<T>>,
        plan: &ExecutionPlan<T>,
        progress: Option<&ProgressFn<'_>>,
    ) -> AppResult<BatchReport>
    where
        T: Send + Sync,
    {
        plan.validate()?;
        if plan.is_empty() {
            log::warn!("Nothing to do: the plan has no groups");
        }

        let progress = progress.unwrap_or(&log_progress);
        let report = self
            .coordinator(api)
            .run_batch(
                &self.cancel,
                plan,
                self.config.effective_concurrency(),
                Some(progress),
            )
            .await;

        if report.has_failures() {
            for group in &report.group_results {
                if let Some(error) = &group.resolution_error {
                    log::error!(
                        "{}: {} (hint: {})",
                        group.group_key,
                        error.message,
                        error.category.hint()
                    );
                }
            }
            for (group, item) in report.failed_item_results() {
                if let Some(error) = &item.error {
                    log::error!(
                        "{} / {}: {} (hint: {})",
                        group.group_key,
                        item.item_key,
                        error.message,
                        error.category.hint()
                    );
                }
            }
        }
        Ok(report)
    }
}

fn log_progress(message: &str) {
    log::info!("{message}");
}

/// Process exit code for a finished run: `0` when every item succeeded.
pub fn exit_code(report: &BatchReport) -> i32 {
    report.exit_code()
}
