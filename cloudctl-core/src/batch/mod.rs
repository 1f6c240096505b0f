//! Batch provisioning coordinator
//!
//! Runs a two-level plan (group -> items) through the retry executor,
//! sequentially or with bounded group-level concurrency, and assembles a
//! report shaped exactly like the input plan.

mod coordinator;
mod idempotency;
mod plan;
mod report;

pub use coordinator::{BatchCoordinator, ProgressFn, MAX_CONCURRENCY};
pub use idempotency::IdempotencyTokenSource;
pub use plan::{ExecutionPlan, GroupSpec, ItemSpec};
pub use report::{BatchReport, GroupResult, ItemResult};
