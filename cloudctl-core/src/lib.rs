//! # cloudctl-core
//!
//! Batch provisioning engine shared by every cloudctl front-end.
//!
//! ## Architecture
//!
//! ```text
//! cloudctl-app (config, batch files, logging)
//!        |
//!        v
//! cloudctl-core
//!   batch::BatchCoordinator  --->  retry::RetryExecutor
//!        |                              |
//!        v                              v
//! cloudctl-provider::ResourceApi (resolve_group / create_item)
//! ```
//!
//! The [`batch`] module walks a two-level plan (group -> items) with bounded
//! group-level concurrency and always returns a complete [`batch::BatchReport`].
//! Every provider call goes through [`retry::RetryExecutor`], which retries with
//! exponential backoff and classifies failures from their message text.

pub mod batch;
pub mod error;
pub mod retry;

#[cfg(test)]
mod test_utils;

pub use error::{CoreError, CoreResult};
