//! Built-in Resource API implementations.

mod dry_run;

pub use dry_run::DryRunProvider;
