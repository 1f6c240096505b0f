//! # cloudctl-provider
//!
//! The Resource API boundary of cloudctl's batch engine.
//!
//! A batch run only needs two operations from a provider: resolve a group key
//! (zone name, distribution id, certificate region) to a concrete target, and
//! create one item under that target. [`ResourceApi`] captures exactly that,
//! generic over the item payload:
//!
//! | Batch | Group | Payload |
//! |-------|-------|---------|
//! | DNS records | zone | [`DnsRecordSpec`] |
//! | Certificates | region | [`CertificateRequest`] |
//! | Cache invalidations | distribution | [`InvalidationRequest`] |
//! | Distributions | scope | [`DistributionSpec`] |
//!
//! ## Error Handling
//!
//! Provider SDKs surface failures as free-form text. [`ProviderError`] keeps
//! that text intact; classification into categories happens in the core
//! crate, from the message alone.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloudctl_provider::{DnsRecordSpec, DnsRecordType, DryRunProvider, ResourceApi, AUTO_TTL};
//!
//! # async fn example() -> cloudctl_provider::Result<()> {
//! let provider = DryRunProvider::new("zone", "record");
//! let zone_id = ResourceApi::<DnsRecordSpec>::resolve_group(&provider, "example.com").await?;
//! let record = DnsRecordSpec {
//!     record_type: DnsRecordType::A,
//!     name: "www".to_string(),
//!     content: "192.0.2.10".to_string(),
//!     ttl: AUTO_TTL,
//!     proxied: false,
//! };
//! let record_id = provider.create_item(&zone_id, &record, None).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod providers;
mod traits;
mod types;
pub mod utils;

pub use error::{ProviderError, Result};
pub use providers::DryRunProvider;
pub use traits::ResourceApi;
pub use types::{
    AUTO_TTL, CacheBehaviorSpec, CertificateRequest, DistributionSpec, DnsRecordSpec,
    DnsRecordType, InvalidationRequest, ViewerProtocolPolicy,
};
