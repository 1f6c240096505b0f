//! Batch files
//!
//! YAML descriptions of a batch, checked up front and turned into an
//! [`ExecutionPlan`] for the coordinator. Validation stops at the first
//! problem and names its position, e.g.
//! `zone[0] (example.com) record[1]: name must not be empty`.

use std::path::Path;

use cloudctl_core::batch::{ExecutionPlan, GroupSpec, ItemSpec};
use cloudctl_provider::{
    CacheBehaviorSpec, CertificateRequest, DistributionSpec, DnsRecordSpec, DnsRecordType,
    InvalidationRequest, ViewerProtocolPolicy, AUTO_TTL,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

fn read_yaml<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: display.clone(),
        source,
    })?;
    parse_yaml(&display, &content)
}

fn parse_yaml<T: DeserializeOwned>(path: &str, content: &str) -> AppResult<T> {
    serde_yaml::from_str(content).map_err(|e| AppError::parse(path, &e))
}

fn invalid(message: String) -> AppError {
    AppError::Validation(message)
}

// ============ DNS Records ============

/// ```yaml
/// zones:
///   - zone: example.com
///     records:
///       - { type: A, name: www, content: 192.0.2.1, ttl: 300, proxied: true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsBatchFile {
    #[serde(default)]
    pub zones: Vec<ZoneEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneEntry {
    pub zone: String,
    pub records: Vec<RecordEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordEntry {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// `0` (or absent) means automatic.
    pub ttl: u32,
    pub proxied: bool,
}

impl DnsBatchFile {
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let file: Self = read_yaml(path.as_ref())?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let file: Self = parse_yaml("<inline>", content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.zones.is_empty() {
            return Err(invalid("at least one zone is required".to_string()));
        }
        for (i, zone) in self.zones.iter().enumerate() {
            if zone.zone.is_empty() {
                return Err(invalid(format!("zone[{i}]: zone name must not be empty")));
            }
            if zone.records.is_empty() {
                return Err(invalid(format!(
                    "zone[{i}] ({}): at least one record is required",
                    zone.zone
                )));
            }
            for (j, record) in zone.records.iter().enumerate() {
                let at = format!("zone[{i}] ({}) record[{j}]", zone.zone);
                if record.record_type.is_empty() {
                    return Err(invalid(format!("{at}: type must not be empty")));
                }
                if record.name.is_empty() {
                    return Err(invalid(format!("{at}: name must not be empty")));
                }
                if record.content.is_empty() {
                    return Err(invalid(format!("{at}: content must not be empty")));
                }
                if record.record_type.parse::<DnsRecordType>().is_err() {
                    return Err(invalid(format!(
                        "{at}: unsupported record type {} (supported: A, AAAA, CNAME)",
                        record.record_type
                    )));
                }
            }
        }
        Ok(())
    }

    /// One group per zone, one item per record, keyed `"<type> <name>"`.
    pub fn to_plan(&self) -> AppResult<ExecutionPlan<DnsRecordSpec>> {
        self.validate()?;
        let mut groups = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            let mut items = Vec::with_capacity(zone.records.len());
            for record in &zone.records {
                let spec = record.to_spec()?;
                items.push(ItemSpec::new(spec.descriptor(), spec));
            }
            groups.push(GroupSpec::new(zone.zone.clone(), items));
        }
        Ok(ExecutionPlan::new(groups))
    }
}

impl RecordEntry {
    fn to_spec(&self) -> AppResult<DnsRecordSpec> {
        Ok(DnsRecordSpec {
            record_type: self.record_type.parse().map_err(invalid)?,
            name: self.name.clone(),
            content: self.content.clone(),
            ttl: if self.ttl == 0 { AUTO_TTL } else { self.ttl },
            proxied: self.proxied,
        })
    }
}

// ============ Certificates ============

/// ```yaml
/// certificates:
///   - domain: example.com
///     san: [www.example.com]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBatchFile {
    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateEntry {
    pub domain: String,
    pub san: Vec<String>,
}

impl CertificateBatchFile {
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let file: Self = read_yaml(path.as_ref())?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let file: Self = parse_yaml("<inline>", content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.certificates.is_empty() {
            return Err(invalid(
                "at least one certificate request is required".to_string(),
            ));
        }
        for (i, cert) in self.certificates.iter().enumerate() {
            if cert.domain.is_empty() {
                return Err(invalid(format!(
                    "certificate[{i}]: domain must not be empty"
                )));
            }
            if let Some(j) = cert.san.iter().position(String::is_empty) {
                return Err(invalid(format!(
                    "certificate[{i}] ({}) san[{j}]: name must not be empty",
                    cert.domain
                )));
            }
        }
        Ok(())
    }

    /// Every request in a single group keyed by `region`; item key is the
    /// primary domain.
    pub fn to_plan(&self, region: &str) -> AppResult<ExecutionPlan<CertificateRequest>> {
        self.validate()?;
        let items = self
            .certificates
            .iter()
            .map(|cert| {
                ItemSpec::new(
                    cert.domain.clone(),
                    CertificateRequest {
                        domain: cert.domain.clone(),
                        subject_alternative_names: cert.san.clone(),
                    },
                )
            })
            .collect();
        Ok(ExecutionPlan::single_group(region, items))
    }
}

// ============ Cache Invalidations ============

/// ```yaml
/// invalidations:
///   - distribution_id: E2ABCDEF
///     paths: ["/index.html", "/assets/*"]
///     caller_reference: release-42   # optional
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationBatchFile {
    #[serde(default)]
    pub invalidations: Vec<InvalidationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidationEntry {
    pub distribution_id: String,
    pub paths: Vec<String>,
    pub caller_reference: Option<String>,
}

impl InvalidationBatchFile {
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let file: Self = read_yaml(path.as_ref())?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let file: Self = parse_yaml("<inline>", content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.invalidations.is_empty() {
            return Err(invalid("at least one invalidation is required".to_string()));
        }
        for (i, entry) in self.invalidations.iter().enumerate() {
            if entry.distribution_id.is_empty() {
                return Err(invalid(format!(
                    "invalidation[{i}]: distribution_id must not be empty"
                )));
            }
            if entry.paths.is_empty() {
                return Err(invalid(format!(
                    "invalidation[{i}] ({}): at least one path is required",
                    entry.distribution_id
                )));
            }
            for (j, path) in entry.paths.iter().enumerate() {
                if !path.starts_with('/') {
                    return Err(invalid(format!(
                        "invalidation[{i}] ({}) path[{j}]: path must start with / (got {path:?})",
                        entry.distribution_id
                    )));
                }
            }
            if entry.caller_reference.as_deref() == Some("") {
                return Err(invalid(format!(
                    "invalidation[{i}] ({}): caller_reference must not be empty when set",
                    entry.distribution_id
                )));
            }
        }
        Ok(())
    }

    /// Entries grouped by distribution in first-seen order. Each entry is
    /// one item keyed by its paths; its caller reference, when given, is
    /// the item's idempotency token.
    pub fn to_plan(&self) -> AppResult<ExecutionPlan<InvalidationRequest>> {
        self.validate()?;
        let mut groups: Vec<GroupSpec<InvalidationRequest>> = Vec::new();
        for entry in &self.invalidations {
            let mut item = ItemSpec::new(
                entry.paths.join(","),
                InvalidationRequest {
                    paths: entry.paths.clone(),
                },
            );
            if let Some(reference) = &entry.caller_reference {
                item = item.with_idempotency_token(reference.clone());
            }

            match groups
                .iter_mut()
                .find(|g| g.group_key == entry.distribution_id)
            {
                Some(group) => group.items.push(item),
                None => groups.push(GroupSpec::new(entry.distribution_id.clone(), vec![item])),
            }
        }
        Ok(ExecutionPlan::new(groups))
    }
}

// ============ Distributions ============

/// Group key of a distribution plan. Distributions are not scoped to a zone
/// or region, so the whole file is one group.
pub const DISTRIBUTION_SCOPE: &str = "global";

/// ```yaml
/// distributions:
///   - name: web
///     aliases: [www.example.com]
///     certificate_arn: arn:aws:acm:us-east-1:123456789012:certificate/abc
///     waf_arn: arn:aws:wafv2:...          # optional
///     origin:
///       domain: origin.example.com
///     behaviors:
///       - priority: 1
///         path_pattern: "*"
///         viewer_protocol_policy: redirect-to-https
///         cache_policy: Managed-CachingOptimized
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBatchFile {
    #[serde(default)]
    pub distributions: Vec<DistributionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub certificate_arn: Option<String>,
    pub waf_arn: Option<String>,
    pub origin: OriginEntry,
    pub behaviors: Vec<BehaviorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginEntry {
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorEntry {
    pub priority: u32,
    pub path_pattern: String,
    /// Defaults to `redirect-to-https`.
    pub viewer_protocol_policy: Option<String>,
    pub cache_policy: Option<String>,
    pub origin_request_policy: Option<String>,
    pub response_headers_policy: Option<String>,
}

impl DistributionBatchFile {
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let file: Self = read_yaml(path.as_ref())?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let file: Self = parse_yaml("<inline>", content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.distributions.is_empty() {
            return Err(invalid("at least one distribution is required".to_string()));
        }
        for (i, dist) in self.distributions.iter().enumerate() {
            if dist.name.is_empty() {
                return Err(invalid(format!("distribution[{i}]: name must not be empty")));
            }
            let at = format!("distribution[{i}] ({})", dist.name);
            if let Some(first) = self.distributions[..i]
                .iter()
                .position(|other| other.name == dist.name)
            {
                return Err(invalid(format!(
                    "{at}: name is already used by distribution[{first}]"
                )));
            }
            if dist.origin.domain.is_empty() {
                return Err(invalid(format!("{at}: origin.domain must not be empty")));
            }
            if let Some(k) = dist.aliases.iter().position(String::is_empty) {
                return Err(invalid(format!("{at} alias[{k}]: alias must not be empty")));
            }
            if dist.behaviors.is_empty() {
                return Err(invalid(format!("{at}: at least one behavior is required")));
            }
            for (j, behavior) in dist.behaviors.iter().enumerate() {
                if behavior.path_pattern.is_empty() {
                    return Err(invalid(format!(
                        "{at} behavior[{j}]: path_pattern must not be empty"
                    )));
                }
                if let Err(e) = behavior.viewer_protocol_policy() {
                    return Err(invalid(format!(
                        "{at} behavior[{j}]: {e} (supported: redirect-to-https, allow-all, https-only)"
                    )));
                }
            }
            if !dist
                .behaviors
                .iter()
                .any(|b| b.priority == 1 && b.path_pattern == "*")
            {
                return Err(invalid(format!(
                    "{at}: a default behavior (priority 1, path_pattern \"*\") is required"
                )));
            }
        }
        Ok(())
    }

    /// Every distribution in a single [`DISTRIBUTION_SCOPE`] group; item key
    /// is the distribution name.
    pub fn to_plan(&self) -> AppResult<ExecutionPlan<DistributionSpec>> {
        self.validate()?;
        let mut items = Vec::with_capacity(self.distributions.len());
        for dist in &self.distributions {
            items.push(ItemSpec::new(dist.name.clone(), dist.to_spec()?));
        }
        Ok(ExecutionPlan::single_group(DISTRIBUTION_SCOPE, items))
    }
}

impl DistributionEntry {
    fn to_spec(&self) -> AppResult<DistributionSpec> {
        let behaviors = self
            .behaviors
            .iter()
            .map(|b| -> AppResult<CacheBehaviorSpec> {
                Ok(CacheBehaviorSpec {
                    priority: b.priority,
                    path_pattern: b.path_pattern.clone(),
                    viewer_protocol_policy: b.viewer_protocol_policy().map_err(invalid)?,
                    cache_policy: b.cache_policy.clone(),
                    origin_request_policy: b.origin_request_policy.clone(),
                    response_headers_policy: b.response_headers_policy.clone(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(DistributionSpec {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            certificate_arn: self.certificate_arn.clone(),
            waf_arn: self.waf_arn.clone(),
            origin_domain: self.origin.domain.clone(),
            behaviors,
        })
    }
}

impl BehaviorEntry {
    fn viewer_protocol_policy(&self) -> Result<ViewerProtocolPolicy, String> {
        self.viewer_protocol_policy
            .as_deref()
            .map_or(Ok(ViewerProtocolPolicy::default()), str::parse)
    }
}
