use serde::{Deserialize, Serialize};

// ============ DNS Record Types ============

/// DNS record types accepted by batch creation.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
}

impl DnsRecordType {
    /// Every supported type, in display order.
    pub const ALL: [Self; 3] = [Self::A, Self::Aaaa, Self::Cname];

    /// Uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
        }
    }
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DnsRecordType {
    type Err = String;

    /// Parse an exact uppercase type name. Lowercase input is rejected, the
    /// same way the batch file format treats it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unsupported record type {s}"))
    }
}

/// TTL value meaning "let the provider choose".
pub const AUTO_TTL: u32 = 1;

/// One DNS record to create inside a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordSpec {
    /// Record type.
    pub record_type: DnsRecordType,
    /// Record name (e.g. `"www"` or `"www.example.com"`).
    pub name: String,
    /// Record value (address or target host).
    pub content: String,
    /// TTL in seconds, [`AUTO_TTL`] for automatic.
    pub ttl: u32,
    /// Route traffic through the provider's proxy/CDN.
    pub proxied: bool,
}

impl DnsRecordSpec {
    /// Short descriptor used as the batch item key, e.g. `"A www"`.
    pub fn descriptor(&self) -> String {
        format!("{} {}", self.record_type, self.name)
    }
}

// ============ Certificate Types ============

/// A TLS certificate request validated through DNS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    /// Primary domain name.
    pub domain: String,
    /// Additional names covered by the certificate.
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,
}

// ============ CDN Invalidation Types ============

/// A cache invalidation batch on one distribution.
///
/// The caller reference is not part of the payload: it travels as the
/// batch item's idempotency token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationRequest {
    /// Paths to invalidate, each starting with `/` (wildcards allowed).
    pub paths: Vec<String>,
}

// ============ CDN Distribution Types ============

/// How viewers may reach a cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    #[default]
    RedirectToHttps,
    AllowAll,
    HttpsOnly,
}

impl ViewerProtocolPolicy {
    pub const ALL: [Self; 3] = [Self::RedirectToHttps, Self::AllowAll, Self::HttpsOnly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedirectToHttps => "redirect-to-https",
            Self::AllowAll => "allow-all",
            Self::HttpsOnly => "https-only",
        }
    }
}

impl std::str::FromStr for ViewerProtocolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unsupported viewer protocol policy {s}"))
    }
}

/// One cache behavior of a distribution. The behavior with priority 1 and
/// path pattern `*` is the distribution's default behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheBehaviorSpec {
    pub priority: u32,
    pub path_pattern: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    /// Managed policy name (e.g. `Managed-CachingOptimized`) or policy id.
    pub cache_policy: Option<String>,
    pub origin_request_policy: Option<String>,
    pub response_headers_policy: Option<String>,
}

impl CacheBehaviorSpec {
    pub fn is_default(&self) -> bool {
        self.priority == 1 && self.path_pattern == "*"
    }
}

/// A CDN distribution to create in front of a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSpec {
    pub name: String,
    /// Alternate domain names served by the distribution.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub certificate_arn: Option<String>,
    pub waf_arn: Option<String>,
    pub origin_domain: String,
    pub behaviors: Vec<CacheBehaviorSpec>,
}
