// # DNS Record Client Trait
//
// Defines the three single-call operations the engine needs against the DNS
// provider: find the record, read its address, write a new address.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::DnsRecordClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* DnsRecordClient implementation */;
//
//     if let Some(id) = client.find_record_id("home.example.com").await? {
//         let stored = client.fetch_record_ip(&id).await?;
//         println!("stored: {:?}", stored);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// Provider-assigned identifier of a DNS record
///
/// Re-resolved every cycle; never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a provider identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded result of a record write
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The provider's `success` flag (false when absent)
    pub success: bool,
    /// The decoded response body, kept for logging
    pub raw: serde_json::Value,
}

impl UpdateOutcome {
    /// Build an outcome from a decoded response body
    ///
    /// `success` is true only when the body carries `"success": true`.
    pub fn from_response(raw: serde_json::Value) -> Self {
        let success = raw
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        Self { success, raw }
    }
}

/// Trait for DNS record client implementations
///
/// Each method issues exactly one API call. Retry, comparison and scheduling
/// decisions belong to the engine.
///
/// # Error contract
///
/// | method | fatal errors | soft failures |
/// |---|---|---|
/// | `find_record_id` | `Authentication` (HTTP 404), `HttpStatus`, `Transport` | `Ok(None)` on an empty result |
/// | `fetch_record_ip` | none | `Ok(None)` on a missing/malformed body |
/// | `update_record_ip` | none | `success = false` |
///
/// Any other error is recoverable and is absorbed at the loop boundary.
#[async_trait]
pub trait DnsRecordClient: Send + Sync {
    /// Find the identifier of the A record named `domain`
    ///
    /// Returns `Ok(None)` when the provider answers with zero results.
    async fn find_record_id(&self, domain: &str) -> Result<Option<RecordId>, crate::Error>;

    /// Read the address currently stored in a record
    ///
    /// Returns `Ok(None)` when the response has no usable `content` field.
    async fn fetch_record_ip(&self, record_id: &RecordId) -> Result<Option<String>, crate::Error>;

    /// Overwrite a record with `new_ip`
    ///
    /// The write always carries `type = "A"`, the configured domain as name,
    /// `ttl = 120` and `proxied = false`.
    async fn update_record_ip(
        &self,
        record_id: &RecordId,
        new_ip: &str,
    ) -> Result<UpdateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
