// # Cloudflare DNS Record Client
//
// This crate provides the Cloudflare implementation of `DnsRecordClient`.
//
// ## Behavior
//
// - One HTTP request per trait call; retry and sleeping are owned by the engine
// - Global API key auth via `X-Auth-Email` / `X-Auth-Key` headers
// - HTTP timeout on every request (configurable, 30 seconds by default)
// - Record lookup failures (404, other statuses, transport, unreadable body) are fatal errors
// - Malformed record/update responses are soft failures, never errors
// - Dry-run mode: lookups run, the PUT is only logged
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...&page=1&per_page=1`
// - DNS Record Details: GET `/zones/:zone_id/dns_records/:record_id`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::traits::{DnsRecordClient, RecordId, UpdateOutcome};
use cfddns_core::{Credentials, Error, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TTL written with every update (seconds)
const RECORD_TTL: u32 = 120;

/// Only A records are managed
const RECORD_TYPE: &str = "A";

const PROVIDER: &str = "cloudflare";

/// Body of the record write
///
/// Every field is sent on every write: the update overwrites type, name, TTL
/// and proxy status, it is not a partial patch.
#[derive(Debug, Serialize)]
struct RecordUpdate<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// Cloudflare DNS record client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform all GET requests (record lookup, record fetch)
/// - Log the intended PUT payload
/// - **NOT** modify the record, and report a successful outcome
pub struct CloudflareClient {
    /// Credentials and managed domain
    /// ⚠️ `credentials.api_key` must never be logged
    credentials: Credentials,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a new Cloudflare client
    ///
    /// # Parameters
    ///
    /// - `credentials`: API key, email, zone and managed domain
    /// - `timeout`: Per-request HTTP timeout
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    pub fn new(credentials: Credentials, timeout: Duration, dry_run: bool) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a client that writes records (production/live mode)
    pub fn new_live(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Self::new(credentials, timeout, false)
    }

    /// Create a client that only logs the writes it would make
    pub fn new_dry_run(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Self::new(credentials, timeout, true)
    }

    /// Point the client at another API root (e.g. a local mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self) -> String {
        format!(
            "{}/zones/{}/dns_records",
            self.base_url, self.credentials.zone_id
        )
    }

    fn record_url(&self, record_id: &RecordId) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Attach the auth headers
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", &self.credentials.email)
            .header("X-Auth-Key", &self.credentials.api_key)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl DnsRecordClient for CloudflareClient {
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=example.com&page=1&per_page=1
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// ```
    async fn find_record_id(&self, domain: &str) -> Result<Option<RecordId>> {
        tracing::debug!("Looking up record ID: {} (type: {})", domain, RECORD_TYPE);

        let response = self
            .authorized(self.client.get(self.records_url()))
            .query(&[
                ("type", RECORD_TYPE),
                ("name", domain),
                ("page", "1"),
                ("per_page", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::transport(format!("Cloudflare API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            // Cloudflare answers 404 on this endpoint when the key, email or
            // zone id is wrong
            if status == StatusCode::NOT_FOUND {
                return Err(Error::auth(
                    "Cloudflare credentials are either wrong or missing. \
                    Check the settings file and make sure you have entered correct details.",
                ));
            }

            return Err(Error::http_status(status.as_u16(), error_text));
        }

        // An undecodable lookup body fails the same way as the request itself
        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("Cloudflare API response unreadable: {}", e)))?;

        let record_id = json["result"]
            .as_array()
            .and_then(|records| records.first())
            .and_then(|record| record["id"].as_str());

        match record_id {
            Some(id) => {
                tracing::debug!("Found record ID: {}", id);
                Ok(Some(RecordId::new(id)))
            }
            None => {
                tracing::warn!("Error getting record ID. Response: {}", json);
                Ok(None)
            }
        }
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn fetch_record_ip(&self, record_id: &RecordId) -> Result<Option<String>> {
        let response = self
            .authorized(self.client.get(self.record_url(record_id)))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to read response: {}", e)))?;

        let content = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| json["result"]["content"].as_str().map(str::to_string));

        if content.is_none() {
            tracing::warn!("Error getting record IP. Response ({}): {}", status, body);
        }
        Ok(content)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "<domain>", "content": "<ip>", "ttl": 120, "proxied": false}
    /// ```
    async fn update_record_ip(&self, record_id: &RecordId, new_ip: &str) -> Result<UpdateOutcome> {
        let url = self.record_url(record_id);
        let payload = RecordUpdate {
            record_type: RECORD_TYPE,
            name: &self.credentials.domain,
            content: new_ip,
            ttl: RECORD_TTL,
            proxied: false,
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(UpdateOutcome::from_response(serde_json::json!({
                "success": true,
                "dry_run": true,
            })));
        }

        tracing::debug!(
            "Updating DNS record {}: {} -> {}",
            record_id,
            self.credentials.domain,
            new_ip
        );

        let response = self
            .authorized(self.client.put(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to read response: {}", e)))?;

        // A non-JSON body still becomes an outcome (success = false)
        let raw = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        let outcome = UpdateOutcome::from_response(raw);
        if !outcome.success {
            tracing::debug!("Update rejected with status {}", status);
        }

        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
