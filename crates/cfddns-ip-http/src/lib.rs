// # HTTP IP Resolver
//
// This crate provides an HTTP IP-echo implementation of `PublicIpResolver`.
//
// ## Architecture
//
// One unauthenticated GET per call to a JSON echo service (by default
// `https://api64.ipify.org?format=json`), which answers `{"ip": "<address>"}`.
// No caching and no retry: the engine asks once per cycle and treats any
// failure as recoverable.

use cfddns_core::traits::PublicIpResolver;
use cfddns_core::{EngineConfig, Error, Result};

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Body returned by the echo service
#[derive(Debug, Deserialize)]
struct EchoResponse {
    ip: String,
}

/// HTTP-based public IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver for `url` with a per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::config("IP echo URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// Create a resolver from the `[engine]` settings
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(
            config.ip_echo_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// The endpoint queried on every call
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl PublicIpResolver for HttpIpResolver {
    async fn current_public_ip(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_resolver(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_resolver(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: EchoResponse = response
            .json()
            .await
            .map_err(|e| Error::ip_resolver(format!("Failed to parse response: {}", e)))?;

        // Keep the service's spelling; the engine compares strings
        let ip = body.ip;
        ip.parse::<IpAddr>()
            .map_err(|_| Error::ip_resolver(format!("Invalid IP address: {}", ip)))?;

        tracing::debug!("Public IP from {}: {}", self.url, ip);
        Ok(ip)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
