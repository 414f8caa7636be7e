//! Configuration types for the cfddns system
//!
//! Settings live in a small TOML key-value file. When the file is missing a
//! template with placeholder values is written and the caller is told so via
//! [`SettingsStatus::Created`]; the daemon then exits for the operator to fill
//! it in.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the settings file looked up next to the executable
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Default delay between two reconciliation cycles (15 minutes)
pub const DEFAULT_INTERVAL_SECS: u64 = 900;

/// Default timeout applied to every outbound HTTP request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default IP-echo endpoint, answers `{"ip": "<address>"}`
pub const DEFAULT_IP_ECHO_URL: &str = "https://api64.ipify.org?format=json";

const PLACEHOLDER_API_KEY: &str = "your_global_api_key";
const PLACEHOLDER_ZONE_ID: &str = "your_zone_id";
const PLACEHOLDER_EMAIL: &str = "your_email@example.com";
const PLACEHOLDER_DOMAIN: &str = "your_domain";

/// Provider credentials and the managed record, fixed for the process lifetime
///
/// Passed by value into the Cloudflare client and the engine; nothing reads
/// them from global state.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Cloudflare global API key
    /// ⚠️ NEVER log this value
    pub api_key: String,
    /// Account email sent with every request
    pub email: String,
    /// Zone holding the record
    pub zone_id: String,
    /// Name of the managed A record
    pub domain: String,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<REDACTED>")
            .field("email", &self.email)
            .field("zone_id", &self.zone_id)
            .field("domain", &self.domain)
            .finish()
    }
}

impl Credentials {
    /// Create a new set of credentials
    pub fn new(
        api_key: impl Into<String>,
        email: impl Into<String>,
        zone_id: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            email: email.into(),
            zone_id: zone_id.into(),
            domain: domain.into(),
        }
    }

    /// Reject empty values, untouched template placeholders and bad domain names
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cloudflare.api_key", &self.api_key, PLACEHOLDER_API_KEY),
            ("cloudflare.zone_id", &self.zone_id, PLACEHOLDER_ZONE_ID),
            ("cloudflare.email", &self.email, PLACEHOLDER_EMAIL),
            ("domain.name", &self.domain, PLACEHOLDER_DOMAIN),
        ];

        for (key, value, placeholder) in fields {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{} cannot be empty", key)));
            }
            if value == placeholder {
                return Err(Error::config(format!(
                    "{} still holds the placeholder value '{}'. \
                    Edit the settings file and restart.",
                    key, placeholder
                )));
            }
        }

        validate_domain_name(&self.domain)
    }
}

/// On-disk settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Provider authentication
    pub cloudflare: CloudflareSettings,

    /// The managed record
    pub domain: DomainSettings,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

/// `[cloudflare]` section
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareSettings {
    pub api_key: String,
    pub zone_id: String,
    pub email: String,
}

impl std::fmt::Debug for CloudflareSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareSettings")
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("email", &self.email)
            .finish()
    }
}

/// `[domain]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    pub name: String,
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between two cycles (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Timeout for every outbound HTTP request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// IP-echo endpoint
    #[serde(default = "default_ip_echo_url")]
    pub ip_echo_url: String,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::config("engine.interval_secs must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::config("engine.http_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("engine.event_channel_capacity must be > 0"));
        }
        if !self.ip_echo_url.starts_with("https://") && !self.ip_echo_url.starts_with("http://") {
            return Err(Error::config(format!(
                "engine.ip_echo_url must use HTTP or HTTPS scheme. Got: {}",
                self.ip_echo_url
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            ip_echo_url: default_ip_echo_url(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_ip_echo_url() -> String {
    DEFAULT_IP_ECHO_URL.to_string()
}

fn default_event_channel_capacity() -> usize {
    64
}

/// Result of [`Settings::load_or_init`]
#[derive(Debug)]
pub enum SettingsStatus {
    /// The file existed and parsed
    Loaded(Settings),
    /// The file was missing; a template was written at this path
    Created(PathBuf),
}

impl Settings {
    /// Settings with placeholder values, written on first run
    pub fn template() -> Self {
        Self {
            cloudflare: CloudflareSettings {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                zone_id: PLACEHOLDER_ZONE_ID.to_string(),
                email: PLACEHOLDER_EMAIL.to_string(),
            },
            domain: DomainSettings {
                name: PLACEHOLDER_DOMAIN.to_string(),
            },
            engine: EngineConfig::default(),
        }
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("Invalid settings file: {}", e)))
    }

    /// Render settings as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::config(format!("Failed to render settings: {}", e)))
    }

    /// Load the settings file, writing a template if it does not exist
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<SettingsStatus> {
        let path = path.as_ref();

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, Self::template().to_toml_string()?)?;
            tracing::debug!("Wrote settings template to {}", path.display());
            return Ok(SettingsStatus::Created(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)?;
        Ok(SettingsStatus::Loaded(Self::from_toml_str(&text)?))
    }

    /// Validate the whole file
    pub fn validate(&self) -> Result<()> {
        self.credentials().validate()?;
        self.engine.validate()
    }

    /// Credentials derived from the `[cloudflare]` and `[domain]` sections
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.cloudflare.api_key.clone(),
            self.cloudflare.email.clone(),
            self.cloudflare.zone_id.clone(),
            self.domain.name.clone(),
        )
    }
}

/// Settings path used when none is given: next to the executable, falling
/// back to the working directory
pub fn default_settings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(SETTINGS_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME))
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters and
/// hyphen placement. A leading `*` label (wildcard record) is accepted.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if index == 0 && label == "*" {
            continue;
        }

        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: ASCII alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
