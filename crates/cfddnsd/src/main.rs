// # cfddnsd - Cloudflare dynamic DNS daemon
//
// Thin integration layer: all reconciliation logic lives in cfddns-core.
//
// The daemon is responsible for:
// 1. Reading process settings from environment variables
// 2. Loading (or generating) the settings file
// 3. Initializing logging and the runtime
// 4. Wiring the IP resolver, the Cloudflare client and the engine
// 5. Turning the engine's result into an exit code
//
// ## Environment
//
// - `CFDDNS_SETTINGS`: Path to the settings file (default: `settings.toml` next to the binary)
// - `CFDDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `CFDDNS_MODE`: set to `dry-run` to log record writes instead of sending them
//
// ## Settings file
//
// ```toml
// [cloudflare]
// api_key = "your_global_api_key"
// zone_id = "your_zone_id"
// email = "your_email@example.com"
//
// [domain]
// name = "your_domain"
// ```
//
// A missing file is created with the placeholders above and the daemon
// exits so the operator can fill it in.

use anyhow::{Context, Result};
use cfddns_core::{ReconcileEngine, Settings, SettingsStatus};
use cfddns_ip_http::HttpIpResolver;
use cfddns_provider_cloudflare::CloudflareClient;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error (including a freshly generated settings file
///   and failures while building the resolver, client or engine)
/// - 2: Fatal runtime error (rejected credentials, API or network failure on record lookup)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Fatal error reported by the engine
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process-level settings read from the environment
struct DaemonEnv {
    settings_path: PathBuf,
    log_level: String,
    dry_run: bool,
}

impl DaemonEnv {
    /// Load process settings from environment variables
    fn from_env() -> Self {
        Self {
            settings_path: env::var("CFDDNS_SETTINGS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| cfddns_core::config::default_settings_path()),
            log_level: env::var("CFDDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dry_run: env::var("CFDDNS_MODE")
                .unwrap_or_default()
                .eq_ignore_ascii_case("dry-run"),
        }
    }

    /// Map the configured log level
    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "CFDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let daemon_env = DaemonEnv::from_env();

    let log_level = match daemon_env.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let settings = match load_settings(&daemon_env) {
        Ok(Some(settings)) => settings,
        Ok(None) => return DaemonExitCode::ConfigError.into(),
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!("Starting cfddnsd daemon");
    info!("Managing record: {}", settings.domain.name);

    // Single sequential loop, no background tasks
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let result = rt.block_on(async {
        let engine = match build_engine(&settings, daemon_env.dry_run) {
            Ok(engine) => engine,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        match engine.run_until(wait_for_shutdown()).await {
            Ok(()) => {
                info!("Shutting down daemon");
                DaemonExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Load and validate the settings file
///
/// Returns `Ok(None)` when the file was missing and a template was written.
fn load_settings(daemon_env: &DaemonEnv) -> Result<Option<Settings>> {
    let path = &daemon_env.settings_path;

    let settings = match Settings::load_or_init(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?
    {
        SettingsStatus::Loaded(settings) => settings,
        SettingsStatus::Created(path) => {
            warn!(
                "Settings file is missing. Created a new one at {}. \
                Fill in your Cloudflare details and restart. Exiting now...",
                path.display()
            );
            return Ok(None);
        }
    };

    settings
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;

    Ok(Some(settings))
}

/// Wire the IP resolver and the Cloudflare client into an engine
fn build_engine(settings: &Settings, dry_run: bool) -> Result<ReconcileEngine> {
    let credentials = settings.credentials();
    let timeout = Duration::from_secs(settings.engine.http_timeout_secs);

    let resolver = HttpIpResolver::from_config(&settings.engine)
        .context("Failed to create IP resolver")?;

    let client = CloudflareClient::new(credentials.clone(), timeout, dry_run)
        .context("Failed to create Cloudflare client")?;
    if client.is_dry_run() {
        warn!("Cloudflare client running in DRY-RUN mode - no changes will be made");
    }

    // Nothing consumes engine events here; logging covers them
    let (engine, _) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(client),
        credentials,
        &settings.engine,
    )
    .context("Failed to create engine")?;

    Ok(engine)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// If the handlers cannot be installed the future never completes; the
/// process then ends only by being killed.
#[cfg(unix)]
async fn wait_for_shutdown() {
    let handlers = signal(SignalKind::terminate())
        .and_then(|sigterm| signal(SignalKind::interrupt()).map(|sigint| (sigterm, sigint)));

    let (mut sigterm, mut sigint) = match handlers {
        Ok(handlers) => handlers,
        Err(e) => {
            error!("Failed to setup signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", received);
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
