//! Reconciliation engine
//!
//! The ReconcileEngine owns the whole polling flow:
//! - Resolving the managed record's id via DnsRecordClient
//! - Fetching the observed IP via PublicIpResolver
//! - Fetching the stored IP and comparing it to the observed one
//! - Writing the observed IP on mismatch
//! - Sleeping a fixed interval between cycles
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────────┐
//!                      │ ReconcileEngine  │
//!                      └──────────────────┘
//!                               │
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//! ┌─────────────────┐  ┌──────────────────┐  ┌─────────────┐
//! │ DnsRecordClient │  │ PublicIpResolver │  │   Events    │
//! │ (id, ip, write) │  │ (observed ip)    │  │  (notify)   │
//! └─────────────────┘  └──────────────────┘  └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Find the record id; no record → skip to sleep, lookup failure → fatal
//! 2. Fetch observed and stored IP; no stored IP → skip to sleep
//! 3. Equal strings → nothing to do; different → update
//! 4. Sleep the full interval, whatever happened above (except fatal)

use crate::config::{Credentials, EngineConfig};
use crate::error::Result;
use crate::traits::{DnsRecordClient, PublicIpResolver};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        domain: String,
        interval: Duration,
    },

    /// A cycle began
    CycleStarted {
        domain: String,
    },

    /// Record lookup returned zero results
    RecordMissing {
        domain: String,
    },

    /// Stored record had no usable content
    StoredIpMissing {
        record_id: String,
    },

    /// Observed and stored IP are equal
    Unchanged {
        ip: String,
    },

    /// Record was rewritten
    Updated {
        previous_ip: String,
        new_ip: String,
    },

    /// Provider answered the write without `success: true`
    UpdateRejected {
        new_ip: String,
        response: String,
    },

    /// A recoverable error ended the cycle early
    CycleFailed {
        error: String,
    },

    /// Engine is sleeping until the next cycle
    Sleeping {
        duration: Duration,
        next_check: Option<DateTime<Utc>>,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No A record matched the configured domain
    RecordMissing,
    /// The record had no usable content; update skipped
    StoredIpMissing,
    /// Observed IP equals stored IP
    Unchanged { ip: String },
    /// The record now holds `new_ip`
    Updated { previous_ip: String, new_ip: String },
    /// The write was sent but not accepted
    UpdateRejected {
        new_ip: String,
        response: serde_json::Value,
    },
}

/// Polling reconciliation engine
///
/// Runs one sequential loop on a single async task. The record id is
/// looked up again on every cycle.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Start with [`ReconcileEngine::run_until()`], passing the shutdown signal
/// 3. The loop returns `Ok(())` on shutdown, `Err(fatal)` on a fatal error
pub struct ReconcileEngine {
    /// Public IP resolver
    resolver: Box<dyn PublicIpResolver>,

    /// DNS record client
    client: Box<dyn DnsRecordClient>,

    /// Credentials (only the domain is read here)
    credentials: Credentials,

    /// Delay between cycles
    interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn PublicIpResolver>,
        client: Box<dyn DnsRecordClient>,
        credentials: Credentials,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        crate::config::validate_domain_name(&credentials.domain)?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            resolver,
            client,
            credentials,
            interval: Duration::from_secs(config.interval_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Delay applied after every non-fatal cycle
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the loop until `shutdown` completes or a fatal error occurs
    ///
    /// `shutdown` is only observed while sleeping between cycles; a running
    /// cycle is never interrupted.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error (see [`Error::severity`](crate::Error::severity))
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Starting reconciliation for {} via {} (every {})",
            self.credentials.domain,
            self.client.provider_name(),
            describe_interval(self.interval)
        );
        self.emit_event(EngineEvent::Started {
            domain: self.credentials.domain.clone(),
            interval: self.interval,
        });

        loop {
            match self.run_cycle().await {
                Ok(outcome) => debug!("Cycle finished: {:?}", outcome),
                Err(e) if e.is_fatal() => {
                    error!("Fatal error, stopping: {}", e);
                    self.emit_event(EngineEvent::Stopped {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
                Err(e) => {
                    error!("An error occurred: {}", e);
                    self.emit_event(EngineEvent::CycleFailed {
                        error: e.to_string(),
                    });
                }
            }

            let next_check = chrono::TimeDelta::from_std(self.interval)
                .ok()
                .and_then(|delta| Utc::now().checked_add_signed(delta));
            self.emit_event(EngineEvent::Sleeping {
                duration: self.interval,
                next_check,
            });

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    /// Run a single reconciliation cycle without sleeping
    ///
    /// Data-shape anomalies (no record, no stored IP, rejected write) are
    /// reported as [`CycleOutcome`] variants, not errors.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let domain = &self.credentials.domain;
        self.emit_event(EngineEvent::CycleStarted {
            domain: domain.clone(),
        });

        let Some(record_id) = self.client.find_record_id(domain).await? else {
            warn!("No A record found for {}, nothing to do this cycle", domain);
            self.emit_event(EngineEvent::RecordMissing {
                domain: domain.clone(),
            });
            return Ok(CycleOutcome::RecordMissing);
        };
        debug!("Resolved record id {} for {}", record_id, domain);

        let observed = self.resolver.current_public_ip().await?;
        debug!("Observed IP via {}: {}", self.resolver.resolver_name(), observed);

        let Some(stored) = self.client.fetch_record_ip(&record_id).await? else {
            warn!("Record {} has no stored IP, skipping update", record_id);
            self.emit_event(EngineEvent::StoredIpMissing {
                record_id: record_id.to_string(),
            });
            return Ok(CycleOutcome::StoredIpMissing);
        };

        if observed == stored {
            info!(
                "STATUS: No IP change detected ({}). Next check in {}.",
                observed,
                describe_interval(self.interval)
            );
            self.emit_event(EngineEvent::Unchanged {
                ip: observed.clone(),
            });
            return Ok(CycleOutcome::Unchanged { ip: observed });
        }

        let outcome = self.client.update_record_ip(&record_id, &observed).await?;

        if outcome.success {
            info!(
                "STATUS: IP change detected! IP address updated to {} (was {}). Next check in {}.",
                observed,
                stored,
                describe_interval(self.interval)
            );
            self.emit_event(EngineEvent::Updated {
                previous_ip: stored.clone(),
                new_ip: observed.clone(),
            });
            Ok(CycleOutcome::Updated {
                previous_ip: stored,
                new_ip: observed,
            })
        } else {
            error!("Error updating IP. Response: {}", outcome.raw);
            self.emit_event(EngineEvent::UpdateRejected {
                new_ip: observed.clone(),
                response: outcome.raw.to_string(),
            });
            Ok(CycleOutcome::UpdateRejected {
                new_ip: observed,
                response: outcome.raw,
            })
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Human-readable interval for status lines ("15 minutes", "90 seconds")
fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}

impl std::fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("resolver", &self.resolver.resolver_name())
            .field("client", &self.client.provider_name())
            .field("credentials", &self.credentials)
            .field("interval", &self.interval)
            .finish()
    }
}
