//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles share their counters through `Arc`, so a test keeps a clone
//! and inspects calls after handing the other clone to the engine.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{DnsRecordClient, PublicIpResolver, RecordId, UpdateOutcome};
use cfddns_core::{Credentials, EngineConfig, EngineEvent, ReconcileEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const TEST_DOMAIN: &str = "home.example.com";
pub const TEST_RECORD_ID: &str = "372e67954025e0ba6aaa6d586b9e0b59";

/// What the record lookup answers
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(String),
    Missing,
    /// HTTP 404
    NotAuthorized,
    /// Any other HTTP status
    Status(u16),
    /// Connection-level failure
    Unreachable,
}

/// What the stored-record fetch answers
#[derive(Debug, Clone)]
pub enum Stored {
    Content(String),
    Missing,
    Fails,
}

/// A DnsRecordClient whose answers are set by the test
#[derive(Clone)]
pub struct ScriptedRecordClient {
    lookup: Arc<Mutex<Lookup>>,
    stored: Arc<Mutex<Stored>>,
    accept_updates: Arc<Mutex<bool>>,
    lookup_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedRecordClient {
    /// A client that finds the test record and stores `stored_ip`
    pub fn with_stored_ip(stored_ip: &str) -> Self {
        Self {
            lookup: Arc::new(Mutex::new(Lookup::Found(TEST_RECORD_ID.to_string()))),
            stored: Arc::new(Mutex::new(Stored::Content(stored_ip.to_string()))),
            accept_updates: Arc::new(Mutex::new(true)),
            lookup_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_lookup(&self, lookup: Lookup) {
        *self.lookup.lock().unwrap() = lookup;
    }

    pub fn set_stored(&self, stored: Stored) {
        *self.stored.lock().unwrap() = stored;
    }

    pub fn set_accept_updates(&self, accept: bool) {
        *self.accept_updates.lock().unwrap() = accept;
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// `(record_id, new_ip)` for every write, in order
    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsRecordClient for ScriptedRecordClient {
    async fn find_record_id(&self, domain: &str) -> Result<Option<RecordId>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(domain, TEST_DOMAIN, "lookup must use the configured domain");

        match self.lookup.lock().unwrap().clone() {
            Lookup::Found(id) => Ok(Some(RecordId::new(id))),
            Lookup::Missing => Ok(None),
            Lookup::NotAuthorized => Err(Error::auth("credentials rejected")),
            Lookup::Status(status) => Err(Error::http_status(status, "")),
            Lookup::Unreachable => Err(Error::transport("connection refused")),
        }
    }

    async fn fetch_record_ip(&self, record_id: &RecordId) -> Result<Option<String>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(record_id.as_str(), TEST_RECORD_ID);

        match self.stored.lock().unwrap().clone() {
            Stored::Content(ip) => Ok(Some(ip)),
            Stored::Missing => Ok(None),
            Stored::Fails => Err(Error::provider("scripted", "connection reset")),
        }
    }

    async fn update_record_ip(&self, record_id: &RecordId, new_ip: &str) -> Result<UpdateOutcome> {
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), new_ip.to_string()));

        let success = *self.accept_updates.lock().unwrap();
        Ok(UpdateOutcome::from_response(serde_json::json!({
            "success": success,
            "errors": [],
        })))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A PublicIpResolver returning a settable address
#[derive(Clone)]
pub struct StaticIpResolver {
    ip: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl StaticIpResolver {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Arc::new(Mutex::new(Some(ip.to_string()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A resolver whose every call fails
    pub fn failing() -> Self {
        Self {
            ip: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_ip(&self, ip: &str) {
        *self.ip.lock().unwrap() = Some(ip.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PublicIpResolver for StaticIpResolver {
    async fn current_public_ip(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::ip_resolver("echo service unreachable"))
    }

    fn resolver_name(&self) -> &'static str {
        "static"
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new("test-key", "ops@example.com", "test-zone", TEST_DOMAIN)
}

/// Build an engine over the given doubles with the default 900 s interval
pub fn build_engine(
    resolver: &StaticIpResolver,
    client: &ScriptedRecordClient,
) -> (ReconcileEngine, mpsc::Receiver<EngineEvent>) {
    ReconcileEngine::new(
        Box::new(resolver.clone()),
        Box::new(client.clone()),
        test_credentials(),
        &EngineConfig::default(),
    )
    .expect("engine construction succeeds")
}

/// Everything emitted so far
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
