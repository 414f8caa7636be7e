//! Contract Test: Loop Timing and Termination
//!
//! Runs the engine on paused tokio time so the 900 s interval can be
//! observed without waiting.
//!
//! Constraints verified:
//! - The full interval is slept after success, skip and recoverable failure alike
//! - A fatal lookup error ends the loop before any sleep
//! - Shutdown is observed while sleeping and ends the loop cleanly
//! - A rejected write does not end the loop

mod common;

use cfddns_core::EngineEvent;
use common::*;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const INTERVAL: Duration = Duration::from_secs(900);

/// Start the engine on its own task; returns the shutdown trigger
fn spawn_engine(
    resolver: &StaticIpResolver,
    client: &ScriptedRecordClient,
) -> (
    oneshot::Sender<()>,
    JoinHandle<cfddns_core::Result<()>>,
    tokio::sync::mpsc::Receiver<EngineEvent>,
) {
    let (engine, events) = build_engine(resolver, client);
    assert_eq!(engine.interval(), INTERVAL);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        engine
            .run_until(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    (shutdown_tx, handle, events)
}

/// Assert that cycles only start on interval boundaries
async fn assert_cycles_every_interval(client: &ScriptedRecordClient) {
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.lookup_calls(), 1, "first cycle runs immediately");

    tokio::time::sleep(INTERVAL - Duration::from_secs(2)).await;
    assert_eq!(client.lookup_calls(), 1, "no cycle before the interval elapses");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(client.lookup_calls(), 2, "second cycle after the full interval");

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(client.lookup_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn sleeps_full_interval_after_no_change() {
    let resolver = StaticIpResolver::new("1.2.3.4");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    let (shutdown_tx, handle, mut events) = spawn_engine(&resolver, &client);

    assert_cycles_every_interval(&client).await;

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("clean shutdown");

    let events = drain_events(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::Sleeping { duration, .. } if *duration == INTERVAL
    )));
    assert!(client.updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sleeps_full_interval_after_recoverable_error() {
    let resolver = StaticIpResolver::failing();
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    let (shutdown_tx, handle, mut events) = spawn_engine(&resolver, &client);

    assert_cycles_every_interval(&client).await;

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("recoverable errors never end the loop");

    let failures = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::CycleFailed { .. }))
        .count();
    assert_eq!(failures, 3);
}

#[tokio::test(start_paused = true)]
async fn sleeps_full_interval_after_missing_record() {
    let resolver = StaticIpResolver::new("5.6.7.8");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    client.set_lookup(Lookup::Missing);
    let (shutdown_tx, handle, _events) = spawn_engine(&resolver, &client);

    assert_cycles_every_interval(&client).await;
    assert_eq!(resolver.calls(), 0);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn sleeps_full_interval_after_stored_fetch_failure() {
    let resolver = StaticIpResolver::new("5.6.7.8");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    client.set_stored(Stored::Fails);
    let (shutdown_tx, handle, _events) = spawn_engine(&resolver, &client);

    assert_cycles_every_interval(&client).await;
    assert!(client.updates().is_empty());

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn rejected_update_keeps_loop_running() {
    let resolver = StaticIpResolver::new("5.6.7.8");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    client.set_accept_updates(false);
    let (shutdown_tx, handle, _events) = spawn_engine(&resolver, &client);

    assert_cycles_every_interval(&client).await;
    assert_eq!(client.updates().len(), 3, "write retried on every cycle");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn ip_change_between_cycles_is_picked_up() {
    let resolver = StaticIpResolver::new("1.2.3.4");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    let (shutdown_tx, handle, _events) = spawn_engine(&resolver, &client);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(client.updates().is_empty());

    resolver.set_ip("5.6.7.8");
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(
        client.updates(),
        vec![(TEST_RECORD_ID.to_string(), "5.6.7.8".to_string())]
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn not_authorized_lookup_ends_loop_without_sleeping() {
    let resolver = StaticIpResolver::new("1.2.3.4");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    client.set_lookup(Lookup::NotAuthorized);
    let (_shutdown_tx, handle, mut events) = spawn_engine(&resolver, &client);

    let err = handle
        .await
        .unwrap()
        .expect_err("404 on lookup is fatal");

    assert!(err.is_fatal());
    assert!(matches!(err, cfddns_core::Error::Authentication(_)));
    assert_eq!(client.lookup_calls(), 1);
    assert_eq!(resolver.calls(), 0);

    let events = drain_events(&mut events);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EngineEvent::Sleeping { .. })),
        "fatal path must not sleep: {:?}",
        events
    );
    assert!(matches!(events.last(), Some(EngineEvent::Stopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn other_lookup_failures_end_loop() {
    for lookup in [Lookup::Status(403), Lookup::Status(502), Lookup::Unreachable] {
        let resolver = StaticIpResolver::new("1.2.3.4");
        let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
        client.set_lookup(lookup.clone());
        let (_shutdown_tx, handle, _events) = spawn_engine(&resolver, &client);

        let result = handle.await.unwrap();
        assert!(
            matches!(result, Err(ref e) if e.is_fatal()),
            "{:?} should end the loop, got {:?}",
            lookup,
            result
        );
        assert_eq!(client.lookup_calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_sleep_stops_cleanly() {
    let resolver = StaticIpResolver::new("1.2.3.4");
    let client = ScriptedRecordClient::with_stored_ip("1.2.3.4");
    let (shutdown_tx, handle, mut events) = spawn_engine(&resolver, &client);

    tokio::time::sleep(Duration::from_secs(10)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "engine should stop promptly");
    result.unwrap().unwrap().expect("clean shutdown");

    assert_eq!(client.lookup_calls(), 1);
    let events = drain_events(&mut events);
    assert!(matches!(events.first(), Some(EngineEvent::Started { .. })));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::Stopped {
            reason: "Shutdown signal".to_string()
        })
    );
}
