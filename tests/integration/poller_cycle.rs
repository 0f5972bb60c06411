//! Full poll cycles against a fake collector

use std::sync::Arc;

use fleetwatch::actors::{CycleReport, HubHandle, PollerHandle};
use fleetwatch::alerts::AlertKey;
use fleetwatch::storage::{InMemoryStore, MetricsStore};
use pretty_assertions::assert_eq;

use crate::helpers::{FakeCollector, RecordingNotifier, endpoints, metrics, poller};

#[tokio::test]
async fn test_fifty_agents_with_failures() {
    let agents = endpoints(50);
    let collector = Arc::new(FakeCollector::new());
    for (i, endpoint) in agents.iter().enumerate() {
        if i % 5 != 0 {
            collector.set(endpoint, metrics(&format!("host-{i}"), 10.0, 20));
        }
    }

    let hub = HubHandle::spawn(16);
    let mut subscription = hub.subscribe().await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(agents.clone(), collector.clone(), notifier.clone(), hub);

    let report = poller.run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            succeeded: 40,
            failed: 10
        }
    );
    assert_eq!(collector.calls(), 50);

    let (_, latest) = poller.snapshot().await;
    assert_eq!(latest.len(), 40);
    assert!(!latest.contains_key(&agents[0]));

    let frame = subscription.recv().await.unwrap();
    let event: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(event["type"], "metrics_update");
    assert_eq!(event["data"].as_object().unwrap().len(), 40);

    assert!(notifier.subjects().is_empty());

    // second cycle: a quarter of the survivors go dark, the rest report fresh data
    for (i, endpoint) in agents.iter().enumerate() {
        match i % 5 {
            0 => {}
            1 => collector.fail(endpoint),
            _ => collector.set(endpoint, metrics(&format!("host-{i}-b"), 30.0, 40)),
        }
    }

    let report = poller.run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            succeeded: 30,
            failed: 20
        }
    );

    let (_, second) = poller.snapshot().await;
    assert_eq!(second.len(), 40);
    for (i, endpoint) in agents.iter().enumerate() {
        match i % 5 {
            0 => assert!(!second.contains_key(endpoint)),
            1 => assert_eq!(second[endpoint], latest[endpoint]),
            _ => {
                assert_eq!(second[endpoint].hostname, format!("host-{i}-b"));
                assert_eq!(second[endpoint].cpu.used_percent, 30.0);
            }
        }
    }
}

#[tokio::test]
async fn test_alert_lifecycle_across_cycles() {
    let agents = endpoints(1);
    let endpoint = agents[0].clone();
    let collector = Arc::new(FakeCollector::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(InMemoryStore::new());
    let poller = poller(agents, collector.clone(), notifier.clone(), HubHandle::spawn(16))
        .with_store(store.clone());

    collector.set(&endpoint, metrics("web-1", 95.0, 20));
    poller.run_cycle().await;
    poller.run_cycle().await;

    assert_eq!(notifier.subjects(), vec!["[ALERT] web-1 CPU high"]);
    assert!(poller.alerts().await.contains(&AlertKey::cpu(&endpoint)));
    assert_eq!(store.alerts().await.unwrap(), vec![AlertKey::cpu(&endpoint)]);

    // an unreachable agent keeps its alert
    collector.fail(&endpoint);
    poller.run_cycle().await;
    assert!(poller.alerts().await.contains(&AlertKey::cpu(&endpoint)));

    collector.set(&endpoint, metrics("web-1", 40.0, 20));
    poller.run_cycle().await;

    assert_eq!(
        notifier.subjects(),
        vec!["[ALERT] web-1 CPU high", "[RECOVERED] web-1 CPU"]
    );
    assert!(poller.alerts().await.is_empty());
    assert!(store.alerts().await.unwrap().is_empty());
    assert!(store.last_update(&endpoint).await.unwrap().is_some());
}

#[tokio::test]
async fn test_handle_polls_and_stops() {
    let agents = endpoints(3);
    let collector = Arc::new(FakeCollector::new());
    for endpoint in &agents {
        collector.set(endpoint, metrics("h", 1.0, 1));
    }
    let hub = HubHandle::spawn(16);
    let mut subscription = hub.subscribe().await.unwrap();
    let poller = poller(
        agents,
        collector.clone(),
        Arc::new(RecordingNotifier::default()),
        hub,
    );

    let handle = PollerHandle::spawn(poller);

    // the immediate first tick ends with a full state publish
    let frame = subscription.recv().await.unwrap();
    assert!(frame.contains("metrics_update"));
    assert_eq!(collector.calls(), 3);

    let report = handle.poll_now().await.unwrap();

    assert_eq!(report.succeeded, 3);
    assert_eq!(collector.calls(), 6);

    handle.shutdown().await.unwrap();
    assert!(handle.poll_now().await.is_err());
}

#[tokio::test]
async fn test_closed_store_does_not_stop_cycle() {
    let agents = endpoints(2);
    let collector = Arc::new(FakeCollector::new());
    for endpoint in &agents {
        collector.set(endpoint, metrics("h", 95.0, 20));
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(InMemoryStore::new());
    let poller = poller(agents.clone(), collector, notifier.clone(), HubHandle::spawn(16))
        .with_store(store.clone());

    store.close().await;
    let report = poller.run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            succeeded: 2,
            failed: 0
        }
    );
    assert_eq!(poller.snapshot().await.1.len(), 2);
    assert_eq!(notifier.subjects().len(), 2);
    assert!(store.get_all().await.is_err());
}
