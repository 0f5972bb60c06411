//! Slow subscribers never hold back fast ones

use std::time::Duration;

use fleetwatch::actors::{HubHandle, HubMessage};
use fleetwatch::actors::messages::AlertType;
use pretty_assertions::assert_eq;

fn alert(i: usize) -> HubMessage {
    HubMessage::Alert {
        alert_type: AlertType::Alert,
        subject: format!("[ALERT] host-{i} CPU high"),
        message: String::new(),
    }
}

#[tokio::test]
async fn test_slow_subscriber_is_dropped_while_fast_one_keeps_up() {
    let hub = HubHandle::spawn(4);
    let mut fast = hub.subscribe().await.unwrap();
    let mut slow = hub.subscribe().await.unwrap();

    for i in 0..20 {
        assert!(hub.publish(alert(i)));
        let frame = tokio::time::timeout(Duration::from_secs(1), fast.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains(&format!("host-{i}")));
    }

    assert_eq!(hub.subscriber_count().await.unwrap(), 1);

    let mut buffered = 0;
    while slow.recv().await.is_some() {
        buffered += 1;
    }
    assert_eq!(buffered, 4);
}

#[tokio::test]
async fn test_late_subscriber_only_sees_new_events() {
    let hub = HubHandle::spawn(8);
    hub.publish(alert(0));

    let mut late = hub.subscribe().await.unwrap();
    hub.publish(alert(1));

    let frame = late.recv().await.unwrap();
    assert!(frame.contains("host-1"));
    assert!(late.try_recv().is_none());
}
