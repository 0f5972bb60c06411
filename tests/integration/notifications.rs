//! Fan-out and cooldown against webhook mocks

use assert_matches::assert_matches;
use fleetwatch::config::{NotifyConfig, SlackConfig, TelegramConfig};
use fleetwatch::notify::{Notifier, NotifyError, build_notifier};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> NotifyConfig {
    NotifyConfig {
        cooldown_secs: 1800,
        slack: Some(SlackConfig {
            webhook_url: format!("{}/slack", server.uri()),
        }),
        telegram: Some(TelegramConfig {
            bot_token: "T0K3N".to_string(),
            chat_id: "42".to_string(),
            api_base: server.uri(),
        }),
        ..Default::default()
    }
}

async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == endpoint)
        .count()
}

#[tokio::test]
async fn test_partial_failure_reaches_healthy_channel_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botT0K3N/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = build_notifier(&config(&server));

    let err = notifier
        .send("[ALERT] db-1 CPU high", "CPU used 97.0%")
        .await
        .unwrap_err();
    assert_matches!(&err, NotifyError::Partial(_));
    assert_eq!(err.failed_channels(), vec!["slack"]);
    assert_eq!(requests_to(&server, "/botT0K3N/sendMessage").await, 1);

    // a failed delivery does not start the cooldown
    let _ = notifier.send("[ALERT] db-1 CPU high", "CPU used 97.0%").await;
    assert_eq!(requests_to(&server, "/slack").await, 2);
    assert_eq!(requests_to(&server, "/botT0K3N/sendMessage").await, 2);
}

#[tokio::test]
async fn test_repeat_within_window_is_suppressed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = build_notifier(&config(&server));

    notifier.send("[ALERT] a memory high", "x").await.unwrap();
    notifier.send("[ALERT] a memory high", "x").await.unwrap();
    notifier.send("[ALERT] b memory high", "x").await.unwrap();

    assert_eq!(requests_to(&server, "/slack").await, 2);
    assert_eq!(requests_to(&server, "/botT0K3N/sendMessage").await, 2);
}
