// Integration tests for `TelegramChannel` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use blindstick::Error;
use blindstick::notifier::{NotificationChannel, OutboundMessage, TelegramChannel};

const TOKEN: &str = "123456:test-token";

async fn setup() -> (MockServer, TelegramChannel) {
    let server = MockServer::start().await;
    let channel = TelegramChannel::with_base_url(&server.uri(), TOKEN, "987654");
    (server, channel)
}

#[tokio::test]
async fn test_deliver_plain_message() {
    let (server, channel) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": "987654",
            "text": "🚨 EMERGENCY ALERT!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    channel
        .deliver(&OutboundMessage::plain("🚨 EMERGENCY ALERT!"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_markdown_sets_parse_mode() {
    let (server, channel) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({ "parse_mode": "Markdown" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = channel
        .deliver(&OutboundMessage::markdown("🚨 *EMERGENCY ALERT*"))
        .await;

    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_non_200_is_delivery_failure() {
    let (server, channel) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let err = channel
        .deliver(&OutboundMessage::plain("hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DeliveryFailure(ref reason) if reason.contains("400")));
}

#[tokio::test]
async fn test_unreachable_is_delivery_failure_without_token() {
    let channel = TelegramChannel::with_base_url("http://127.0.0.1:9", TOKEN, "987654");

    let err = channel
        .deliver(&OutboundMessage::plain("hello"))
        .await
        .unwrap_err();

    match err {
        Error::DeliveryFailure(reason) => {
            assert!(!reason.contains("test-token"), "{reason}");
        }
        other => panic!("expected a delivery failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_delivery_failure_without_token() {
    let (server, channel) = setup().await;
    let channel = channel.with_timeout(Duration::from_millis(50));

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = channel
        .deliver(&OutboundMessage::plain("hello"))
        .await
        .unwrap_err();

    match err {
        Error::DeliveryFailure(reason) => {
            assert!(!reason.contains("test-token"), "{reason}");
        }
        other => panic!("expected a delivery failure, got {other:?}"),
    }
}
