// Integration tests for `FirebaseStore` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use blindstick::Error;
use blindstick::model::Section;
use blindstick::normalize::normalize;
use blindstick::store::{FirebaseStore, Store, read_snapshot};

async fn setup() -> (MockServer, FirebaseStore) {
    let server = MockServer::start().await;
    let store = FirebaseStore::new(&server.uri(), Some("test-secret".to_string()));
    (server, store)
}

#[tokio::test]
async fn test_get_passes_auth() {
    let (server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/system.json"))
        .and(query_param("auth", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ACTIVE",
            "battery": 64,
            "signal": "Weak"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = store.get("system").await.unwrap().unwrap();

    assert_eq!(value["battery"], 64);
}

#[tokio::test]
async fn test_get_null_is_missing() {
    let (server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/location.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    assert!(store.get("location").await.unwrap().is_none());
}

#[tokio::test]
async fn test_put_and_patch_send_body() {
    let (server, store) = setup().await;
    let entry = json!({ "1700000000000": "🚨 Emergency at 22:13:20 - Ipoh" });

    Mock::given(method("PUT"))
        .and(path("/sensors.json"))
        .and(body_json(json!({ "distance": 15, "alert_count": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "distance": 15, "alert_count": 3 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/alerts/history.json"))
        .and(body_json(entry.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry.clone()))
        .expect(1)
        .mount(&server)
        .await;

    store
        .put("sensors", &json!({ "distance": 15, "alert_count": 3 }))
        .await
        .unwrap();
    store.patch("alerts/history", &entry).await.unwrap();
}

#[tokio::test]
async fn test_http_error_is_store_error() {
    let (server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alerts.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })))
        .mount(&server)
        .await;

    let err = store.get("alerts").await.unwrap_err();

    match err {
        Error::Store { path, message } => {
            assert_eq!(path, "alerts");
            assert!(message.contains("401"), "{message}");
        }
        other => panic!("expected a store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_outage_defaults_missing_sections() {
    let (server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "distance": 25 })))
        .mount(&server)
        .await;
    // Every other section fails.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let raw = read_snapshot(&store).await.unwrap();
    assert!(raw.get(Section::System).is_none());

    let snapshot = normalize(&raw);
    assert_eq!(snapshot.sensors.distance, 25);
    assert_eq!(snapshot.sensors.alert_count, 0);
    assert_eq!(snapshot.system.battery, 85);
}

#[tokio::test]
async fn test_total_outage_is_unavailable() {
    let (server, store) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = read_snapshot(&store).await.unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable { .. }));
}

#[tokio::test]
async fn test_unreachable_error_hides_secret() {
    let store = FirebaseStore::new("http://127.0.0.1:9", Some("test-secret".to_string()));

    let err = read_snapshot(&store).await.unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(!err.to_string().contains("test-secret"), "{err}");
}
