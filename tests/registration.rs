//! Trigger service client calls against the mock service.

use std::time::Duration;

use serde_json::json;
use url::Url;

use trigger_launcher::package::PackageId;
use trigger_launcher::registration::{Registration, RegistrationClient};
use trigger_launcher::LauncherError;

mod common;

use common::{local_addr, start_mock_service, trigger_started, MockService, DROP_CONNECTION};

fn client_for(service: &MockService) -> RegistrationClient {
    let url = Url::parse(&format!("http://{}", service.addr)).unwrap();
    RegistrationClient::with_base_url(url, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn status_fetches_trigger_document() {
    let service = start_mock_service(local_addr(0), |_, _| {
        (
            200,
            json!({"status": 200, "result": {"triggerId": "t-1", "status": "running"}}).to_string(),
        )
    })
    .await;

    let document = client_for(&service).status("t-1").await.unwrap();
    assert_eq!(document["result"]["status"], "running");

    let requests = service.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/v1/triggers/t-1");
}

#[tokio::test]
async fn stop_sends_delete() {
    let service = start_mock_service(local_addr(0), |_, _| {
        (200, json!({"status": 200, "result": {"triggerId": "t-9"}}).to_string())
    })
    .await;

    let document = client_for(&service).stop("t-9").await.unwrap();
    assert_eq!(document["result"]["triggerId"], "t-9");

    let requests = service.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/v1/triggers/t-9");
}

#[tokio::test]
async fn unknown_trigger_is_service_error() {
    let service = start_mock_service(local_addr(0), |_, _| {
        (404, json!({"status": 404, "errors": ["unknown trigger"]}).to_string())
    })
    .await;

    let err = client_for(&service).status("missing").await.unwrap_err();
    assert!(matches!(err, LauncherError::Service(ref reason) if reason.contains("404")));
}

#[tokio::test]
async fn dropped_connection_is_registration_error() {
    let service = start_mock_service(local_addr(0), |_, _| (DROP_CONNECTION, String::new())).await;
    let registration = Registration::new("Alice", PackageId::new("pkg"), "Main:trigger");

    let err = client_for(&service).register(&registration).await.unwrap_err();
    match err {
        LauncherError::Registration { party, trigger, reason } => {
            assert_eq!(party, "Alice");
            assert_eq!(trigger, "Main:trigger");
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.request_count(), 1);
}

#[tokio::test]
async fn register_all_keeps_order_and_ids() {
    let service = start_mock_service(local_addr(0), |i, _| trigger_started(i)).await;
    let package = PackageId::new("pkg");
    let registrations = vec![
        Registration::new("Buyer", package.clone(), "M:a"),
        Registration::new("Seller", package, "M:b"),
    ];

    let registered = client_for(&service).register_all(&registrations).await.unwrap();
    let ids: Vec<_> = registered.iter().map(|r| r.trigger_id.as_deref()).collect();
    assert_eq!(ids, [Some("trigger-0"), Some("trigger-1")]);

    let parties: Vec<_> = service.requests().iter().map(|r| r.json()["party"].clone()).collect();
    assert_eq!(parties, [json!("Buyer"), json!("Seller")]);
}
