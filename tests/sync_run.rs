//! End-to-end sync against a mocked Cloudflare API using the key fixtures

use serde_json::json;
use std::path::PathBuf;
use tlsa_sync::config::{DEFAULT_PORT, DEFAULT_PROTOCOL};
use tlsa_sync::{derive, CloudflareClient, Config, Reconciler, SyncError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str = "zone123";
const NAME: &str = "_25._tcp.mail.example.com";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn config(server: &MockServer) -> Config {
    Config {
        current_key: fixture("rsa_pkcs1.pem"),
        next_key: fixture("ec_p256.pem"),
        zone_id: ZONE.to_string(),
        api_token: "test-token".to_string(),
        domain: "mail.example.com".to_string(),
        port: DEFAULT_PORT,
        protocol: DEFAULT_PROTOCOL.to_string(),
        api_base: server.uri(),
    }
}

fn record(id: &str, certificate: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "TLSA",
        "name": NAME,
        "content": format!("3 1 1 {}", certificate),
        "data": {"usage": 3, "selector": 1, "matching_type": 1, "certificate": certificate}
    })
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    }))
}

async fn mock_list(server: &MockServer, records: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(ok(json!(records)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stale_single_record_is_recreated_in_order() {
    let server = MockServer::start().await;
    let config = config(&server);
    let current = derive(&config.current_key).unwrap();
    let next = derive(&config.next_key).unwrap();

    mock_list(&server, vec![record("old", &"0".repeat(64))]).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{}/dns_records/old", ZONE)))
        .respond_with(ok(json!({"id": "old"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(ok(record("created", &"f".repeat(64))))
        .expect(2)
        .mount(&server)
        .await;

    let reconciler = Reconciler::new(CloudflareClient::new(&config).unwrap());
    let report = reconciler.sync(&current, &next).await.unwrap();

    assert_eq!((report.deleted, report.created, report.updated), (1, 2, 0));

    let requests = server.received_requests().await.unwrap();
    let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, vec!["GET", "DELETE", "POST", "POST"]);

    let first: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&requests[3].body).unwrap();
    assert_eq!(first["data"]["certificate"], next.as_str());
    assert_eq!(second["data"]["certificate"], current.as_str());
    assert_eq!(first["name"], NAME);
}

#[tokio::test]
async fn test_foreign_pair_is_updated_slot1_first() {
    let server = MockServer::start().await;
    let config = config(&server);
    let current = derive(&config.current_key).unwrap();
    let next = derive(&config.next_key).unwrap();

    mock_list(
        &server,
        vec![record("r0", &"c".repeat(64)), record("r1", &"d".repeat(64))],
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path_regex(format!(r"^/zones/{}/dns_records/r[01]$", ZONE)))
        .respond_with(ok(record("r", &"f".repeat(64))))
        .expect(2)
        .mount(&server)
        .await;

    let reconciler = Reconciler::new(CloudflareClient::new(&config).unwrap());
    let report = reconciler.sync(&current, &next).await.unwrap();
    assert_eq!(report.updated, 2);

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/zones/zone123/dns_records",
            "/zones/zone123/dns_records/r1",
            "/zones/zone123/dns_records/r0",
        ]
    );

    let slot1: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(slot1["data"]["certificate"], next.as_str());
}

#[tokio::test]
async fn test_correct_state_issues_no_writes() {
    let server = MockServer::start().await;
    let config = config(&server);
    let current = derive(&config.current_key).unwrap();
    let next = derive(&config.next_key).unwrap();

    mock_list(
        &server,
        vec![record("r0", next.as_str()), record("r1", current.as_str())],
    )
    .await;

    let reconciler = Reconciler::new(CloudflareClient::new(&config).unwrap());
    let report = reconciler.sync(&current, &next).await.unwrap();

    assert!(report.is_unchanged());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_create_aborts_run() {
    let server = MockServer::start().await;
    let config = config(&server);
    let current = derive(&config.current_key).unwrap();
    let next = derive(&config.next_key).unwrap();

    mock_list(&server, vec![]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"success":false}"#))
        .expect(1)
        .mount(&server)
        .await;

    let reconciler = Reconciler::new(CloudflareClient::new(&config).unwrap());
    let err = reconciler.sync(&current, &next).await.unwrap_err();

    assert!(matches!(err, SyncError::Provider { status: 400, .. }));
}
