use actix_web::web::Bytes;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use political_ledger::hub::{HubClient, HubError, RequestFilter, SyncLedgerInput};

fn client(server: &MockServer) -> HubClient {
    HubClient::new(server.uri().parse().unwrap(), "hub-secret", 5).unwrap()
}

#[tokio::test]
async fn test_get_organization_sends_api_key_and_unwraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/org-7"))
        .and(header("X-API-Key", "hub-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "org-7",
                "name": "Citizens for Parks",
                "type": "support_group",
                "politician_id": "pol-1",
                "registered_at": "2023-04-01"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let org = client(&server).get_organization("org-7").await.unwrap();
    assert_eq!(org.id, "org-7");
    assert_eq!(org.organization_type, "support_group");
    assert_eq!(org.politician_id.as_deref(), Some("pol-1"));
    assert_eq!(org.extra.get("registered_at"), Some(&json!("2023-04-01")));
}

#[tokio::test]
async fn test_error_status_keeps_hub_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/organizations/org-7"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "error": "name is too long" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .update_organization("org-7", &json!({ "name": "x" }))
        .await
        .unwrap_err();
    match err {
        HubError::Api { status, message, .. } => {
            assert_eq!(status, 422);
            assert_eq!(message, "name is too long");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_requests_passes_filter_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/election-requests"))
        .and(query_param("politician_id", "pol-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = RequestFilter {
        politician_id: Some("pol-1".to_string()),
        status: None,
    };
    let requests = client(&server).list_election_requests(&filter).await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_sync_ledger_wraps_payload_and_reads_action() {
    let server = MockServer::start().await;
    let ledger = SyncLedgerInput {
        ledger_source_id: "2b1c7f0e-5a43-4c1e-9d57-1f6f8c1e2a90".to_string(),
        politician_id: Some("pol-1".to_string()),
        organization_id: Some("org-7".to_string()),
        election_id: None,
        fiscal_year: 2024,
        total_income: 150_000,
        total_expense: 42_000,
        journal_count: 3,
        is_test: false,
    };
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/ledger"))
        .and(body_json(json!({
            "ledger": {
                "ledger_source_id": "2b1c7f0e-5a43-4c1e-9d57-1f6f8c1e2a90",
                "politician_id": "pol-1",
                "organization_id": "org-7",
                "fiscal_year": 2024,
                "total_income": 150_000,
                "total_expense": 42_000,
                "journal_count": 3,
                "is_test": false
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "id": "ledger-1" }, "action": "created" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).sync_ledger(&ledger).await.unwrap();
    assert_eq!(result.action, "created");
    assert_eq!(result.data["id"], "ledger-1");
}

#[tokio::test]
async fn test_upload_relay_returns_error_statuses_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/uploads/image"))
        .and(header("content-type", "multipart/form-data; boundary=xyz"))
        .respond_with(
            ResponseTemplate::new(413).set_body_json(json!({ "error": "File too large" })),
        )
        .mount(&server)
        .await;

    let relay = client(&server)
        .relay_upload("multipart/form-data; boundary=xyz", Bytes::from_static(b"--xyz--"))
        .await
        .unwrap();
    assert_eq!(relay.status, 413);
    assert!(relay.content_type.unwrap_or_default().starts_with("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&relay.body).unwrap();
    assert_eq!(body["error"], "File too large");
}
