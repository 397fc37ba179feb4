use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use political_ledger::auth::client::{AuthClient, AuthError};

#[tokio::test]
async fn test_update_user_metadata_merges_under_data() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer user-token"))
        .and(body_json(json!({ "data": { "full_name": "Ren Sato" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "email": "ren@example.org",
            "user_metadata": { "full_name": "Ren Sato" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AuthClient::new(server.uri().parse().unwrap(), "anon-key", 5).unwrap();
    let record = client
        .update_user_metadata("user-token", json!({ "full_name": "Ren Sato" }))
        .await
        .unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.display_name(), "Ren Sato");
}

#[tokio::test]
async fn test_rejected_token_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad jwt"))
        .mount(&server)
        .await;

    let client = AuthClient::new(server.uri().parse().unwrap(), "anon-key", 5).unwrap();
    match client.get_user("nope").await.unwrap_err() {
        AuthError::Rejected { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "bad jwt");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}
