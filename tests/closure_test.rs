#[macro_use]
mod common;

use actix_web::test;
use common::*;
use serde_json::{Value, json};
use uuid::Uuid;

use political_ledger::errors::AppError;
use political_ledger::models::closure::ClosureStatus;
use political_ledger::models::closure::queries as closure_queries;

#[tokio::test]
async fn test_archive_without_closure_row_fails() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let org = insert_organization(pool, Uuid::new_v4(), "Org A").await;

    let err = closure_queries::archive(pool, org, 2024).await.unwrap_err();
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("not found"), "message: {msg}"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    assert_eq!(closure_status(pool, org, 2024).await, None);

    db.cleanup().await;
}

#[tokio::test]
async fn test_archive_locks_closed_year() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let org = insert_organization(pool, Uuid::new_v4(), "Org A").await;
    insert_closure(pool, org, 2024, "closed").await;

    let archived = closure_queries::archive(pool, org, 2024).await.unwrap();
    assert_eq!(archived.status, ClosureStatus::Locked);
    assert!(archived.locked_at.is_some());
    assert_eq!(closure_status(pool, org, 2024).await.as_deref(), Some("locked"));

    db.cleanup().await;
}

#[tokio::test]
async fn test_archive_rejects_every_other_status_without_change() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let org = insert_organization(pool, Uuid::new_v4(), "Org A").await;
    let statuses = ["open", "locked", "temporary_unlock"];
    for (i, status) in statuses.iter().enumerate() {
        insert_closure(pool, org, 2020 + i as i32, status).await;
    }

    for (i, status) in statuses.iter().enumerate() {
        let year = 2020 + i as i32;
        let err = closure_queries::archive(pool, org, year).await.unwrap_err();
        match err {
            AppError::InvalidState(msg) => assert!(msg.contains(status), "message: {msg}"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
        assert_eq!(closure_status(pool, org, year).await.as_deref(), Some(*status));
    }

    db.cleanup().await;
}

#[tokio::test]
async fn test_close_creates_row_then_refuses_twice() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let org = insert_organization(pool, Uuid::new_v4(), "Org A").await;

    let closed = closure_queries::close(pool, org, 2024).await.unwrap();
    assert_eq!(closed.status, ClosureStatus::Closed);
    assert!(closed.closed_at.is_some());

    let err = closure_queries::close(pool, org, 2024).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let archived = closure_queries::archive(pool, org, 2024).await.unwrap();
    assert_eq!(archived.status, ClosureStatus::Locked);

    let rows = closure_queries::find_for_organization(pool, org).await.unwrap();
    assert_eq!(rows.len(), 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_close_reopens_open_row() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let org = insert_organization(pool, Uuid::new_v4(), "Org A").await;
    insert_closure(pool, org, 2023, "open").await;
    insert_closure(pool, org, 2024, "open").await;

    closure_queries::close(pool, org, 2023).await.unwrap();
    let rows = closure_queries::find_for_organization(pool, org).await.unwrap();
    let years: Vec<i32> = rows.iter().map(|r| r.fiscal_year).collect();
    assert_eq!(years, vec![2024, 2023]);
    assert_eq!(rows[1].status, ClosureStatus::Closed);

    db.cleanup().await;
}

fn closure_request(path: &str, user: Uuid, organization_id: Uuid, year: i32) -> test::TestRequest {
    test::TestRequest::post()
        .uri(path)
        .insert_header((TEST_USER_HEADER, user.to_string()))
        .set_json(json!({ "organization_id": organization_id, "year": year }))
}

#[actix_rt::test]
async fn test_archive_endpoint_checks_organization_and_owner() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
    let org = insert_organization(pool, owner, "Org").await;
    insert_closure(pool, org, 2024, "closed").await;
    let app = api_app!(pool);

    let req = closure_request("/api/closures/archive", owner, Uuid::new_v4(), 2024).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    for path in ["/api/closures/archive", "/api/closures/close"] {
        let req = closure_request(path, stranger, org, 2024).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403, "{path}");
    }
    assert_eq!(closure_status(pool, org, 2024).await.as_deref(), Some("closed"));

    let req = test::TestRequest::post()
        .uri("/api/closures/archive")
        .set_json(json!({ "organization_id": org, "year": 2024 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    db.cleanup().await;
}

#[actix_rt::test]
async fn test_close_then_archive_over_http_is_audited() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let owner = Uuid::new_v4();
    let org = insert_organization(pool, owner, "Org").await;
    let app = api_app!(pool);

    let req = closure_request("/api/closures/archive", owner, org, 2024).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("Current status: not found"));

    let req = closure_request("/api/closures/close", owner, org, 2024).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "closed");

    let req = closure_request("/api/closures/archive", owner, org, 2024).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "locked");
    assert!(!body["data"]["locked_at"].is_null());

    let req = closure_request("/api/closures/archive", owner, org, 2024).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("Current status: locked"));

    assert_eq!(
        audit_actions(pool, org).await,
        vec!["year_closure.closed".to_string(), "year_closure.archived".to_string()]
    );

    db.cleanup().await;
}
