use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, middleware, test, web};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use political_ledger::auth::client::AuthClient;
use political_ledger::auth::middleware::require_auth;
use political_ledger::auth::session::{ACCESS_COOKIE, AuthUser, REFRESH_COOKIE};

async fn whoami(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "id": user.id, "display_name": user.display_name }))
}

fn auth_client(server: &MockServer) -> web::Data<AuthClient> {
    web::Data::new(AuthClient::new(server.uri().parse().unwrap(), "anon-key", 5).unwrap())
}

async fn mount_user(server: &MockServer, token: &str, id: Uuid, metadata: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "email": "treasurer@example.org",
            "user_metadata": metadata
        })))
        .mount(server)
        .await;
}

macro_rules! gated_app {
    ($server:expr) => {
        test::init_service(
            App::new()
                .wrap(middleware::from_fn(require_auth))
                .app_data(auth_client($server))
                .route("/api/whoami", web::get().to(whoami))
                .route("/dashboard", web::get().to(whoami))
                .route("/welcome", web::get().to(|| async { HttpResponse::Ok().body("hi") })),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_missing_session_is_401_for_api_and_redirect_for_pages() {
    let server = MockServer::start().await;
    let app = gated_app!(&server);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/whoami").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/dashboard").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "/login?redirect=%2Fdashboard"
    );

    let resp = test::call_service(&app, test::TestRequest::get().uri("/welcome").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_valid_access_token_reaches_handler() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    mount_user(&server, "good-token", id, json!({ "full_name": "Aoi Tanaka" })).await;
    let app = gated_app!(&server);

    let req = test::TestRequest::get()
        .uri("/api/whoami")
        .cookie(Cookie::new(ACCESS_COOKIE, "good-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["display_name"], "Aoi Tanaka");
}

#[actix_rt::test]
async fn test_pending_review_users_are_redirected() {
    let server = MockServer::start().await;
    mount_user(
        &server,
        "pending-token",
        Uuid::new_v4(),
        json!({ "registration_status": "pending_review" }),
    )
    .await;
    let app = gated_app!(&server);

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(ACCESS_COOKIE, "pending-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("Location").unwrap(), "/pending-review");
}

#[actix_rt::test]
async fn test_rejected_access_token_falls_back_to_refresh() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "expired" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "old-refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "user": { "id": id, "user_metadata": {} }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = gated_app!(&server);

    let req = test::TestRequest::get()
        .uri("/api/whoami")
        .cookie(Cookie::new(ACCESS_COOKIE, "expired-token"))
        .cookie(Cookie::new(REFRESH_COOKIE, "old-refresh"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<(String, String)> = resp
        .response()
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect();
    assert!(cookies.contains(&(ACCESS_COOKIE.to_string(), "new-access".to_string())));
    assert!(cookies.contains(&(REFRESH_COOKIE.to_string(), "new-refresh".to_string())));
}

#[actix_rt::test]
async fn test_failed_refresh_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;
    let app = gated_app!(&server);

    let req = test::TestRequest::get()
        .uri("/api/whoami")
        .cookie(Cookie::new(REFRESH_COOKIE, "revoked"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
