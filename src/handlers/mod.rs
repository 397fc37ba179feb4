pub mod closure_handlers;
pub mod contact_handlers;
pub mod election_handlers;
pub mod export_handlers;
pub mod hub_handlers;
pub mod journal_handlers;
pub mod member_handlers;
pub mod organization_handlers;
pub mod profile_handlers;
pub mod sub_account_handlers;
pub mod sync_handlers;
pub mod transfer_handlers;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header},
    middleware::{Next, from_fn},
    web,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, ApiErrorResponse};
use crate::models::ledger::LedgerRef;

/// Largest multipart body relayed to the Hub.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Success body shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(DataResponse { data })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(DataResponse { data })
}

/// `?organization_id=` / `?election_id=` selector used by ledger-scoped lists.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerQuery {
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
}

impl LedgerQuery {
    pub fn ledger(&self) -> Result<LedgerRef, AppError> {
        LedgerRef::from_ids(self.organization_id, self.election_id)
    }
}

/// CSRF protection for mutation endpoints.
///
/// Rejects POST/PUT/DELETE requests with a body that don't carry
/// `Content-Type: application/json`. Browsers cannot send cross-origin JSON
/// with cookies via a simple form post. GET requests and body-less
/// transitions (accept, approve, sync) are exempt.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    let is_mutation = method == Method::POST || method == Method::PUT || method == Method::DELETE;
    if is_mutation && has_body(&req) {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// A request carries a body when it is chunked or declares a non-zero length.
fn has_body(req: &ServiceRequest) -> bool {
    let headers = req.headers();
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().parse::<u64>().map_or(true, |len| len > 0))
        .unwrap_or(false)
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid JSON body: {err}")).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query string: {err}")).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Not found".to_string()).into())
}

/// GET /health - Liveness plus a database round trip
pub async fn health(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(e) => {
            log::error!("Health check failed: {e}");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "unavailable" }))
        }
    }
}

/// Configure every route. The upload relay is registered ahead of `/api`
/// because it carries multipart bodies the JSON guard would reject.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));

    cfg.service(
        web::scope("/api/uploads")
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .route("/image", web::post().to(hub_handlers::upload_image)),
    );

    cfg.service(
        web::scope("/api")
            .wrap(from_fn(require_json_content_type))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            // Year closures
            .route("/closures", web::get().to(closure_handlers::list))
            .route("/closures/close", web::post().to(closure_handlers::close))
            .route("/closures/archive", web::post().to(closure_handlers::archive))
            // Ownership transfers
            .route("/ownership-transfers", web::get().to(transfer_handlers::incoming))
            .route("/ownership-transfers", web::post().to(transfer_handlers::create))
            .route("/ownership-transfers/{id}", web::delete().to(transfer_handlers::cancel))
            .route("/ownership-transfers/{id}/accept", web::post().to(transfer_handlers::accept))
            .route("/ownership-transfers/{id}/decline", web::post().to(transfer_handlers::decline))
            // Members
            .route("/members", web::get().to(member_handlers::list))
            .route("/members", web::post().to(member_handlers::create))
            .route("/members/{id}", web::put().to(member_handlers::update))
            .route("/members/{id}", web::delete().to(member_handlers::delete))
            // Journals
            .route("/journals", web::get().to(journal_handlers::list))
            .route("/journals", web::post().to(journal_handlers::create))
            .route("/journals/{id}", web::get().to(journal_handlers::read))
            .route("/journals/{id}", web::put().to(journal_handlers::update))
            .route("/journals/{id}", web::delete().to(journal_handlers::delete))
            .route("/journals/{id}/approve", web::post().to(journal_handlers::approve))
            .route("/journals/{id}/receipts", web::get().to(journal_handlers::list_receipts))
            .route("/journals/{id}/receipts", web::post().to(journal_handlers::add_receipt))
            // Contacts
            .route("/contacts", web::get().to(contact_handlers::list))
            .route("/contacts", web::post().to(contact_handlers::create))
            .route("/contacts/{id}", web::get().to(contact_handlers::read))
            .route("/contacts/{id}", web::put().to(contact_handlers::update))
            .route("/contacts/{id}", web::delete().to(contact_handlers::delete))
            // Sub-accounts
            .route("/sub-accounts", web::get().to(sub_account_handlers::list))
            .route("/sub-accounts", web::post().to(sub_account_handlers::create))
            .route("/sub-accounts/{id}", web::get().to(sub_account_handlers::read))
            .route("/sub-accounts/{id}", web::put().to(sub_account_handlers::rename))
            .route("/sub-accounts/{id}", web::delete().to(sub_account_handlers::delete))
            // Organizations; PUT addresses the Hub record, not the local row
            .route("/organizations", web::get().to(organization_handlers::list))
            .route("/organizations", web::post().to(organization_handlers::create))
            .route("/organizations/{id}", web::get().to(organization_handlers::read))
            .route("/organizations/{id}", web::put().to(organization_handlers::update_hub))
            .route("/hub/organizations/{id}", web::get().to(organization_handlers::read_hub))
            // Elections and politicians
            .route("/elections", web::get().to(election_handlers::list))
            .route("/elections", web::post().to(election_handlers::create))
            .route("/elections/{id}", web::get().to(election_handlers::read))
            .route("/politicians", web::get().to(election_handlers::list_politicians))
            .route("/politicians/{id}", web::get().to(election_handlers::read_politician))
            // Profile
            .route("/profile", web::get().to(profile_handlers::read))
            .route("/profile", web::put().to(profile_handlers::update))
            // Hub registration requests
            .route("/organization-requests", web::get().to(hub_handlers::list_organization_requests))
            .route("/organization-requests", web::post().to(hub_handlers::create_organization_request))
            .route("/election-requests", web::get().to(hub_handlers::list_election_requests))
            .route("/election-requests", web::post().to(hub_handlers::create_election_request))
            // Publishing and export
            .route("/sync", web::post().to(sync_handlers::run))
            .route("/sync/status", web::get().to(sync_handlers::status))
            .route("/export", web::get().to(export_handlers::json_export))
            .route("/export-csv", web::get().to(export_handlers::csv_export)),
    );
}
