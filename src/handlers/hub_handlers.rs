use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};

use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::hub::{HubClient, NewElectionRequest, NewOrganizationRequest, RequestFilter, UploadRelay};

/// GET /api/organization-requests?politician_id=&status= - Review status of registration requests
pub async fn list_organization_requests(
    hub: web::Data<HubClient>,
    _user: AuthUser,
    query: web::Query<RequestFilter>,
) -> Result<HttpResponse, AppError> {
    let requests = hub.list_organization_requests(&query).await?;
    Ok(ok(requests))
}

/// POST /api/organization-requests - Ask the Hub to register a new organization
pub async fn create_organization_request(
    hub: web::Data<HubClient>,
    user: AuthUser,
    body: web::Json<NewOrganizationRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let mut request = body.into_inner();
    if request.requested_by_email.is_none() {
        request.requested_by_email = user.email.clone();
    }

    let submitted = hub.create_organization_request(&request).await?;
    log::info!("Organization request {} submitted by {}", submitted.id, user.id);
    Ok(created(submitted))
}

/// GET /api/election-requests?politician_id=&status=
pub async fn list_election_requests(
    hub: web::Data<HubClient>,
    _user: AuthUser,
    query: web::Query<RequestFilter>,
) -> Result<HttpResponse, AppError> {
    let requests = hub.list_election_requests(&query).await?;
    Ok(ok(requests))
}

/// POST /api/election-requests - Ask the Hub to register a new election
pub async fn create_election_request(
    hub: web::Data<HubClient>,
    user: AuthUser,
    body: web::Json<NewElectionRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let mut request = body.into_inner();
    if request.requested_by_email.is_none() {
        request.requested_by_email = user.email.clone();
    }

    let submitted = hub.create_election_request(&request).await?;
    log::info!("Election request {} submitted by {}", submitted.id, user.id);
    Ok(created(submitted))
}

/// POST /api/uploads/image - Relay a multipart upload to the Hub verbatim
pub async fn upload_image(
    hub: web::Data<HubClient>,
    _user: AuthUser,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("multipart/form-data"))
        .ok_or_else(|| {
            AppError::Validation("Content-Type must be multipart/form-data".to_string())
        })?;

    let relay = hub.relay_upload(content_type, body).await?;
    Ok(relayed(relay))
}

/// Rebuild the Hub's answer; an unknown status becomes a 502.
fn relayed(relay: UploadRelay) -> HttpResponse {
    let status = StatusCode::from_u16(relay.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = HttpResponse::build(status);
    if let Some(content_type) = relay.content_type {
        response.content_type(content_type);
    }
    response.body(relay.body)
}
