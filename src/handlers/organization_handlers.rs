use actix_web::{HttpResponse, web};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::access;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::hub::HubClient;
use crate::models::ledger::LedgerRef;
use crate::models::member::Permission;
use crate::models::organization::{self, NewOrganization};

/// GET /api/organizations - Organizations owned by the caller
pub async fn list(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let organizations = organization::find_owned(&pool, user.scope.owner_filter()).await?;
    Ok(ok(organizations))
}

/// POST /api/organizations - Open an organization ledger owned by the caller
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewOrganization>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let name = body.name.as_deref().unwrap_or_default();

    let org = organization::create(&pool, user.id, name).await?;
    log::info!("Organization {} created by {}", org.id, user.id);
    audit::record(
        pool.get_ref(),
        user.id,
        "organization.created",
        "organization",
        org.id,
        json!({ "name": org.name }),
    )
    .await;

    Ok(created(org))
}

/// GET /api/organizations/{id} - Visible to the owner and members
pub async fn read(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    access::require_permission(&pool, &user, LedgerRef::Organization(id), Permission::ViewLedger)
        .await?;

    let org = organization::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    Ok(ok(org))
}

/// GET /api/hub/organizations/{id} - Public record of an organization on the Hub
pub async fn read_hub(
    hub: web::Data<HubClient>,
    _user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let org = hub.get_organization(&path.into_inner()).await?;
    Ok(ok(org))
}

/// PUT /api/organizations/{id} - Forward public details to the Hub's record `{id}`
///
/// The Hub validates the body; its verdict is relayed as-is.
pub async fn update_hub(
    hub: web::Data<HubClient>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if !body.is_object() {
        return Err(AppError::Validation("Request body must be a JSON object".to_string()));
    }

    let updated = hub.update_organization(&id, &body).await?;
    log::info!("Hub organization {id} updated by {}", user.id);
    Ok(ok(updated))
}
