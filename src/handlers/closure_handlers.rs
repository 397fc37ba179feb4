use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::access;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::ok;
use crate::models::closure::queries as closure_queries;
use crate::models::closure::types::YearClosureRequest;
use crate::models::ledger::LedgerRef;
use crate::models::member::Permission;

#[derive(Debug, Deserialize)]
pub struct ClosureListQuery {
    pub organization_id: Option<Uuid>,
}

/// GET /api/closures?organization_id= - Closure rows of an organization, newest year first
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<ClosureListQuery>,
) -> Result<HttpResponse, AppError> {
    let organization_id = query
        .organization_id
        .ok_or_else(|| AppError::Validation("organization_id is required".to_string()))?;
    access::require_permission(
        &pool,
        &user,
        LedgerRef::Organization(organization_id),
        Permission::ViewLedger,
    )
    .await?;

    let closures = closure_queries::find_for_organization(&pool, organization_id).await?;
    Ok(ok(closures))
}

/// Validated (organization, year) pair, with the caller confirmed as owner.
async fn owned_year(
    pool: &PgPool,
    user: &AuthUser,
    body: &YearClosureRequest,
) -> Result<(Uuid, i32), AppError> {
    body.validate()?;
    let (Some(organization_id), Some(year)) = (body.organization_id, body.year) else {
        return Err(AppError::Validation(
            "organization_id and year are required".to_string(),
        ));
    };
    access::require_owner(pool, user, LedgerRef::Organization(organization_id)).await?;
    Ok((organization_id, year))
}

/// POST /api/closures/close - Close a fiscal year against further edits
pub async fn close(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<YearClosureRequest>,
) -> Result<HttpResponse, AppError> {
    let (organization_id, year) = owned_year(&pool, &user, &body).await?;

    let closure = closure_queries::close(&pool, organization_id, year).await?;
    log::info!("Year {year} of organization {organization_id} closed by {}", user.id);
    audit::record(
        pool.get_ref(),
        user.id,
        "year_closure.closed",
        "organization",
        organization_id,
        json!({ "fiscal_year": year, "status": closure.status }),
    )
    .await;

    Ok(ok(closure))
}

/// POST /api/closures/archive - Lock a closed fiscal year
pub async fn archive(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<YearClosureRequest>,
) -> Result<HttpResponse, AppError> {
    let (organization_id, year) = owned_year(&pool, &user, &body).await?;

    let closure = closure_queries::archive(&pool, organization_id, year).await?;
    log::info!("Year {year} of organization {organization_id} archived by {}", user.id);
    audit::record(
        pool.get_ref(),
        user.id,
        "year_closure.archived",
        "organization",
        organization_id,
        json!({ "fiscal_year": year, "status": closure.status }),
    )
    .await;

    Ok(ok(closure))
}
