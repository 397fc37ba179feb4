use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::access;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::models::election::{self, NewElection};
use crate::models::ledger::LedgerRef;
use crate::models::member::Permission;
use crate::models::politician;

/// GET /api/elections - Elections owned by the caller
pub async fn list(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let elections = election::find_owned(&pool, user.scope.owner_filter()).await?;
    Ok(ok(elections))
}

/// POST /api/elections - Politician and election are created together or not at all
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewElection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let created_election = election::create(&pool, user.id, &body).await?;
    log::info!("Election {} created by {}", created_election.id, user.id);
    audit::record(
        pool.get_ref(),
        user.id,
        "election.created",
        "election",
        created_election.id,
        json!({
            "election_name": created_election.election_name,
            "politician_id": created_election.politician_id,
        }),
    )
    .await;

    Ok(created(created_election))
}

/// GET /api/elections/{id} - Visible to the owner and members
pub async fn read(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    access::require_permission(&pool, &user, LedgerRef::Election(id), Permission::ViewLedger).await?;

    let found = election::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Election not found".to_string()))?;
    Ok(ok(found))
}

/// GET /api/politicians
pub async fn list_politicians(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let politicians = politician::find_owned(&pool, user.scope.owner_filter()).await?;
    Ok(ok(politicians))
}

/// GET /api/politicians/{id}
pub async fn read_politician(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let found = politician::find_by_id(&pool, path.into_inner())
        .await?
        .filter(|p| user.scope.permits(p.owner_user_id))
        .ok_or_else(|| AppError::NotFound("Politician not found".to_string()))?;
    Ok(ok(found))
}
