use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::models::ledger::{self, LedgerRef};
use crate::models::transfer::queries as transfer_queries;
use crate::models::transfer::types::NewTransfer;
use crate::models::transfer::OwnershipTransfer;

/// GET /api/ownership-transfers - Pending transfers addressed to the caller
pub async fn incoming(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let transfers = transfer_queries::find_incoming_pending(&pool, user.id).await?;
    Ok(ok(transfers))
}

/// POST /api/ownership-transfers - Offer one of the caller's resources to another user
///
/// Only the recorded owner may offer a resource; test-mode reach does not
/// extend to giving away other users' ledgers.
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewTransfer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let to_user_id = body.recipient()?;
    let target = LedgerRef::from_ids(body.organization_id, body.election_id)?;

    if to_user_id == user.id {
        return Err(AppError::Validation(
            "You cannot transfer ownership to yourself".to_string(),
        ));
    }

    let owner = ledger::find_owner(pool.get_ref(), target)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind())))?;
    if owner != user.id {
        return Err(AppError::Forbidden(format!(
            "Only the owner can transfer this {}",
            target.kind()
        )));
    }

    let transfer = transfer_queries::create(&pool, user.id, to_user_id, target).await?;
    log::info!(
        "Ownership transfer {} of {} {} requested by {} for {}",
        transfer.id,
        target.kind(),
        target.id(),
        user.id,
        to_user_id
    );
    record(&pool, &user, "ownership_transfer.requested", &transfer).await;

    Ok(created(transfer))
}

/// POST /api/ownership-transfers/{id}/accept - Take over the resource
pub async fn accept(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let accepted = transfer_queries::accept(&pool, id, user.id).await?;
    log::info!(
        "Ownership transfer {id} accepted by {} (former owner kept as admin: {})",
        user.id,
        accepted.membership_added
    );
    record(&pool, &user, "ownership_transfer.accepted", &accepted.transfer).await;

    Ok(ok(accepted))
}

/// POST /api/ownership-transfers/{id}/decline
pub async fn decline(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let transfer = transfer_queries::decline(&pool, id, user.id).await?;
    log::info!("Ownership transfer {id} declined by {}", user.id);
    record(&pool, &user, "ownership_transfer.declined", &transfer).await;

    Ok(ok(transfer))
}

/// DELETE /api/ownership-transfers/{id} - Withdraw a pending offer
pub async fn cancel(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let transfer = transfer_queries::cancel(&pool, id, user.id).await?;
    log::info!("Ownership transfer {id} cancelled by {}", user.id);
    record(&pool, &user, "ownership_transfer.cancelled", &transfer).await;

    Ok(ok(transfer))
}

async fn record(pool: &PgPool, user: &AuthUser, action: &str, transfer: &OwnershipTransfer) {
    audit::record(
        pool,
        user.id,
        action,
        "ownership_transfer",
        transfer.id,
        json!({
            "from_user_id": transfer.from_user_id,
            "to_user_id": transfer.to_user_id,
            "organization_id": transfer.organization_id,
            "election_id": transfer.election_id,
            "status": transfer.status,
        }),
    )
    .await;
}
