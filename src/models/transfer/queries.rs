use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::types::*;
use crate::errors::AppError;
use crate::models::ledger::{self, LedgerRef};
use crate::models::member::LedgerRole;
use crate::models::member::queries as member_queries;

const TRANSFER_COLUMNS: &str =
    "id, from_user_id, to_user_id, organization_id, election_id, status, created_at, updated_at";

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<OwnershipTransfer>, AppError> {
    let sql = format!("SELECT {TRANSFER_COLUMNS} FROM ownership_transfers WHERE id = $1");
    let row = sqlx::query_as::<_, TransferRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(OwnershipTransfer::try_from).transpose()
}

async fn lock_by_id(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<OwnershipTransfer, AppError> {
    let sql = format!("SELECT {TRANSFER_COLUMNS} FROM ownership_transfers WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, TransferRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer not found".to_string()))?;
    OwnershipTransfer::try_from(row)
}

/// Pending transfers addressed to `user_id`, newest first.
pub async fn find_incoming_pending(pool: &PgPool, user_id: Uuid) -> Result<Vec<IncomingTransfer>, AppError> {
    let rows = sqlx::query_as::<_, IncomingTransfer>(
        "SELECT t.id, t.from_user_id, t.organization_id, t.election_id, \
                COALESCE(o.name, e.election_name) AS resource_name, t.created_at \
         FROM ownership_transfers t \
         LEFT JOIN political_organizations o ON o.id = t.organization_id \
         LEFT JOIN elections e ON e.id = t.election_id \
         WHERE t.to_user_id = $1 AND t.status = 'pending' \
         ORDER BY t.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Record a new pending transfer. At most one may be pending per resource.
pub async fn create(
    pool: &PgPool,
    from_user_id: Uuid,
    to_user_id: Uuid,
    target: LedgerRef,
) -> Result<OwnershipTransfer, AppError> {
    let sql = format!(
        "INSERT INTO ownership_transfers (from_user_id, to_user_id, organization_id, election_id) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT DO NOTHING \
         RETURNING {TRANSFER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TransferRow>(&sql)
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(target.organization_id())
        .bind(target.election_id())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "A transfer for this {} is already pending",
                target.kind()
            ))
        })?;
    OwnershipTransfer::try_from(row)
}

async fn set_status(
    conn: &mut sqlx::PgConnection,
    id: Uuid,
    status: TransferStatus,
) -> Result<OwnershipTransfer, AppError> {
    let sql = format!(
        "UPDATE ownership_transfers SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'pending' \
         RETURNING {TRANSFER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TransferRow>(&sql)
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::InvalidState("Transfer is no longer pending".to_string()))?;
    OwnershipTransfer::try_from(row)
}

/// Recipient turns the transfer down.
pub async fn decline(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<OwnershipTransfer, AppError> {
    finish(pool, id, caller, TransferAction::Decline).await
}

/// Requester withdraws the transfer.
pub async fn cancel(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<OwnershipTransfer, AppError> {
    finish(pool, id, caller, TransferAction::Cancel).await
}

async fn finish(
    pool: &PgPool,
    id: Uuid,
    caller: Uuid,
    action: TransferAction,
) -> Result<OwnershipTransfer, AppError> {
    let mut tx = pool.begin().await?;
    let transfer = lock_by_id(&mut tx, id).await?;
    let next = authorize(&transfer, caller, action)?;
    let updated = set_status(&mut tx, id, next).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Outcome of an accepted transfer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AcceptedTransfer {
    pub transfer: OwnershipTransfer,
    /// Whether the former owner gained a new admin membership.
    pub membership_added: bool,
}

/// Accept a pending transfer.
///
/// In one transaction: the resource's owner becomes the caller, the transfer
/// is completed, and the former owner is kept on as an admin member unless
/// they already hold a membership on the resource.
pub async fn accept(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<AcceptedTransfer, AppError> {
    let mut tx = pool.begin().await?;

    let transfer = lock_by_id(&mut tx, id).await?;
    let next = authorize(&transfer, caller, TransferAction::Accept)?;
    let target = transfer.ledger()?;

    if ledger::lock_owner(&mut *tx, target).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "The {} for this transfer no longer exists",
            target.kind()
        )));
    }

    ledger::set_owner(&mut *tx, target, caller).await?;
    let completed = set_status(&mut tx, id, next).await?;
    let membership_added = member_queries::add_if_absent(
        &mut *tx,
        transfer.from_user_id,
        target,
        LedgerRole::Admin,
        Some(caller),
    )
    .await?;

    tx.commit().await?;
    Ok(AcceptedTransfer {
        transfer: completed,
        membership_added,
    })
}
