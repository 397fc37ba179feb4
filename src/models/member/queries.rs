use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::types::*;
use crate::errors::AppError;
use crate::models::ledger::LedgerRef;

const MEMBER_COLUMNS: &str =
    "id, user_id, organization_id, election_id, role, invited_by_user_id, created_at";

pub async fn find_for_ledger(pool: &PgPool, ledger: LedgerRef) -> Result<Vec<LedgerMember>, AppError> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM ledger_members \
         WHERE organization_id IS NOT DISTINCT FROM $1 AND election_id IS NOT DISTINCT FROM $2 \
         ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(ledger.organization_id())
        .bind(ledger.election_id())
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(LedgerMember::from).collect())
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<LedgerMember>, AppError> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM ledger_members WHERE id = $1");
    let row = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(LedgerMember::from))
}

/// Role `user_id` holds on the ledger, if any.
pub async fn role_of<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    ledger: LedgerRef,
) -> Result<Option<LedgerRole>, AppError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT role FROM ledger_members \
         WHERE user_id = $1 \
           AND organization_id IS NOT DISTINCT FROM $2 \
           AND election_id IS NOT DISTINCT FROM $3",
    )
    .bind(user_id)
    .bind(ledger.organization_id())
    .bind(ledger.election_id())
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|(role,)| LedgerRole::from_db(&role)))
}

/// Insert a membership unless one already exists for (user, ledger).
/// Returns whether a row was written.
pub async fn add_if_absent<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    ledger: LedgerRef,
    role: LedgerRole,
    invited_by: Option<Uuid>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO ledger_members (user_id, organization_id, election_id, role, invited_by_user_id) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(ledger.organization_id())
    .bind(ledger.election_id())
    .bind(role.as_str())
    .bind(invited_by)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    ledger: LedgerRef,
    role: LedgerRole,
    invited_by: Uuid,
) -> Result<LedgerMember, AppError> {
    let sql = format!(
        "INSERT INTO ledger_members (user_id, organization_id, election_id, role, invited_by_user_id) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT DO NOTHING \
         RETURNING {MEMBER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(user_id)
        .bind(ledger.organization_id())
        .bind(ledger.election_id())
        .bind(role.as_str())
        .bind(invited_by)
        .fetch_optional(pool)
        .await?;
    row.map(LedgerMember::from)
        .ok_or_else(|| AppError::Conflict("User is already a member of this ledger".to_string()))
}

pub async fn update_role(pool: &PgPool, id: Uuid, role: LedgerRole) -> Result<LedgerMember, AppError> {
    let sql = format!(
        "UPDATE ledger_members SET role = $1 WHERE id = $2 RETURNING {MEMBER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(role.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(LedgerMember::from)
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM ledger_members WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Member not found".to_string()));
    }
    Ok(())
}
