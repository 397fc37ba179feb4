use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::types::*;
use crate::errors::AppError;

const CLOSURE_COLUMNS: &str =
    "id, organization_id, fiscal_year, status, closed_at, locked_at, created_at, updated_at";

pub async fn find_for_organization(pool: &PgPool, organization_id: Uuid) -> Result<Vec<YearClosure>, AppError> {
    let sql = format!(
        "SELECT {CLOSURE_COLUMNS} FROM ledger_year_closures \
         WHERE organization_id = $1 ORDER BY fiscal_year DESC"
    );
    let rows = sqlx::query_as::<_, YearClosureRow>(&sql)
        .bind(organization_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(YearClosure::try_from).collect()
}

pub async fn find<'e, E: PgExecutor<'e>>(
    executor: E,
    organization_id: Uuid,
    year: i32,
) -> Result<Option<YearClosure>, AppError> {
    let sql = format!(
        "SELECT {CLOSURE_COLUMNS} FROM ledger_year_closures \
         WHERE organization_id = $1 AND fiscal_year = $2"
    );
    let row = sqlx::query_as::<_, YearClosureRow>(&sql)
        .bind(organization_id)
        .bind(year)
        .fetch_optional(executor)
        .await?;
    row.map(YearClosure::try_from).transpose()
}

/// Status of `year` for the organization, or `None` if never closed.
pub async fn status_for_year<'e, E: PgExecutor<'e>>(
    executor: E,
    organization_id: Uuid,
    year: i32,
) -> Result<Option<ClosureStatus>, AppError> {
    Ok(find(executor, organization_id, year).await?.map(|c| c.status))
}

async fn lock_row(
    conn: &mut sqlx::PgConnection,
    organization_id: Uuid,
    year: i32,
) -> Result<Option<YearClosure>, AppError> {
    let sql = format!(
        "SELECT {CLOSURE_COLUMNS} FROM ledger_year_closures \
         WHERE organization_id = $1 AND fiscal_year = $2 FOR UPDATE"
    );
    let row = sqlx::query_as::<_, YearClosureRow>(&sql)
        .bind(organization_id)
        .bind(year)
        .fetch_optional(conn)
        .await?;
    row.map(YearClosure::try_from).transpose()
}

/// Close a fiscal year, creating its row on first close.
pub async fn close(pool: &PgPool, organization_id: Uuid, year: i32) -> Result<YearClosure, AppError> {
    let mut tx = pool.begin().await?;

    let current = lock_row(&mut tx, organization_id, year).await?;
    let next = close_transition(year, current.as_ref().map(|c| c.status))?;

    let row = match current {
        Some(existing) => {
            let sql = format!(
                "UPDATE ledger_year_closures \
                 SET status = $1, closed_at = NOW(), updated_at = NOW() \
                 WHERE id = $2 RETURNING {CLOSURE_COLUMNS}"
            );
            sqlx::query_as::<_, YearClosureRow>(&sql)
                .bind(next.as_str())
                .bind(existing.id)
                .fetch_one(&mut *tx)
                .await?
        }
        None => {
            let sql = format!(
                "INSERT INTO ledger_year_closures (organization_id, fiscal_year, status, closed_at) \
                 VALUES ($1, $2, $3, NOW()) \
                 ON CONFLICT (organization_id, fiscal_year) DO NOTHING \
                 RETURNING {CLOSURE_COLUMNS}"
            );
            sqlx::query_as::<_, YearClosureRow>(&sql)
                .bind(organization_id)
                .bind(year)
                .bind(next.as_str())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!("Year {year} was closed by another request"))
                })?
        }
    };

    tx.commit().await?;
    YearClosure::try_from(row)
}

/// Archive a closed fiscal year: `closed` becomes `locked`.
///
/// The row is locked for the duration of the check so two concurrent
/// archives cannot both succeed.
pub async fn archive(pool: &PgPool, organization_id: Uuid, year: i32) -> Result<YearClosure, AppError> {
    let mut tx = pool.begin().await?;

    let current = lock_row(&mut tx, organization_id, year).await?;
    let next = archive_transition(year, current.as_ref().map(|c| c.status))?;
    let Some(existing) = current else {
        return Err(AppError::Internal("archive guard passed without a row".to_string()));
    };

    let sql = format!(
        "UPDATE ledger_year_closures \
         SET status = $1, locked_at = NOW(), updated_at = NOW() \
         WHERE id = $2 RETURNING {CLOSURE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, YearClosureRow>(&sql)
        .bind(next.as_str())
        .bind(existing.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    YearClosure::try_from(row)
}
