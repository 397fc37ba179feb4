use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;

/// Local record of a Hub politician, per owning user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Politician {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub hub_politician_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const POLITICIAN_COLUMNS: &str = "id, owner_user_id, hub_politician_id, name, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Politician>, AppError> {
    let sql = format!("SELECT {POLITICIAN_COLUMNS} FROM politicians WHERE id = $1");
    let row = sqlx::query_as::<_, Politician>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_owned(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Politician>, AppError> {
    let sql = format!(
        "SELECT {POLITICIAN_COLUMNS} FROM politicians \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, Politician>(&sql)
        .bind(owner)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Return the owner's politician for `hub_politician_id`, creating it if needed.
/// A non-empty `name` refreshes the stored name.
pub async fn find_or_create(
    conn: &mut sqlx::PgConnection,
    owner_user_id: Uuid,
    hub_politician_id: &str,
    name: &str,
) -> Result<Politician, AppError> {
    let sql = format!(
        "INSERT INTO politicians (owner_user_id, hub_politician_id, name) VALUES ($1, $2, $3) \
         ON CONFLICT (owner_user_id, hub_politician_id) DO UPDATE \
         SET name = CASE WHEN EXCLUDED.name = '' THEN politicians.name ELSE EXCLUDED.name END, \
             updated_at = NOW() \
         RETURNING {POLITICIAN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Politician>(&sql)
        .bind(owner_user_id)
        .bind(hub_politician_id)
        .bind(name.trim())
        .fetch_one(conn)
        .await?;
    Ok(row)
}
