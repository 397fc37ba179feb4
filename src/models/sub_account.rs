use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_one_of, validate_present};
use crate::errors::AppError;

pub const LEDGER_TYPES: [&str; 2] = ["political_organization", "election"];

/// User-defined breakdown of a standard account code.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubAccount {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub ledger_type: String,
    pub parent_account_code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SUB_ACCOUNT_COLUMNS: &str =
    "id, owner_user_id, ledger_type, parent_account_code, name, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubAccount {
    pub ledger_type: Option<String>,
    pub parent_account_code: Option<String>,
    pub name: Option<String>,
}

impl Validate for NewSubAccount {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_one_of(self.ledger_type.as_deref(), "ledger_type", &LEDGER_TYPES));
        errors.extend(validate_present(self.parent_account_code.as_deref(), "parent_account_code", 50));
        errors.extend(validate_present(self.name.as_deref(), "Name", 100));
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubAccountRename {
    pub name: Option<String>,
}

impl Validate for SubAccountRename {
    fn validation_errors(&self) -> Vec<String> {
        validate_present(self.name.as_deref(), "Name", 100).into_iter().collect()
    }
}

pub async fn find_owned(
    pool: &PgPool,
    owner: Option<Uuid>,
    ledger_type: Option<&str>,
) -> Result<Vec<SubAccount>, AppError> {
    let sql = format!(
        "SELECT {SUB_ACCOUNT_COLUMNS} FROM sub_accounts \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) \
           AND ($2::text IS NULL OR ledger_type = $2) \
         ORDER BY parent_account_code, name"
    );
    let rows = sqlx::query_as::<_, SubAccount>(&sql)
        .bind(owner)
        .bind(ledger_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<SubAccount>, AppError> {
    let sql = format!(
        "SELECT {SUB_ACCOUNT_COLUMNS} FROM sub_accounts \
         WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2)"
    );
    let row = sqlx::query_as::<_, SubAccount>(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &PgPool, owner_user_id: Uuid, input: &NewSubAccount) -> Result<SubAccount, AppError> {
    let sql = format!(
        "INSERT INTO sub_accounts (owner_user_id, ledger_type, parent_account_code, name) \
         VALUES ($1, $2, $3, $4) RETURNING {SUB_ACCOUNT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SubAccount>(&sql)
        .bind(owner_user_id)
        .bind(input.ledger_type.as_deref().unwrap_or_default())
        .bind(input.parent_account_code.as_deref().unwrap_or_default().trim())
        .bind(input.name.as_deref().unwrap_or_default().trim())
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn rename(pool: &PgPool, id: Uuid, owner: Option<Uuid>, name: &str) -> Result<SubAccount, AppError> {
    let sql = format!(
        "UPDATE sub_accounts SET name = $3, updated_at = NOW() \
         WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2) \
         RETURNING {SUB_ACCOUNT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SubAccount>(&sql)
        .bind(id)
        .bind(owner)
        .bind(name.trim())
        .fetch_optional(pool)
        .await?;
    row.ok_or_else(|| AppError::NotFound("Sub-account not found".to_string()))
}

/// Delete a sub-account no journal entry references.
pub async fn delete(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let owned: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM sub_accounts WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2) FOR UPDATE",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?;
    if owned.is_none() {
        return Err(AppError::NotFound("Sub-account not found".to_string()));
    }

    let (in_use,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM journal_entries WHERE sub_account_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if in_use {
        return Err(AppError::Conflict(
            "This sub-account is used by journal entries and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM sub_accounts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
