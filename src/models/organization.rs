use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_present};
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub name: Option<String>,
}

impl Validate for NewOrganization {
    fn validation_errors(&self) -> Vec<String> {
        validate_present(self.name.as_deref(), "Organization name", 200)
            .into_iter()
            .collect()
    }
}

pub async fn create(pool: &PgPool, owner_user_id: Uuid, name: &str) -> Result<Organization, AppError> {
    let org = sqlx::query_as::<_, Organization>(
        "INSERT INTO political_organizations (owner_user_id, name) VALUES ($1, $2) \
         RETURNING id, owner_user_id, name, created_at, updated_at",
    )
    .bind(owner_user_id)
    .bind(name.trim())
    .fetch_one(pool)
    .await?;
    Ok(org)
}

/// Organizations visible to the caller; `owner = None` lists all of them.
pub async fn find_owned(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Organization>, AppError> {
    let rows = sqlx::query_as::<_, Organization>(
        "SELECT id, owner_user_id, name, created_at, updated_at FROM political_organizations \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) \
         ORDER BY created_at",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Organization>, AppError> {
    let row = sqlx::query_as::<_, Organization>(
        "SELECT id, owner_user_id, name, created_at, updated_at FROM political_organizations \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
