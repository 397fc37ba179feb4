use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validate::{Validate, normalize_optional, validate_optional, validate_present};
use crate::errors::AppError;
use crate::models::politician;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Election {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub politician_id: Uuid,
    pub hub_politician_id: String,
    pub hub_election_id: Option<String>,
    pub election_name: String,
    pub election_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ELECTION_COLUMNS: &str = "id, owner_user_id, politician_id, hub_politician_id, hub_election_id, \
                                election_name, election_date, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewElection {
    pub hub_election_id: Option<String>,
    pub election_name: Option<String>,
    pub election_date: Option<NaiveDate>,
    pub hub_politician_id: Option<String>,
    pub politician_name: Option<String>,
}

impl Validate for NewElection {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_present(self.election_name.as_deref(), "Election name", 200));
        if self.election_date.is_none() {
            errors.push("Election date is required".to_string());
        }
        errors.extend(validate_present(self.hub_politician_id.as_deref(), "hub_politician_id", 100));
        errors.extend(validate_optional(self.politician_name.as_deref(), "Politician name", 200));
        errors
    }
}

/// Create an election ledger and its local politician in one transaction.
pub async fn create(pool: &PgPool, owner_user_id: Uuid, input: &NewElection) -> Result<Election, AppError> {
    let hub_politician_id = input.hub_politician_id.as_deref().unwrap_or_default().trim();
    let election_date = input
        .election_date
        .ok_or_else(|| AppError::Validation("Election date is required".to_string()))?;

    let mut tx = pool.begin().await?;

    let politician = politician::find_or_create(
        &mut tx,
        owner_user_id,
        hub_politician_id,
        input.politician_name.as_deref().unwrap_or_default(),
    )
    .await?;

    let sql = format!(
        "INSERT INTO elections \
             (owner_user_id, politician_id, hub_politician_id, hub_election_id, election_name, election_date) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {ELECTION_COLUMNS}"
    );
    let election = sqlx::query_as::<_, Election>(&sql)
        .bind(owner_user_id)
        .bind(politician.id)
        .bind(hub_politician_id)
        .bind(normalize_optional(input.hub_election_id.as_deref()))
        .bind(input.election_name.as_deref().unwrap_or_default().trim())
        .bind(election_date)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(election)
}

pub async fn find_owned(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Election>, AppError> {
    let sql = format!(
        "SELECT {ELECTION_COLUMNS} FROM elections \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) \
         ORDER BY election_date DESC"
    );
    let rows = sqlx::query_as::<_, Election>(&sql)
        .bind(owner)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Election>, AppError> {
    let sql = format!("SELECT {ELECTION_COLUMNS} FROM elections WHERE id = $1");
    let row = sqlx::query_as::<_, Election>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn election_requires_name_date_and_politician() {
        let input = NewElection {
            hub_election_id: None,
            election_name: Some(" ".into()),
            election_date: None,
            hub_politician_id: None,
            politician_name: None,
        };
        assert_eq!(input.validation_errors().len(), 3);

        let input = NewElection {
            hub_election_id: Some("hub-e-1".into()),
            election_name: Some("Mayoral election".into()),
            election_date: NaiveDate::from_ymd_opt(2025, 4, 20),
            hub_politician_id: Some("hub-p-1".into()),
            politician_name: Some("Taro".into()),
        };
        assert!(input.validation_errors().is_empty());
    }
}
