use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_one_of, validate_present};
use crate::errors::AppError;

pub const MAX_RECEIPT_BYTES: i64 = 5 * 1024 * 1024;
pub const RECEIPT_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "application/pdf"];

const RECEIPT_COLUMNS: &str =
    "id, journal_id, storage_path, file_name, file_size, mime_type, uploaded_by_user_id, created_at";

/// A stored document backing a journal.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Receipt {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub storage_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Metadata of an already-uploaded file to attach to a journal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReceipt {
    pub storage_path: Option<String>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: i64,
    pub mime_type: Option<String>,
}

impl Validate for NewReceipt {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_present(self.storage_path.as_deref(), "storage_path", 1024));
        errors.extend(validate_present(self.file_name.as_deref(), "file_name", 255));
        if !(0..=MAX_RECEIPT_BYTES).contains(&self.file_size) {
            errors.push("File size must be 5MB or less".to_string());
        }
        errors.extend(validate_one_of(self.mime_type.as_deref(), "mime_type", &RECEIPT_MIME_TYPES));
        errors
    }
}

pub async fn find_for_journal<'e, E: PgExecutor<'e>>(
    executor: E,
    journal_id: Uuid,
) -> Result<Vec<Receipt>, AppError> {
    let sql = format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE journal_id = $1 ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, Receipt>(&sql)
        .bind(journal_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Receipts of every journal in `journal_ids`.
pub async fn find_for_journals(pool: &PgPool, journal_ids: &[Uuid]) -> Result<Vec<Receipt>, AppError> {
    let sql = format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE journal_id = ANY($1) ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, Receipt>(&sql)
        .bind(journal_ids)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn create(
    pool: &PgPool,
    journal_id: Uuid,
    uploaded_by: Uuid,
    input: &NewReceipt,
) -> Result<Receipt, AppError> {
    let sql = format!(
        "INSERT INTO receipts (journal_id, storage_path, file_name, file_size, mime_type, uploaded_by_user_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {RECEIPT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Receipt>(&sql)
        .bind(journal_id)
        .bind(input.storage_path.as_deref().unwrap_or_default().trim())
        .bind(input.file_name.as_deref().unwrap_or_default().trim())
        .bind(input.file_size)
        .bind(input.mime_type.as_deref().unwrap_or_default())
        .bind(uploaded_by)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(size: i64) -> NewReceipt {
        NewReceipt {
            storage_path: Some("receipts/2024/a.pdf".into()),
            file_name: Some("a.pdf".into()),
            file_size: size,
            mime_type: Some("application/pdf".into()),
        }
    }

    #[test]
    fn accepts_files_up_to_five_megabytes() {
        assert!(pdf(MAX_RECEIPT_BYTES).validation_errors().is_empty());
        assert_eq!(pdf(MAX_RECEIPT_BYTES + 1).validation_errors().len(), 1);
    }

    #[test]
    fn rejects_unlisted_mime_types() {
        let mut receipt = pdf(10);
        receipt.mime_type = Some("text/plain".into());
        assert!(receipt.validation_errors()[0].contains("mime_type"));
    }
}
