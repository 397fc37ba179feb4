use sqlx::PgPool;
use uuid::Uuid;

use super::types::*;
use crate::auth::validate::normalize_optional;
use crate::errors::AppError;

pub(crate) const CONTACT_COLUMNS: &str = "id, owner_user_id, contact_type, name, address, occupation, \
                               is_name_private, is_address_private, is_occupation_private, \
                               privacy_reason_type, privacy_reason_other, created_at, updated_at";

pub async fn find_summaries(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<ContactSummary>, AppError> {
    let rows = sqlx::query_as::<_, ContactSummary>(
        "SELECT id, name, contact_type, address, occupation FROM contacts \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) ORDER BY name",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_owned(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Contact>, AppError> {
    let sql = format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts \
         WHERE ($1::uuid IS NULL OR owner_user_id = $1) ORDER BY name"
    );
    let rows = sqlx::query_as::<_, Contact>(&sql)
        .bind(owner)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<Contact>, AppError> {
    let sql = format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts \
         WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2)"
    );
    let row = sqlx::query_as::<_, Contact>(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &PgPool, owner_user_id: Uuid, input: &NewContact) -> Result<Contact, AppError> {
    let sql = format!(
        "INSERT INTO contacts (owner_user_id, contact_type, name, address, occupation, \
             is_name_private, is_address_private, is_occupation_private, \
             privacy_reason_type, privacy_reason_other) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {CONTACT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Contact>(&sql)
        .bind(owner_user_id)
        .bind(input.contact_type.as_deref().unwrap_or_default())
        .bind(input.name.as_deref().unwrap_or_default().trim())
        .bind(normalize_optional(input.address.as_deref()))
        .bind(normalize_optional(input.occupation.as_deref()))
        .bind(input.is_name_private)
        .bind(input.is_address_private)
        .bind(input.is_occupation_private)
        .bind(normalize_optional(input.privacy_reason_type.as_deref()))
        .bind(normalize_optional(input.privacy_reason_other.as_deref()))
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
    input: &ContactUpdate,
) -> Result<Contact, AppError> {
    let sql = format!(
        "UPDATE contacts SET \
             contact_type = COALESCE($3, contact_type), \
             name = COALESCE($4, name), \
             address = CASE WHEN $5 THEN $6 ELSE address END, \
             occupation = CASE WHEN $7 THEN $8 ELSE occupation END, \
             is_name_private = COALESCE($9, is_name_private), \
             is_address_private = COALESCE($10, is_address_private), \
             is_occupation_private = COALESCE($11, is_occupation_private), \
             privacy_reason_type = CASE WHEN $12 THEN $13 ELSE privacy_reason_type END, \
             privacy_reason_other = CASE WHEN $14 THEN $15 ELSE privacy_reason_other END, \
             updated_at = NOW() \
         WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2) \
         RETURNING {CONTACT_COLUMNS}"
    );
    let nullable = |field: &Option<Option<String>>| {
        (
            field.is_some(),
            field.as_ref().and_then(|v| normalize_optional(v.as_deref())),
        )
    };
    let (set_address, address) = nullable(&input.address);
    let (set_occupation, occupation) = nullable(&input.occupation);
    let (set_reason, reason) = nullable(&input.privacy_reason_type);
    let (set_reason_other, reason_other) = nullable(&input.privacy_reason_other);

    let row = sqlx::query_as::<_, Contact>(&sql)
        .bind(id)
        .bind(owner)
        .bind(input.contact_type.as_deref())
        .bind(input.name.as_deref().map(str::trim))
        .bind(set_address)
        .bind(address)
        .bind(set_occupation)
        .bind(occupation)
        .bind(input.is_name_private)
        .bind(input.is_address_private)
        .bind(input.is_occupation_private)
        .bind(set_reason)
        .bind(reason)
        .bind(set_reason_other)
        .bind(reason_other)
        .fetch_optional(pool)
        .await?;
    row.ok_or_else(|| AppError::NotFound("Contact not found".to_string()))
}

/// Delete a contact that no journal references.
pub async fn delete(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let owned: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM contacts WHERE id = $1 AND ($2::uuid IS NULL OR owner_user_id = $2) FOR UPDATE",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?;
    if owned.is_none() {
        return Err(AppError::NotFound("Contact not found".to_string()));
    }

    let (in_use,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM journals WHERE contact_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if in_use {
        return Err(AppError::Conflict(
            "This contact is used by journals and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
