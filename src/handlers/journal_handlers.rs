use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::access;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::models::journal::queries as journal_queries;
use crate::models::journal::receipt::{self, NewReceipt};
use crate::models::journal::types::{JournalUpdate, NewJournal};
use crate::models::journal::{Journal, JournalStatus};
use crate::models::ledger::LedgerRef;
use crate::models::member::Permission;

#[derive(Debug, Deserialize)]
pub struct JournalListQuery {
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub year: Option<i32>,
    pub status: Option<String>,
}

/// Submitting a draft needs less than registering an approved journal.
fn permission_for_status(status: JournalStatus) -> Permission {
    match status {
        JournalStatus::Draft => Permission::SubmitJournal,
        JournalStatus::Approved => Permission::RegisterJournal,
    }
}

/// Submitters may keep editing their own drafts; everything else needs
/// `registerJournal`.
fn edit_permission(journal: &Journal, user: &AuthUser) -> Permission {
    if journal.status == JournalStatus::Draft && journal.submitted_by_user_id == user.id {
        Permission::SubmitJournal
    } else {
        Permission::RegisterJournal
    }
}

async fn load(pool: &PgPool, id: Uuid) -> Result<Journal, AppError> {
    journal_queries::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Journal not found".to_string()))
}

/// GET /api/journals?organization_id=|election_id=&year=&status= - Journals of a ledger
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<JournalListQuery>,
) -> Result<HttpResponse, AppError> {
    let target = LedgerRef::from_ids(query.organization_id, query.election_id)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JournalStatus>)
        .transpose()
        .map_err(AppError::Validation)?;
    access::require_permission(&pool, &user, target, Permission::ViewLedger).await?;

    let journals = journal_queries::find_for_ledger(&pool, target, query.year, status).await?;
    Ok(ok(journals))
}

/// POST /api/journals - Record a journal with its entries
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewJournal>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let target = LedgerRef::from_ids(body.organization_id, body.election_id)?;
    let status = body.header.status();
    access::require_permission(&pool, &user, target, permission_for_status(status)).await?;

    let detail = journal_queries::create(&pool, user.id, target, &body.header, &body.entries).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "journal.created",
        "journal",
        detail.journal.id,
        json!({
            "ledger": target,
            "status": status,
            "entries": detail.entries.len(),
        }),
    )
    .await;

    Ok(created(detail))
}

/// GET /api/journals/{id} - Journal with entries and counterparty
pub async fn read(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = journal_queries::find_detail(&pool, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Journal not found".to_string()))?;
    access::require_permission(&pool, &user, detail.journal.ledger()?, Permission::ViewLedger).await?;

    Ok(ok(detail))
}

/// PUT /api/journals/{id} - Rewrite the header and optionally replace entries
pub async fn update(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<JournalUpdate>,
) -> Result<HttpResponse, AppError> {
    let journal = load(&pool, path.into_inner()).await?;
    access::require_permission(&pool, &user, journal.ledger()?, edit_permission(&journal, &user))
        .await?;

    let detail = journal_queries::update(&pool, journal.id, &body).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "journal.updated",
        "journal",
        journal.id,
        json!({ "entries_replaced": body.entries.is_some() }),
    )
    .await;

    Ok(ok(detail))
}

/// DELETE /api/journals/{id}
pub async fn delete(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let journal = load(&pool, path.into_inner()).await?;
    access::require_permission(&pool, &user, journal.ledger()?, edit_permission(&journal, &user))
        .await?;

    let deleted = journal_queries::delete(&pool, journal.id).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "journal.deleted",
        "journal",
        deleted.id,
        json!({ "journal_date": deleted.journal_date, "description": deleted.description }),
    )
    .await;

    Ok(ok(json!({ "id": deleted.id })))
}

/// POST /api/journals/{id}/approve - Move a draft to approved
pub async fn approve(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let journal = load(&pool, path.into_inner()).await?;
    access::require_permission(&pool, &user, journal.ledger()?, Permission::ApproveJournal).await?;

    let approved = journal_queries::approve(&pool, journal.id).await?;
    log::info!("Journal {} approved by {}", approved.id, user.id);
    audit::record(
        pool.get_ref(),
        user.id,
        "journal.approved",
        "journal",
        approved.id,
        json!({ "submitted_by_user_id": approved.submitted_by_user_id }),
    )
    .await;

    Ok(ok(approved))
}

/// GET /api/journals/{id}/receipts
pub async fn list_receipts(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let journal = load(&pool, path.into_inner()).await?;
    access::require_permission(&pool, &user, journal.ledger()?, Permission::ViewLedger).await?;

    let receipts = receipt::find_for_journal(pool.get_ref(), journal.id).await?;
    Ok(ok(receipts))
}

/// POST /api/journals/{id}/receipts - Attach an uploaded document
pub async fn add_receipt(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<NewReceipt>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let journal = load(&pool, path.into_inner()).await?;
    access::require_permission(&pool, &user, journal.ledger()?, Permission::SubmitJournal).await?;

    let receipt = receipt::create(&pool, journal.id, user.id, &body).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "receipt.attached",
        "journal",
        journal.id,
        json!({ "receipt_id": receipt.id, "file_name": receipt.file_name }),
    )
    .await;

    Ok(created(receipt))
}
