use chrono::{Datelike, NaiveDate};
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::types::*;
use crate::auth::validate::{Validate, normalize_optional};
use crate::errors::AppError;
use crate::models::closure::queries as closure_queries;
use crate::models::closure::types::ensure_editable;
use crate::models::contact::Contact;
use crate::models::contact::queries::CONTACT_COLUMNS;
use crate::models::ledger::{self, LedgerRef};

const JOURNAL_COLUMNS: &str = "id, organization_id, election_id, journal_date, description, contact_id, \
                               classification, non_monetary_basis, notes, \
                               amount_political_grant, amount_political_fund, amount_public_subsidy, \
                               is_receipt_hard_to_collect, receipt_hard_to_collect_reason, status, \
                               is_asset_acquisition, asset_type, submitted_by_user_id, created_at, updated_at";

const ENTRY_COLUMNS: &str =
    "id, journal_id, account_code, sub_account_id, debit_amount, credit_amount";

/// Reject writes to a journal dated in a closed or locked fiscal year.
/// Election ledgers and undated drafts have no fiscal-year lock.
async fn ensure_date_editable(
    conn: &mut PgConnection,
    ledger: LedgerRef,
    date: Option<NaiveDate>,
) -> Result<(), AppError> {
    let (Some(organization_id), Some(date)) = (ledger.organization_id(), date) else {
        return Ok(());
    };
    let year = date.year();
    let status = closure_queries::status_for_year(&mut *conn, organization_id, year).await?;
    ensure_editable(year, status)
}

/// Contacts and sub-accounts named by a journal must belong to the ledger's owner.
async fn ensure_references_owned(
    conn: &mut PgConnection,
    ledger: LedgerRef,
    contact_id: Option<Uuid>,
    entries: &[NewEntry],
) -> Result<(), AppError> {
    let mut sub_account_ids: Vec<Uuid> = entries.iter().filter_map(|e| e.sub_account_id).collect();
    sub_account_ids.sort_unstable();
    sub_account_ids.dedup();
    if contact_id.is_none() && sub_account_ids.is_empty() {
        return Ok(());
    }

    let owner = ledger::find_owner(&mut *conn, ledger)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", ledger.kind())))?;

    if let Some(contact_id) = contact_id {
        let (owned,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM contacts WHERE id = $1 AND owner_user_id = $2)",
        )
        .bind(contact_id)
        .bind(owner)
        .fetch_one(&mut *conn)
        .await?;
        if !owned {
            return Err(AppError::NotFound("Contact not found".to_string()));
        }
    }

    if !sub_account_ids.is_empty() {
        let (found,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sub_accounts WHERE id = ANY($1) AND owner_user_id = $2",
        )
        .bind(&sub_account_ids)
        .bind(owner)
        .fetch_one(&mut *conn)
        .await?;
        if found != sub_account_ids.len() as i64 {
            return Err(AppError::NotFound("Sub-account not found".to_string()));
        }
    }
    Ok(())
}

async fn insert_entries(
    conn: &mut PgConnection,
    journal_id: Uuid,
    entries: &[NewEntry],
) -> Result<Vec<JournalEntry>, AppError> {
    let sql = format!(
        "INSERT INTO journal_entries \
             (journal_id, account_code, sub_account_id, debit_amount, credit_amount, position) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ENTRY_COLUMNS}"
    );
    let mut stored = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let row = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(journal_id)
            .bind(entry.account_code.as_deref().unwrap_or_default().trim())
            .bind(entry.sub_account_id)
            .bind(entry.debit_amount)
            .bind(entry.credit_amount)
            .bind(position as i32)
            .fetch_one(&mut *conn)
            .await?;
        stored.push(row);
    }
    Ok(stored)
}

async fn lock_journal(conn: &mut PgConnection, id: Uuid) -> Result<Journal, AppError> {
    let sql = format!("SELECT {JOURNAL_COLUMNS} FROM journals WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Journal>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Journal not found".to_string()))
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Journal>, AppError> {
    let sql = format!("SELECT {JOURNAL_COLUMNS} FROM journals WHERE id = $1");
    let row = sqlx::query_as::<_, Journal>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn find_entries<'e, E: PgExecutor<'e>>(
    executor: E,
    journal_id: Uuid,
) -> Result<Vec<JournalEntry>, AppError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE journal_id = $1 ORDER BY position"
    );
    let rows = sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(journal_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Journal with its entries in insertion order and its contact, if any.
pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<JournalDetail>, AppError> {
    let Some(journal) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let entries = find_entries(pool, id).await?;
    let contact = match journal.contact_id {
        Some(contact_id) => {
            let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
            sqlx::query_as::<_, Contact>(&sql)
                .bind(contact_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };
    Ok(Some(JournalDetail { journal, entries, contact }))
}

/// Journals of a ledger, newest first. `year` filters on the journal date.
pub async fn find_for_ledger(
    pool: &PgPool,
    ledger: LedgerRef,
    year: Option<i32>,
    status: Option<JournalStatus>,
) -> Result<Vec<Journal>, AppError> {
    let sql = format!(
        "SELECT {JOURNAL_COLUMNS} FROM journals \
         WHERE organization_id IS NOT DISTINCT FROM $1 \
           AND election_id IS NOT DISTINCT FROM $2 \
           AND ($3::int IS NULL OR EXTRACT(YEAR FROM journal_date)::int = $3) \
           AND ($4::text IS NULL OR status = $4) \
         ORDER BY journal_date DESC NULLS FIRST, created_at DESC"
    );
    let rows = sqlx::query_as::<_, Journal>(&sql)
        .bind(ledger.organization_id())
        .bind(ledger.election_id())
        .bind(year)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Entries of every journal in `journal_ids`, in position order per journal.
pub async fn find_entries_for_journals(
    pool: &PgPool,
    journal_ids: &[Uuid],
) -> Result<Vec<JournalEntry>, AppError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries \
         WHERE journal_id = ANY($1) ORDER BY journal_id, position"
    );
    let rows = sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(journal_ids)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Approved journals of a ledger with entries and contacts, oldest first.
/// Used by export and Hub sync.
pub async fn find_details_for_ledger(
    pool: &PgPool,
    ledger: LedgerRef,
    year: Option<i32>,
) -> Result<Vec<JournalDetail>, AppError> {
    let mut journals = find_for_ledger(pool, ledger, year, Some(JournalStatus::Approved)).await?;
    journals.reverse();
    let ids: Vec<Uuid> = journals.iter().map(|j| j.id).collect();

    let mut entries_by_journal: HashMap<Uuid, Vec<JournalEntry>> = HashMap::new();
    for entry in find_entries_for_journals(pool, &ids).await? {
        entries_by_journal.entry(entry.journal_id).or_default().push(entry);
    }

    let contact_ids: Vec<Uuid> = journals.iter().filter_map(|j| j.contact_id).collect();
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ANY($1)");
    let contacts: HashMap<Uuid, Contact> = sqlx::query_as::<_, Contact>(&sql)
        .bind(&contact_ids[..])
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(journals
        .into_iter()
        .map(|journal| JournalDetail {
            entries: entries_by_journal.remove(&journal.id).unwrap_or_default(),
            contact: journal.contact_id.and_then(|id| contacts.get(&id).cloned()),
            journal,
        })
        .collect())
}

/// Every journal on ledgers owned by `owner`; all journals when `None`.
pub async fn find_for_owner(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Journal>, AppError> {
    let columns = JOURNAL_COLUMNS
        .split(", ")
        .map(|c| format!("j.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM journals j \
         LEFT JOIN political_organizations o ON o.id = j.organization_id \
         LEFT JOIN elections e ON e.id = j.election_id \
         WHERE $1::uuid IS NULL OR o.owner_user_id = $1 OR e.owner_user_id = $1 \
         ORDER BY j.journal_date NULLS LAST, j.created_at"
    );
    let rows = sqlx::query_as::<_, Journal>(&sql)
        .bind(owner)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Insert a journal with its entries in one transaction.
pub async fn create(
    pool: &PgPool,
    submitted_by: Uuid,
    ledger: LedgerRef,
    header: &JournalHeader,
    entries: &[NewEntry],
) -> Result<JournalDetail, AppError> {
    let mut tx = pool.begin().await?;
    ensure_date_editable(&mut tx, ledger, header.journal_date).await?;
    ensure_references_owned(&mut tx, ledger, header.contact_id, entries).await?;

    let sql = format!(
        "INSERT INTO journals (organization_id, election_id, journal_date, description, contact_id, \
             classification, non_monetary_basis, notes, \
             amount_political_grant, amount_political_fund, amount_public_subsidy, \
             is_receipt_hard_to_collect, receipt_hard_to_collect_reason, status, \
             is_asset_acquisition, asset_type, submitted_by_user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING {JOURNAL_COLUMNS}"
    );
    let journal = sqlx::query_as::<_, Journal>(&sql)
        .bind(ledger.organization_id())
        .bind(ledger.election_id())
        .bind(header.journal_date)
        .bind(header.description.as_deref().unwrap_or_default().trim())
        .bind(header.contact_id)
        .bind(normalize_optional(header.classification.as_deref()))
        .bind(normalize_optional(header.non_monetary_basis.as_deref()))
        .bind(normalize_optional(header.notes.as_deref()))
        .bind(header.amount_political_grant)
        .bind(header.amount_political_fund)
        .bind(header.amount_public_subsidy)
        .bind(header.is_receipt_hard_to_collect)
        .bind(normalize_optional(header.receipt_hard_to_collect_reason.as_deref()))
        .bind(header.status().as_str())
        .bind(header.is_asset_acquisition)
        .bind(normalize_optional(header.asset_type.as_deref()))
        .bind(submitted_by)
        .fetch_one(&mut *tx)
        .await?;
    let entries = insert_entries(&mut tx, journal.id, entries).await?;

    tx.commit().await?;
    Ok(JournalDetail { journal, entries, contact: None })
}

/// Rewrite a journal's header and, when `entries` is given, replace its lines.
///
/// Both the stored and the new journal date must fall in editable years.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    update: &JournalUpdate,
) -> Result<JournalDetail, AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_journal(&mut tx, id).await?;
    let ledger = current.ledger()?;
    let header = update.apply(&current);

    let mut errors = header.validation_errors();
    if let Some(entries) = &update.entries {
        errors.extend(validate_entries(entries));
    }
    if !errors.is_empty() {
        return Err(AppError::from_field_errors(errors));
    }
    ensure_date_editable(&mut tx, ledger, current.journal_date).await?;
    ensure_date_editable(&mut tx, ledger, header.journal_date).await?;
    ensure_references_owned(
        &mut tx,
        ledger,
        header.contact_id,
        update.entries.as_deref().unwrap_or_default(),
    )
    .await?;

    let sql = format!(
        "UPDATE journals SET journal_date = $2, description = $3, contact_id = $4, \
             classification = $5, non_monetary_basis = $6, notes = $7, \
             amount_political_grant = $8, amount_political_fund = $9, amount_public_subsidy = $10, \
             is_receipt_hard_to_collect = $11, receipt_hard_to_collect_reason = $12, \
             is_asset_acquisition = $13, asset_type = $14, updated_at = NOW() \
         WHERE id = $1 RETURNING {JOURNAL_COLUMNS}"
    );
    let journal = sqlx::query_as::<_, Journal>(&sql)
        .bind(id)
        .bind(header.journal_date)
        .bind(header.description.as_deref().unwrap_or_default().trim())
        .bind(header.contact_id)
        .bind(normalize_optional(header.classification.as_deref()))
        .bind(normalize_optional(header.non_monetary_basis.as_deref()))
        .bind(normalize_optional(header.notes.as_deref()))
        .bind(header.amount_political_grant)
        .bind(header.amount_political_fund)
        .bind(header.amount_public_subsidy)
        .bind(header.is_receipt_hard_to_collect)
        .bind(normalize_optional(header.receipt_hard_to_collect_reason.as_deref()))
        .bind(header.is_asset_acquisition)
        .bind(normalize_optional(header.asset_type.as_deref()))
        .fetch_one(&mut *tx)
        .await?;

    let entries = match &update.entries {
        Some(replacement) => {
            sqlx::query("DELETE FROM journal_entries WHERE journal_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_entries(&mut tx, id, replacement).await?
        }
        None => find_entries(&mut *tx, id).await?,
    };

    tx.commit().await?;
    Ok(JournalDetail { journal, entries, contact: None })
}

/// Delete a journal; its entries and receipts go with it.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Journal, AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_journal(&mut tx, id).await?;
    ensure_date_editable(&mut tx, current.ledger()?, current.journal_date).await?;

    sqlx::query("DELETE FROM journals WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(current)
}

/// Promote a draft to approved. The draft must carry a date in an editable year.
pub async fn approve(pool: &PgPool, id: Uuid) -> Result<Journal, AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_journal(&mut tx, id).await?;

    if current.status != JournalStatus::Draft {
        return Err(AppError::InvalidState(format!(
            "Only draft journals can be approved. Current status: {}",
            current.status
        )));
    }
    if current.journal_date.is_none() {
        return Err(AppError::Validation(
            "Journal date is required for approved journals".to_string(),
        ));
    }
    ensure_date_editable(&mut tx, current.ledger()?, current.journal_date).await?;

    let sql = format!(
        "UPDATE journals SET status = 'approved', updated_at = NOW() \
         WHERE id = $1 RETURNING {JOURNAL_COLUMNS}"
    );
    let journal = sqlx::query_as::<_, Journal>(&sql)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(journal)
}
