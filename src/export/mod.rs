//! Full-account JSON export and per-ledger CSV reports.

pub mod csv;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::session::AuthUser;
use crate::errors::AppError;
use crate::models::contact::{self, Contact};
use crate::models::election::{self, Election};
use crate::models::journal::queries as journal_queries;
use crate::models::journal::receipt;
use crate::models::journal::{Journal, JournalEntry, Receipt};
use crate::models::ledger::LedgerRef;
use crate::models::organization::{self, Organization};
use crate::models::politician::{self, Politician};
use crate::models::sub_account::{self, SubAccount};

pub const EXPORT_FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
pub struct ExportedUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
}

/// Everything the caller owns, as one JSON document.
#[derive(Debug, Serialize)]
pub struct LedgerExport {
    pub exported_at: DateTime<Utc>,
    pub version: &'static str,
    pub user: ExportedUser,
    pub political_organizations: Vec<Organization>,
    pub politicians: Vec<Politician>,
    pub elections: Vec<Election>,
    pub contacts: Vec<Contact>,
    pub sub_accounts: Vec<SubAccount>,
    pub journals: Vec<Journal>,
    pub journal_entries: Vec<JournalEntry>,
    pub receipts: Vec<Receipt>,
}

impl LedgerExport {
    pub fn file_name(&self) -> String {
        format!("ledger-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}

pub async fn collect(pool: &PgPool, user: &AuthUser) -> Result<LedgerExport, AppError> {
    let owner = user.scope.owner_filter();
    let journals = journal_queries::find_for_owner(pool, owner).await?;
    let ids: Vec<Uuid> = journals.iter().map(|j| j.id).collect();

    Ok(LedgerExport {
        exported_at: Utc::now(),
        version: EXPORT_FORMAT_VERSION,
        user: ExportedUser {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        },
        political_organizations: organization::find_owned(pool, owner).await?,
        politicians: politician::find_owned(pool, owner).await?,
        elections: election::find_owned(pool, owner).await?,
        contacts: contact::queries::find_owned(pool, owner).await?,
        sub_accounts: sub_account::find_owned(pool, owner, None).await?,
        journal_entries: journal_queries::find_entries_for_journals(pool, &ids).await?,
        receipts: receipt::find_for_journals(pool, &ids).await?,
        journals,
    })
}

/// A rendered CSV report ready to be sent as an attachment.
#[derive(Debug)]
pub struct CsvReport {
    pub file_name: String,
    pub body: String,
}

/// Render one CSV report over the approved journals of a ledger.
pub async fn csv_report(
    pool: &PgPool,
    owner: Option<Uuid>,
    ledger: LedgerRef,
    kind: csv::ReportKind,
) -> Result<CsvReport, AppError> {
    let details = journal_queries::find_details_for_ledger(pool, ledger, None).await?;
    let sub_account_names: HashMap<Uuid, String> = sub_account::find_owned(pool, owner, None)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let body = csv::report(kind, &details, &sub_account_names, ledger);
    Ok(CsvReport {
        file_name: format!("{}-{}.csv", kind.file_stem(), Utc::now().format("%Y-%m-%d")),
        body: format!("{}{body}", csv::UTF8_BOM),
    })
}
