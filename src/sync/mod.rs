//! Publishing approved journals to the Hub.
//!
//! For every ledger in scope: approved journals of the fiscal year are read,
//! the ledger summary is upserted, journals are transformed and upserted, and
//! a change-log entry is recorded. A failing ledger is logged and counted;
//! the remaining ledgers are still attempted.

pub mod transform;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::hub::{ChangeLogInput, HubClient, HubError, SyncLedgerInput, SyncResult};
use crate::models::journal::JournalDetail;
use crate::models::journal::queries as journal_queries;
use crate::models::ledger::LedgerRef;
use crate::models::{election, organization};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Organization,
    Election,
}

/// Query parameters of `POST /api/sync`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(rename = "type")]
    pub kind: Option<LedgerKind>,
    pub ledger_id: Option<Uuid>,
    pub fiscal_year: Option<i32>,
    #[serde(default)]
    pub force: bool,
}

/// A ledger together with the Hub identifiers it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub ledger: LedgerRef,
    pub hub_politician_id: Option<String>,
    pub hub_election_id: Option<String>,
}

impl SyncTarget {
    fn source_id(&self) -> String {
        self.ledger.id().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
    pub ledgers_synced: u64,
}

impl SyncSummary {
    fn absorb(&mut self, result: &SyncResult) {
        self.created += result.created;
        self.updated += result.updated;
        self.skipped += result.skipped;
        self.errors += result.errors;
    }
}

/// Ledgers visible to `owner` (all ledgers when `None`), narrowed by the request.
pub async fn find_targets(
    pool: &PgPool,
    owner: Option<Uuid>,
    request: &SyncRequest,
) -> Result<Vec<SyncTarget>, AppError> {
    let mut targets = Vec::new();
    if request.kind != Some(LedgerKind::Election) {
        for org in organization::find_owned(pool, owner).await? {
            targets.push(SyncTarget {
                ledger: LedgerRef::Organization(org.id),
                hub_politician_id: None,
                hub_election_id: None,
            });
        }
    }
    if request.kind != Some(LedgerKind::Organization) {
        for e in election::find_owned(pool, owner).await? {
            targets.push(SyncTarget {
                ledger: LedgerRef::Election(e.id),
                hub_politician_id: Some(e.hub_politician_id),
                hub_election_id: e.hub_election_id,
            });
        }
    }
    if let Some(id) = request.ledger_id {
        targets.retain(|t| t.ledger.id() == id);
    }
    Ok(targets)
}

/// Push one ledger's approved journals to the Hub.
///
/// Returns `None` when the ledger has nothing approved to publish.
pub async fn sync_target(
    hub: &HubClient,
    target: &SyncTarget,
    fiscal_year: i32,
    details: &[JournalDetail],
    is_test: bool,
    force: bool,
) -> Result<Option<SyncResult>, HubError> {
    if details.is_empty() {
        return Ok(None);
    }
    let source_id = target.source_id();
    let totals = transform::ledger_totals(details);

    hub.sync_ledger(&SyncLedgerInput {
        ledger_source_id: source_id.clone(),
        politician_id: target.hub_politician_id.clone(),
        organization_id: target.ledger.organization_id().map(|id| id.to_string()),
        election_id: target
            .hub_election_id
            .clone()
            .or_else(|| target.ledger.election_id().map(|id| id.to_string())),
        fiscal_year,
        total_income: totals.total_income,
        total_expense: totals.total_expense,
        journal_count: totals.journal_count,
        is_test,
    })
    .await?;

    let mut result = SyncResult::default();
    let mut inputs = Vec::with_capacity(details.len());
    for detail in details {
        if transform::should_sync(&detail.journal) {
            inputs.push(transform::transform_journal(detail, &source_id, is_test));
        } else {
            result.skipped += 1;
        }
    }
    if !inputs.is_empty() {
        let synced = hub.sync_journals(&inputs).await?;
        result.created += synced.created;
        result.updated += synced.updated;
        result.skipped += synced.skipped;
        result.errors += synced.errors;
    }

    hub.record_change_log(&ChangeLogInput {
        ledger_source_id: source_id,
        change_summary: if force { "forced resync" } else { "sync" }.to_string(),
        change_details: json!({
            "journal_count": inputs.len(),
            "created": result.created,
            "updated": result.updated,
        }),
    })
    .await?;

    Ok(Some(result))
}

/// Sync every ledger in scope for `owner`.
pub async fn run(
    pool: &PgPool,
    hub: &HubClient,
    owner: Option<Uuid>,
    is_test: bool,
    request: &SyncRequest,
) -> Result<SyncSummary, AppError> {
    let targets = find_targets(pool, owner, request).await?;
    if targets.is_empty() {
        return Err(AppError::NotFound("No ledgers found".to_string()));
    }
    let fiscal_year = request.fiscal_year.unwrap_or_else(|| Utc::now().year());

    let mut summary = SyncSummary::default();
    for target in &targets {
        let details =
            journal_queries::find_details_for_ledger(pool, target.ledger, Some(fiscal_year)).await?;
        match sync_target(hub, target, fiscal_year, &details, is_test, request.force).await {
            Ok(Some(result)) => {
                summary.absorb(&result);
                summary.ledgers_synced += 1;
                log::info!(
                    "Synced {} {} ({} journals) for fiscal year {fiscal_year}",
                    target.ledger.kind(),
                    target.ledger.id(),
                    details.len()
                );
            }
            Ok(None) => log::debug!("No approved journals for {} {}", target.ledger.kind(), target.ledger.id()),
            Err(e) => {
                log::error!("Sync failed for {} {}: {e}", target.ledger.kind(), target.ledger.id());
                summary.errors += 1;
            }
        }
    }
    Ok(summary)
}
