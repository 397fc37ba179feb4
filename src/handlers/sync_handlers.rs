use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::session::{AccessScope, AuthUser};
use crate::errors::AppError;
use crate::handlers::ok;
use crate::hub::HubClient;
use crate::sync::{self, SyncRequest};

/// POST /api/sync?type=&ledger_id=&fiscal_year=&force= - Publish approved journals to the Hub
///
/// Runs under the test-mode identity are flagged `is_test` on the Hub.
pub async fn run(
    pool: web::Data<PgPool>,
    hub: web::Data<HubClient>,
    user: AuthUser,
    query: web::Query<SyncRequest>,
) -> Result<HttpResponse, AppError> {
    let is_test = user.scope == AccessScope::Unrestricted;
    let summary = sync::run(&pool, &hub, user.scope.owner_filter(), is_test, &query).await?;
    log::info!(
        "Sync by {}: {} ledgers, {} created, {} updated, {} skipped, {} errors",
        user.id,
        summary.ledgers_synced,
        summary.created,
        summary.updated,
        summary.skipped,
        summary.errors
    );
    Ok(ok(summary))
}

/// GET /api/sync/status - The Hub's view of the sync pipeline
pub async fn status(hub: web::Data<HubClient>, _user: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(ok(hub.sync_status().await?))
}
