use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::access;
use crate::auth::session::AuthUser;
use crate::errors::AppError;
use crate::export::{self, csv::ReportKind};
use crate::models::ledger::{self, LedgerRef};
use crate::models::member::Permission;

#[derive(Debug, Deserialize)]
pub struct CsvExportQuery {
    #[serde(rename = "type", default)]
    pub kind: ReportKind,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
}

fn attachment(file_name: &str) -> (header::HeaderName, String) {
    (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{file_name}\""),
    )
}

/// GET /api/export - Everything the caller owns as one JSON document
pub async fn json_export(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let export = export::collect(&pool, &user).await?;
    log::info!(
        "Export for {}: {} journals, {} receipts",
        user.id,
        export.journals.len(),
        export.receipts.len()
    );
    Ok(HttpResponse::Ok()
        .insert_header(attachment(&export.file_name()))
        .json(export))
}

/// GET /api/export-csv?type=expense|revenue|summary|assets&organization_id=|election_id=
pub async fn csv_export(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<CsvExportQuery>,
) -> Result<HttpResponse, AppError> {
    let target = LedgerRef::from_ids(query.organization_id, query.election_id)?;
    access::require_permission(&pool, &user, target, Permission::ViewLedger).await?;
    // Sub-account names belong to the ledger's owner, not to a viewing member.
    let owner = ledger::find_owner(pool.get_ref(), target).await?;

    let report = export::csv_report(&pool, owner, target, query.kind).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(attachment(&report.file_name))
        .body(report.body))
}
