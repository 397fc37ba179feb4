use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

/// Append an entry to the audit trail.
///
/// Callers treat audit failures as non-fatal: the primary write has already
/// happened and is not rolled back because the trail could not be written.
pub async fn log<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    details: Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (user_id, action, target_type, target_id, details)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details)
    .execute(executor)
    .await?;
    Ok(())
}

/// Write an audit entry, logging instead of failing when the insert errors.
pub async fn record<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    details: Value,
) {
    if let Err(e) = log(executor, user_id, action, target_type, target_id, details).await {
        log::warn!("Failed to write audit entry {action} for {target_type} {target_id}: {e}");
    }
}

/// Delete audit entries older than the retention window.
pub async fn cleanup_old_entries(pool: &sqlx::PgPool, retention_days: i32) {
    let result = sqlx::query(
        "DELETE FROM audit_log WHERE created_at < NOW() - make_interval(days => $1)",
    )
    .bind(retention_days)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => {
            log::info!("Audit cleanup removed {} entries", done.rows_affected());
        }
        Ok(_) => {}
        Err(e) => log::warn!("Audit cleanup failed: {e}"),
    }
}
