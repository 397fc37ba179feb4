use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::session::AuthUser;
use crate::auth::validate::{Validate, validate_one_of};
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::models::sub_account::{self, LEDGER_TYPES, NewSubAccount, SubAccountRename};

#[derive(Debug, Deserialize)]
pub struct SubAccountListQuery {
    pub ledger_type: Option<String>,
}

/// GET /api/sub-accounts?ledger_type=
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<SubAccountListQuery>,
) -> Result<HttpResponse, AppError> {
    let ledger_type = query.ledger_type.as_deref().filter(|t| !t.is_empty());
    if let Some(error) = ledger_type.and_then(|t| validate_one_of(Some(t), "ledger_type", &LEDGER_TYPES)) {
        return Err(AppError::Validation(error));
    }

    let accounts = sub_account::find_owned(&pool, user.scope.owner_filter(), ledger_type).await?;
    Ok(ok(accounts))
}

/// POST /api/sub-accounts
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewSubAccount>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let account = sub_account::create(&pool, user.id, &body).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "sub_account.created",
        "sub_account",
        account.id,
        json!({ "parent_account_code": account.parent_account_code, "name": account.name }),
    )
    .await;

    Ok(created(account))
}

/// GET /api/sub-accounts/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let account = sub_account::find_by_id(&pool, path.into_inner(), user.scope.owner_filter())
        .await?
        .ok_or_else(|| AppError::NotFound("Sub-account not found".to_string()))?;
    Ok(ok(account))
}

/// PUT /api/sub-accounts/{id} - Only the name can change
pub async fn rename(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<SubAccountRename>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let name = body.name.as_deref().unwrap_or_default();

    let account =
        sub_account::rename(&pool, path.into_inner(), user.scope.owner_filter(), name).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "sub_account.renamed",
        "sub_account",
        account.id,
        json!({ "name": account.name }),
    )
    .await;

    Ok(ok(account))
}

/// DELETE /api/sub-accounts/{id} - Refused while any journal entry uses it
pub async fn delete(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    sub_account::delete(&pool, id, user.scope.owner_filter()).await?;
    audit::record(pool.get_ref(), user.id, "sub_account.deleted", "sub_account", id, json!({})).await;

    Ok(ok(json!({ "id": id })))
}
