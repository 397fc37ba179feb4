use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{created, ok};
use crate::models::contact::queries as contact_queries;
use crate::models::contact::types::{ContactUpdate, NewContact};

#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    /// Return only the columns a picker needs.
    #[serde(default)]
    pub summary: bool,
}

/// GET /api/contacts - Contacts owned by the caller, by name
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<ContactListQuery>,
) -> Result<HttpResponse, AppError> {
    let owner = user.scope.owner_filter();
    if query.summary {
        return Ok(ok(contact_queries::find_summaries(&pool, owner).await?));
    }
    Ok(ok(contact_queries::find_owned(&pool, owner).await?))
}

/// POST /api/contacts
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewContact>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let contact = contact_queries::create(&pool, user.id, &body).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "contact.created",
        "contact",
        contact.id,
        json!({ "contact_type": contact.contact_type }),
    )
    .await;

    Ok(created(contact))
}

/// GET /api/contacts/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contact = contact_queries::find_by_id(&pool, path.into_inner(), user.scope.owner_filter())
        .await?
        .ok_or_else(|| AppError::NotFound("Contact not found".to_string()))?;
    Ok(ok(contact))
}

/// PUT /api/contacts/{id} - Partial update; explicit nulls clear optional fields
pub async fn update(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ContactUpdate>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let contact =
        contact_queries::update(&pool, path.into_inner(), user.scope.owner_filter(), &body).await?;
    audit::record(pool.get_ref(), user.id, "contact.updated", "contact", contact.id, json!({})).await;

    Ok(ok(contact))
}

/// DELETE /api/contacts/{id} - Refused while any journal names the contact
pub async fn delete(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    contact_queries::delete(&pool, id, user.scope.owner_filter()).await?;
    audit::record(pool.get_ref(), user.id, "contact.deleted", "contact", id, json!({})).await;

    Ok(ok(json!({ "id": id })))
}
