use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit;
use crate::auth::access::{self, LedgerAccess};
use crate::auth::session::AuthUser;
use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::handlers::{LedgerQuery, created, ok};
use crate::models::ledger::{self, LedgerRef};
use crate::models::member::queries as member_queries;
use crate::models::member::types::{MemberRoleUpdate, NewMember, parse_role};
use crate::models::member::{LedgerMember, LedgerRole, Permission};

fn ensure_assignable(access: &LedgerAccess, role: LedgerRole) -> Result<(), AppError> {
    if access.effective_role().assignable().contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("You cannot assign the {role} role")))
    }
}

fn member_ledger(member: &LedgerMember) -> Result<LedgerRef, AppError> {
    LedgerRef::from_ids(member.organization_id, member.election_id)
        .map_err(|e| AppError::Internal(format!("member {} has no single ledger: {e}", member.id)))
}

/// Load a member and confirm the caller may manage the ledger it belongs to.
async fn managed_member(
    pool: &PgPool,
    user: &AuthUser,
    id: Uuid,
) -> Result<(LedgerMember, LedgerRef, LedgerAccess), AppError> {
    let member = member_queries::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
    let target = member_ledger(&member)?;
    let access = access::require_permission(pool, user, target, Permission::ManageMembers).await?;
    Ok((member, target, access))
}

/// GET /api/members?organization_id=|election_id= - Members of a ledger
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse, AppError> {
    let target = query.ledger()?;
    access::require_permission(&pool, &user, target, Permission::ViewLedger).await?;

    let members = member_queries::find_for_ledger(&pool, target).await?;
    Ok(ok(members))
}

/// POST /api/members - Invite a user onto a ledger
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<NewMember>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let target = LedgerRef::from_ids(body.organization_id, body.election_id)?;
    let access = access::require_permission(&pool, &user, target, Permission::ManageMembers).await?;

    let role = parse_role(body.role.as_deref());
    ensure_assignable(&access, role)?;

    let Some(member_user_id) = body.user_id else {
        return Err(AppError::Validation("user_id is required".to_string()));
    };
    if ledger::find_owner(pool.get_ref(), target).await? == Some(member_user_id) {
        return Err(AppError::Conflict(format!(
            "That user already owns this {}",
            target.kind()
        )));
    }

    let member = member_queries::create(&pool, member_user_id, target, role, user.id).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "member.added",
        target.kind(),
        target.id(),
        json!({ "member_id": member.id, "user_id": member.user_id, "role": member.role }),
    )
    .await;

    Ok(created(member))
}

/// PUT /api/members/{id} - Change a member's role
pub async fn update(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<MemberRoleUpdate>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let (member, target, access) = managed_member(&pool, &user, path.into_inner()).await?;

    let role = parse_role(body.role.as_deref());
    ensure_assignable(&access, member.role)?;
    ensure_assignable(&access, role)?;

    let updated = member_queries::update_role(&pool, member.id, role).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "member.role_changed",
        target.kind(),
        target.id(),
        json!({ "member_id": member.id, "from": member.role, "to": updated.role }),
    )
    .await;

    Ok(ok(updated))
}

/// DELETE /api/members/{id} - Remove a member; the ledger's owner cannot be removed
pub async fn delete(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (member, target, access) = managed_member(&pool, &user, path.into_inner()).await?;

    if ledger::find_owner(pool.get_ref(), target).await? == Some(member.user_id) {
        return Err(AppError::InvalidState(format!(
            "The owner of this {} cannot be removed",
            target.kind()
        )));
    }
    if member.user_id != user.id {
        ensure_assignable(&access, member.role)?;
    }

    member_queries::delete(&pool, member.id).await?;
    audit::record(
        pool.get_ref(),
        user.id,
        "member.removed",
        target.kind(),
        target.id(),
        json!({ "member_id": member.id, "user_id": member.user_id }),
    )
    .await;

    Ok(ok(json!({ "id": member.id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_assign_any_role() {
        for role in LedgerRole::ALL {
            assert!(ensure_assignable(&LedgerAccess::Owner, role).is_ok());
        }
    }

    #[test]
    fn members_assign_at_or_below_their_role() {
        let approver = LedgerAccess::Member(LedgerRole::Approver);
        assert!(ensure_assignable(&approver, LedgerRole::Viewer).is_ok());
        assert!(ensure_assignable(&approver, LedgerRole::Approver).is_ok());
        assert!(matches!(
            ensure_assignable(&approver, LedgerRole::Admin),
            Err(AppError::Forbidden(_))
        ));
    }
}
