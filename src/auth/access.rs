//! Ledger-scoped access control.
//!
//! A caller's standing on a ledger is resolved from two sources:
//!
//! ```text
//! political_organizations.owner_user_id / elections.owner_user_id  -> Owner
//! ledger_members(user_id, organization_id | election_id, role)      -> Member(role)
//! ```
//!
//! Owners hold every permission; members hold what their role grants.
//! The test-mode identity is treated as `Unrestricted`.

use sqlx::PgPool;

use crate::auth::session::{AccessScope, AuthUser};
use crate::errors::AppError;
use crate::models::ledger::{self, LedgerRef};
use crate::models::member::queries as member_queries;
use crate::models::member::{LedgerRole, Permission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAccess {
    Owner,
    Member(LedgerRole),
    Unrestricted,
}

impl LedgerAccess {
    pub fn has(&self, permission: Permission) -> bool {
        match self {
            LedgerAccess::Owner | LedgerAccess::Unrestricted => true,
            LedgerAccess::Member(role) => role.has(permission),
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, LedgerAccess::Owner | LedgerAccess::Unrestricted)
    }

    /// Role used when comparing against assignable roles; owners act as admins.
    pub fn effective_role(&self) -> LedgerRole {
        match self {
            LedgerAccess::Member(role) => *role,
            _ => LedgerRole::Admin,
        }
    }
}

/// Resolve the caller's standing on a ledger.
///
/// Returns `NotFound` if the ledger does not exist, `Ok(None)` if the caller
/// is neither owner nor member.
pub async fn resolve(
    pool: &PgPool,
    user: &AuthUser,
    ledger: LedgerRef,
) -> Result<Option<LedgerAccess>, AppError> {
    let owner = ledger::find_owner(pool, ledger)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", ledger.kind())))?;

    if user.scope == AccessScope::Unrestricted {
        return Ok(Some(LedgerAccess::Unrestricted));
    }
    if owner == user.id {
        return Ok(Some(LedgerAccess::Owner));
    }
    let role = member_queries::role_of(pool, user.id, ledger).await?;
    Ok(role.map(LedgerAccess::Member))
}

/// Fail with `Forbidden` unless the caller holds `permission` on the ledger.
pub async fn require_permission(
    pool: &PgPool,
    user: &AuthUser,
    ledger: LedgerRef,
    permission: Permission,
) -> Result<LedgerAccess, AppError> {
    match resolve(pool, user, ledger).await? {
        Some(access) if access.has(permission) => Ok(access),
        _ => Err(AppError::Forbidden(format!(
            "You do not have permission to perform this action on this {}",
            ledger.kind()
        ))),
    }
}

/// Fail with `Forbidden` unless the caller owns the ledger.
pub async fn require_owner(pool: &PgPool, user: &AuthUser, ledger: LedgerRef) -> Result<(), AppError> {
    match resolve(pool, user, ledger).await? {
        Some(access) if access.is_owner() => Ok(()),
        _ => Err(AppError::Forbidden(format!(
            "Only the owner can perform this action on this {}",
            ledger.kind()
        ))),
    }
}
