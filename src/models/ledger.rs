use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::errors::AppError;

/// The resource a ledger (journals, members, transfers) hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LedgerRef {
    Organization(Uuid),
    Election(Uuid),
}

impl LedgerRef {
    /// Build from the `organization_id` / `election_id` pair used in payloads.
    /// Exactly one must be present.
    pub fn from_ids(organization_id: Option<Uuid>, election_id: Option<Uuid>) -> Result<Self, AppError> {
        match (organization_id, election_id) {
            (Some(id), None) => Ok(LedgerRef::Organization(id)),
            (None, Some(id)) => Ok(LedgerRef::Election(id)),
            (None, None) => Err(AppError::Validation(
                "Either organization_id or election_id is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Specify only one of organization_id or election_id".to_string(),
            )),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LedgerRef::Organization(id) | LedgerRef::Election(id) => *id,
        }
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        match self {
            LedgerRef::Organization(id) => Some(*id),
            LedgerRef::Election(_) => None,
        }
    }

    pub fn election_id(&self) -> Option<Uuid> {
        match self {
            LedgerRef::Election(id) => Some(*id),
            LedgerRef::Organization(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerRef::Organization(_) => "organization",
            LedgerRef::Election(_) => "election",
        }
    }

    /// Owning table; only ever one of two fixed names.
    fn table(&self) -> &'static str {
        match self {
            LedgerRef::Organization(_) => "political_organizations",
            LedgerRef::Election(_) => "elections",
        }
    }
}

/// Current owner of the resource, or `None` if it no longer exists.
pub async fn find_owner<'e, E: PgExecutor<'e>>(
    executor: E,
    ledger: LedgerRef,
) -> Result<Option<Uuid>, AppError> {
    let sql = format!("SELECT owner_user_id FROM {} WHERE id = $1", ledger.table());
    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(ledger.id())
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Same as [`find_owner`], but locks the row for the rest of the transaction.
pub async fn lock_owner<'e, E: PgExecutor<'e>>(
    executor: E,
    ledger: LedgerRef,
) -> Result<Option<Uuid>, AppError> {
    let sql = format!(
        "SELECT owner_user_id FROM {} WHERE id = $1 FOR UPDATE",
        ledger.table()
    );
    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(ledger.id())
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn set_owner<'e, E: PgExecutor<'e>>(
    executor: E,
    ledger: LedgerRef,
    new_owner: Uuid,
) -> Result<(), AppError> {
    let sql = format!(
        "UPDATE {} SET owner_user_id = $1, updated_at = NOW() WHERE id = $2",
        ledger.table()
    );
    let result = sqlx::query(&sql)
        .bind(new_owner)
        .bind(ledger.id())
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} not found", ledger.kind())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_id_is_required() {
        let id = Uuid::new_v4();
        assert_eq!(LedgerRef::from_ids(Some(id), None).unwrap(), LedgerRef::Organization(id));
        assert_eq!(LedgerRef::from_ids(None, Some(id)).unwrap(), LedgerRef::Election(id));
        assert!(matches!(LedgerRef::from_ids(None, None), Err(AppError::Validation(_))));
        assert!(matches!(
            LedgerRef::from_ids(Some(id), Some(Uuid::new_v4())),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn accessors_split_by_kind() {
        let id = Uuid::new_v4();
        let org = LedgerRef::Organization(id);
        assert_eq!(org.organization_id(), Some(id));
        assert_eq!(org.election_id(), None);
        assert_eq!(org.kind(), "organization");
        let election = LedgerRef::Election(id);
        assert_eq!(election.election_id(), Some(id));
        assert_eq!(election.id(), id);
        assert_eq!(election.kind(), "election");
    }
}
