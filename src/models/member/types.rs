use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_one_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    ViewLedger,
    SubmitJournal,
    RegisterJournal,
    ApproveJournal,
    ManageMembers,
    ManageContacts,
    EditLedgerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRole {
    Admin,
    Accountant,
    Approver,
    Submitter,
    Viewer,
}

impl LedgerRole {
    /// Highest privilege first.
    pub const ALL: [LedgerRole; 5] = [
        LedgerRole::Admin,
        LedgerRole::Accountant,
        LedgerRole::Approver,
        LedgerRole::Submitter,
        LedgerRole::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerRole::Admin => "admin",
            LedgerRole::Accountant => "accountant",
            LedgerRole::Approver => "approver",
            LedgerRole::Submitter => "submitter",
            LedgerRole::Viewer => "viewer",
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            LedgerRole::Admin => &[
                ViewLedger,
                SubmitJournal,
                RegisterJournal,
                ApproveJournal,
                ManageMembers,
                EditLedgerSettings,
                ManageContacts,
            ],
            LedgerRole::Accountant => &[
                ViewLedger,
                SubmitJournal,
                RegisterJournal,
                ApproveJournal,
                EditLedgerSettings,
                ManageContacts,
            ],
            LedgerRole::Approver => &[ViewLedger, SubmitJournal, ApproveJournal, ManageContacts],
            LedgerRole::Submitter => &[ViewLedger, SubmitJournal, ManageContacts],
            LedgerRole::Viewer => &[ViewLedger],
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Roles this role may hand out: admins assign anything, others only
    /// their own level or below.
    pub fn assignable(&self) -> &'static [LedgerRole] {
        let index = LedgerRole::ALL
            .iter()
            .position(|r| r == self)
            .unwrap_or(LedgerRole::ALL.len() - 1);
        &LedgerRole::ALL[index..]
    }

    /// Stored values outside the known set degrade to `Viewer`.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(LedgerRole::Viewer)
    }
}

impl FromStr for LedgerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerRole::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

impl fmt::Display for LedgerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ROLE_NAMES: [&str; 5] = ["admin", "accountant", "approver", "submitter", "viewer"];

#[derive(Debug, Clone, Serialize)]
pub struct LedgerMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub role: LedgerRole,
    pub invited_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MemberRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub role: String,
    pub invited_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<MemberRow> for LedgerMember {
    fn from(row: MemberRow) -> Self {
        LedgerMember {
            id: row.id,
            user_id: row.user_id,
            organization_id: row.organization_id,
            election_id: row.election_id,
            role: LedgerRole::from_db(&row.role),
            invited_by_user_id: row.invited_by_user_id,
            created_at: row.created_at,
        }
    }
}

/// JSON input for inviting a member.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub role: Option<String>,
}

impl Validate for NewMember {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.user_id.is_none() {
            errors.push("user_id is required".to_string());
        }
        errors.extend(validate_one_of(self.role.as_deref(), "role", &ROLE_NAMES));
        errors
    }
}

/// JSON input for changing a member's role.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRoleUpdate {
    pub role: Option<String>,
}

impl Validate for MemberRoleUpdate {
    fn validation_errors(&self) -> Vec<String> {
        validate_one_of(self.role.as_deref(), "role", &ROLE_NAMES)
            .into_iter()
            .collect()
    }
}

/// Parse a role that has already passed validation.
pub fn parse_role(value: Option<&str>) -> LedgerRole {
    value.map(LedgerRole::from_db).unwrap_or(LedgerRole::Viewer)
}
