use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::validate::Validate;
use crate::errors::AppError;

/// Lifecycle of a fiscal year's ledger.
///
/// ```text
/// (no row) / open --close--> closed --archive--> locked
/// ```
///
/// `temporary_unlock` is a stored status that permits edits; nothing in the
/// application moves a year into or out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStatus {
    Open,
    Closed,
    Locked,
    TemporaryUnlock,
}

impl ClosureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureStatus::Open => "open",
            ClosureStatus::Closed => "closed",
            ClosureStatus::Locked => "locked",
            ClosureStatus::TemporaryUnlock => "temporary_unlock",
        }
    }

    pub fn allows_edits(&self) -> bool {
        matches!(self, ClosureStatus::Open | ClosureStatus::TemporaryUnlock)
    }
}

impl FromStr for ClosureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ClosureStatus::Open),
            "closed" => Ok(ClosureStatus::Closed),
            "locked" => Ok(ClosureStatus::Locked),
            "temporary_unlock" => Ok(ClosureStatus::TemporaryUnlock),
            other => Err(format!("unknown closure status: {other}")),
        }
    }
}

impl fmt::Display for ClosureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn describe(current: Option<ClosureStatus>) -> &'static str {
    current.map(|s| s.as_str()).unwrap_or("not found")
}

/// Guard for archiving: only a `closed` year may become `locked`.
pub fn archive_transition(year: i32, current: Option<ClosureStatus>) -> Result<ClosureStatus, AppError> {
    match current {
        Some(ClosureStatus::Closed) => Ok(ClosureStatus::Locked),
        other => Err(AppError::InvalidState(format!(
            "Year {year} must be in 'closed' status to archive. Current status: {}",
            describe(other)
        ))),
    }
}

/// Guard for closing: a year with no row, or an `open` row, may be closed.
pub fn close_transition(year: i32, current: Option<ClosureStatus>) -> Result<ClosureStatus, AppError> {
    match current {
        None | Some(ClosureStatus::Open) => Ok(ClosureStatus::Closed),
        Some(other) => Err(AppError::InvalidState(format!(
            "Year {year} must be in 'open' status to close. Current status: {other}"
        ))),
    }
}

/// Guard applied before any journal write dated in `year`.
pub fn ensure_editable(year: i32, current: Option<ClosureStatus>) -> Result<(), AppError> {
    match current {
        Some(status) if !status.allows_edits() => Err(AppError::InvalidState(format!(
            "Fiscal year {year} is {status} and cannot be edited"
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YearClosure {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub fiscal_year: i32,
    pub status: ClosureStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct YearClosureRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub fiscal_year: i32,
    pub status: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<YearClosureRow> for YearClosure {
    type Error = AppError;

    fn try_from(row: YearClosureRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(AppError::Internal)?;
        Ok(YearClosure {
            id: row.id,
            organization_id: row.organization_id,
            fiscal_year: row.fiscal_year,
            status,
            closed_at: row.closed_at,
            locked_at: row.locked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// JSON input for close and archive.
#[derive(Debug, Clone, Deserialize)]
pub struct YearClosureRequest {
    #[serde(alias = "organizationId")]
    pub organization_id: Option<Uuid>,
    #[serde(alias = "fiscal_year")]
    pub year: Option<i32>,
}

impl Validate for YearClosureRequest {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.organization_id.is_none() {
            errors.push("organization_id is required".to_string());
        }
        match self.year {
            None => errors.push("year is required".to_string()),
            Some(y) if !(1900..=9999).contains(&y) => {
                errors.push("year must be a four-digit year".to_string())
            }
            Some(_) => {}
        }
        errors
    }
}
