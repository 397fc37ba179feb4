use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::validate::Validate;
use crate::errors::AppError;
use crate::models::ledger::LedgerRef;

/// Ownership transfer lifecycle. Every transition out of `pending` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    Declined,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Declined => "declined",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "completed" => Ok(TransferStatus::Completed),
            "declined" => Ok(TransferStatus::Declined),
            "cancelled" => Ok(TransferStatus::Cancelled),
            other => Err(format!("unknown transfer status: {other}")),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Accept,
    Decline,
    Cancel,
}

impl TransferAction {
    pub fn target_status(&self) -> TransferStatus {
        match self {
            TransferAction::Accept => TransferStatus::Completed,
            TransferAction::Decline => TransferStatus::Declined,
            TransferAction::Cancel => TransferStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::Accept => "accept",
            TransferAction::Decline => "decline",
            TransferAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnershipTransfer {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnershipTransfer {
    pub fn ledger(&self) -> Result<LedgerRef, AppError> {
        LedgerRef::from_ids(self.organization_id, self.election_id)
            .map_err(|e| AppError::Internal(format!("transfer {} has no single target: {e}", self.id)))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransferRow {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for OwnershipTransfer {
    type Error = AppError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(OwnershipTransfer {
            id: row.id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            organization_id: row.organization_id,
            election_id: row.election_id,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Pending transfer addressed to the caller, with the resource name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IncomingTransfer {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub resource_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Check that `caller` may apply `action` to `transfer`, returning the
/// status the transfer moves to.
///
/// The party check runs first: a stranger learns nothing about the status.
pub fn authorize(
    transfer: &OwnershipTransfer,
    caller: Uuid,
    action: TransferAction,
) -> Result<TransferStatus, AppError> {
    let permitted = match action {
        TransferAction::Accept | TransferAction::Decline => transfer.to_user_id == caller,
        TransferAction::Cancel => transfer.from_user_id == caller,
    };
    if !permitted {
        let who = match action {
            TransferAction::Accept | TransferAction::Decline => "recipient",
            TransferAction::Cancel => "requester",
        };
        return Err(AppError::Forbidden(format!(
            "Only the {who} can {} this transfer",
            action.as_str()
        )));
    }

    if transfer.status != TransferStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "Only pending transfers can be changed. Current status: {}",
            transfer.status
        )));
    }

    Ok(action.target_status())
}

/// JSON input for requesting a transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransfer {
    pub to_user_id: Option<String>,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
}

impl NewTransfer {
    pub fn recipient(&self) -> Result<Uuid, AppError> {
        let raw = self.to_user_id.as_deref().unwrap_or_default().trim();
        Uuid::parse_str(raw)
            .map_err(|_| AppError::Validation("to_user_id must be a valid user id".to_string()))
    }
}

impl Validate for NewTransfer {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.to_user_id.as_deref().unwrap_or_default().trim().is_empty() {
            errors.push("to_user_id is required".to_string());
        } else if self.recipient().is_err() {
            errors.push("to_user_id must be a valid user id".to_string());
        }
        if let Err(AppError::Validation(msg)) = LedgerRef::from_ids(self.organization_id, self.election_id) {
            errors.push(msg);
        }
        errors
    }
}
