//! Wire types of the Hub `/api/v1` API.

use actix_web::web::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::validate::{Validate, validate_one_of, validate_optional, validate_present};

pub const ORGANIZATION_TYPES: [&str; 4] =
    ["political_party", "support_group", "fund_management", "other"];
pub const EVIDENCE_TYPES: [&str; 3] = ["registration_form", "name_list", "financial_report"];
pub const ELECTION_TYPES: [&str; 5] = ["HR", "HC", "PG", "CM", "GM"];

/// `{ "data": ... }` envelope used by most Hub responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// Public record of a political organization held by the Hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubOrganization {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub organization_type: String,
    #[serde(default)]
    pub politician_id: Option<String>,
    #[serde(default)]
    pub office_address: Option<String>,
    #[serde(default)]
    pub official_url: Option<String>,
    #[serde(default)]
    pub representative_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRequest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub organization_type: String,
    #[serde(default)]
    pub requested_by_email: Option<String>,
    pub evidence_type: String,
    pub evidence_file_url: String,
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionRequest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub election_type: String,
    pub area_description: String,
    pub election_date: NaiveDate,
    #[serde(default)]
    pub requested_by_email: Option<String>,
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Registration request for an organization not yet known to the Hub.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganizationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub organization_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_politician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_email: Option<String>,
    pub evidence_type: Option<String>,
    pub evidence_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for NewOrganizationRequest {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_present(self.name.as_deref(), "name", 200));
        errors.extend(validate_one_of(
            self.organization_type.as_deref(),
            "type",
            &ORGANIZATION_TYPES,
        ));
        errors.extend(validate_one_of(self.evidence_type.as_deref(), "evidence_type", &EVIDENCE_TYPES));
        errors.extend(validate_present(
            self.evidence_file_url.as_deref(),
            "evidence_file_url",
            2048,
        ));
        errors.extend(validate_optional(self.notes.as_deref(), "notes", 2000));
        errors
    }
}

/// Registration request for an election not yet known to the Hub.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewElectionRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub election_type: Option<String>,
    pub area_description: Option<String>,
    pub election_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_politician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for NewElectionRequest {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate_present(self.name.as_deref(), "name", 200));
        errors.extend(validate_one_of(self.election_type.as_deref(), "type", &ELECTION_TYPES));
        errors.extend(validate_present(
            self.area_description.as_deref(),
            "area_description",
            500,
        ));
        if self.election_date.is_none() {
            errors.push("election_date is required".to_string());
        }
        errors.extend(validate_optional(self.notes.as_deref(), "notes", 2000));
        errors
    }
}

/// Query filter for listing registration requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub politician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Ledger summary pushed to the Hub's public ledger table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncLedgerInput {
    pub ledger_source_id: String,
    pub politician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_id: Option<String>,
    pub fiscal_year: i32,
    pub total_income: i64,
    pub total_expense: i64,
    pub journal_count: usize,
    pub is_test: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncLedgerResult {
    #[serde(default)]
    pub data: Value,
    pub action: String,
}

/// One journal as published to the Hub, with the counterparty anonymized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncJournalInput {
    pub journal_source_id: String,
    pub ledger_source_id: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: i64,
    pub contact_name: Option<String>,
    pub contact_type: Option<String>,
    pub account_code: String,
    pub classification: Option<String>,
    pub non_monetary_basis: Option<String>,
    pub note: Option<String>,
    pub public_expense_amount: Option<i64>,
    pub content_hash: String,
    pub is_test: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeLogInput {
    pub ledger_source_id: String,
    pub change_summary: String,
    pub change_details: Value,
}

/// Raw Hub response to a relayed upload.
#[derive(Debug, Clone)]
pub struct UploadRelay {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_request_requires_evidence() {
        let request = NewOrganizationRequest {
            name: Some("Sakura Support Group".into()),
            organization_type: Some("support_group".into()),
            ..Default::default()
        };
        let errors = request.validation_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("evidence_type")));
        assert!(errors.iter().any(|e| e.starts_with("evidence_file_url")));
    }

    #[test]
    fn organization_request_type_is_closed_set() {
        let request = NewOrganizationRequest {
            name: Some("x".into()),
            organization_type: Some("club".into()),
            evidence_type: Some("name_list".into()),
            evidence_file_url: Some("https://files.example/a.pdf".into()),
            ..Default::default()
        };
        assert_eq!(request.validation_errors().len(), 1);
    }

    #[test]
    fn election_request_validates_type_and_date() {
        let json = serde_json::json!({
            "name": "Chiyoda Ward Assembly",
            "type": "CM",
            "area_description": "Chiyoda",
            "election_date": "2025-04-20"
        });
        let request: NewElectionRequest = serde_json::from_value(json).unwrap();
        assert!(request.validation_errors().is_empty());

        let request = NewElectionRequest { election_type: Some("XX".into()), ..request };
        assert_eq!(request.validation_errors().len(), 1);
    }

    #[test]
    fn serialized_request_uses_hub_field_names() {
        let request = NewElectionRequest {
            name: Some("n".into()),
            election_type: Some("HR".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "HR");
        assert!(json.get("notes").is_none());
    }
}
