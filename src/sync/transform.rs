//! Conversion of approved journals into the Hub's public journal shape.
//!
//! Nothing here touches the network or the database.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::hub::SyncJournalInput;
use crate::models::contact::Contact;
use crate::models::journal::{Journal, JournalDetail, JournalEntry, JournalStatus};

/// Published in place of a contact's name when the name is marked private.
pub const PRIVATE_CONTACT_NAME: &str = "非公開";

const UNKNOWN_ACCOUNT: &str = "UNKNOWN";
const REVENUE_PREFIX: &str = "REV_";
const EXPENSE_PREFIX: &str = "EXP_";

pub fn anonymized_contact_name(contact: Option<&Contact>) -> Option<String> {
    contact.map(|c| {
        if c.is_name_private {
            PRIVATE_CONTACT_NAME.to_string()
        } else {
            c.name.clone()
        }
    })
}

/// Journal amount as published: the sum of its debits.
pub fn journal_amount(entries: &[JournalEntry]) -> i64 {
    entries
        .iter()
        .fold(0i64, |sum, e| sum.saturating_add(e.debit_amount))
}

/// Account of the first debit line, falling back to the first line.
pub fn primary_account_code(entries: &[JournalEntry]) -> String {
    entries
        .iter()
        .find(|e| e.debit_amount > 0)
        .or_else(|| entries.first())
        .map(|e| e.account_code.clone())
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string())
}

/// Field order is part of the hash; do not reorder.
#[derive(Serialize)]
struct HashedContent<'a> {
    date: Option<chrono::NaiveDate>,
    desc: &'a str,
    amt: i64,
    code: &'a str,
    cls: Option<&'a str>,
    note: Option<&'a str>,
}

/// SHA-256 over the compact JSON of the fields the Hub uses to detect changes.
pub fn content_hash(journal: &Journal, amount: i64, account_code: &str) -> String {
    let content = HashedContent {
        date: journal.journal_date,
        desc: &journal.description,
        amt: amount,
        code: account_code,
        cls: journal.classification.as_deref(),
        note: journal.notes.as_deref(),
    };
    // Serializing a struct of plain fields cannot fail.
    let bytes = serde_json::to_vec(&content).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

pub fn should_sync(journal: &Journal) -> bool {
    journal.status == JournalStatus::Approved
        && (journal.organization_id.is_some() || journal.election_id.is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub total_income: i64,
    pub total_expense: i64,
    pub journal_count: usize,
}

/// Income is credited `REV_` accounts, expense is debited `EXP_` accounts.
pub fn ledger_totals(details: &[JournalDetail]) -> LedgerTotals {
    let mut totals = LedgerTotals {
        journal_count: details.len(),
        ..Default::default()
    };
    for entry in details.iter().flat_map(|d| &d.entries) {
        if entry.account_code.starts_with(REVENUE_PREFIX) {
            totals.total_income = totals.total_income.saturating_add(entry.credit_amount);
        } else if entry.account_code.starts_with(EXPENSE_PREFIX) {
            totals.total_expense = totals.total_expense.saturating_add(entry.debit_amount);
        }
    }
    totals
}

pub fn transform_journal(detail: &JournalDetail, ledger_source_id: &str, is_test: bool) -> SyncJournalInput {
    let journal = &detail.journal;
    let amount = journal_amount(&detail.entries);
    let account_code = primary_account_code(&detail.entries);
    let content_hash = content_hash(journal, amount, &account_code);

    SyncJournalInput {
        journal_source_id: journal.id.to_string(),
        ledger_source_id: ledger_source_id.to_string(),
        date: journal.journal_date,
        description: journal.description.clone(),
        amount,
        contact_name: anonymized_contact_name(detail.contact.as_ref()),
        contact_type: detail.contact.as_ref().map(|c| c.contact_type.clone()),
        account_code,
        classification: journal.classification.clone(),
        non_monetary_basis: journal.non_monetary_basis.clone(),
        note: journal.notes.clone(),
        public_expense_amount: Some(journal.amount_public_subsidy),
        content_hash,
        is_test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn journal() -> Journal {
        let now = Utc::now();
        Journal {
            id: Uuid::new_v4(),
            organization_id: Some(Uuid::new_v4()),
            election_id: None,
            journal_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            description: "Poster printing".into(),
            contact_id: None,
            classification: Some("campaign".into()),
            non_monetary_basis: None,
            notes: None,
            amount_political_grant: 0,
            amount_political_fund: 0,
            amount_public_subsidy: 3_000,
            is_receipt_hard_to_collect: false,
            receipt_hard_to_collect_reason: None,
            status: JournalStatus::Approved,
            is_asset_acquisition: false,
            asset_type: None,
            submitted_by_user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(code: &str, debit: i64, credit: i64) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            journal_id: Uuid::nil(),
            account_code: code.into(),
            sub_account_id: None,
            debit_amount: debit,
            credit_amount: credit,
        }
    }

    fn contact(private: bool) -> Contact {
        let now = Utc::now();
        Contact {
            id: Uuid::new_v4(),
            owner_user_id: Uuid::new_v4(),
            contact_type: "person".into(),
            name: "Taro Yamada".into(),
            address: None,
            occupation: None,
            is_name_private: private,
            is_address_private: false,
            is_occupation_private: false,
            privacy_reason_type: None,
            privacy_reason_other: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn private_names_are_masked() {
        assert_eq!(anonymized_contact_name(None), None);
        assert_eq!(anonymized_contact_name(Some(&contact(false))).as_deref(), Some("Taro Yamada"));
        assert_eq!(
            anonymized_contact_name(Some(&contact(true))).as_deref(),
            Some(PRIVATE_CONTACT_NAME)
        );
    }

    #[test]
    fn amount_and_account_come_from_debits() {
        let entries = vec![entry("ASSET_CASH", 0, 12_000), entry("EXP_PRINTING", 12_000, 0)];
        assert_eq!(journal_amount(&entries), 12_000);
        assert_eq!(primary_account_code(&entries), "EXP_PRINTING");
        assert_eq!(primary_account_code(&[entry("REV_DONATION", 0, 0)]), "REV_DONATION");
        assert_eq!(primary_account_code(&[]), "UNKNOWN");
    }

    #[test]
    fn content_hash_is_stable_and_sensitive() {
        let j = journal();
        let first = content_hash(&j, 100, "EXP_PRINTING");
        assert_eq!(first.len(), 64);
        assert_eq!(first, content_hash(&j, 100, "EXP_PRINTING"));
        assert_ne!(first, content_hash(&j, 101, "EXP_PRINTING"));
    }

    #[test]
    fn content_hash_matches_compact_json_digest() {
        let mut j = journal();
        j.classification = None;
        let expected = hex::encode(Sha256::digest(
            br#"{"date":"2024-06-01","desc":"Poster printing","amt":5,"code":"EXP_X","cls":null,"note":null}"#,
        ));
        assert_eq!(content_hash(&j, 5, "EXP_X"), expected);
    }

    #[test]
    fn drafts_are_not_synced() {
        let mut j = journal();
        assert!(should_sync(&j));
        j.status = JournalStatus::Draft;
        assert!(!should_sync(&j));
    }

    #[test]
    fn totals_split_revenue_and_expense() {
        let details = vec![
            JournalDetail {
                journal: journal(),
                entries: vec![entry("ASSET_CASH", 50_000, 0), entry("REV_DONATION", 0, 50_000)],
                contact: None,
            },
            JournalDetail {
                journal: journal(),
                entries: vec![entry("EXP_RENT", 20_000, 0), entry("ASSET_CASH", 0, 20_000)],
                contact: None,
            },
        ];
        assert_eq!(
            ledger_totals(&details),
            LedgerTotals { total_income: 50_000, total_expense: 20_000, journal_count: 2 }
        );
    }

    #[test]
    fn transform_carries_anonymized_contact() {
        let detail = JournalDetail {
            journal: journal(),
            entries: vec![entry("EXP_PRINTING", 800, 0), entry("ASSET_CASH", 0, 800)],
            contact: Some(contact(true)),
        };
        let input = transform_journal(&detail, "ledger-1", true);
        assert_eq!(input.amount, 800);
        assert_eq!(input.contact_name.as_deref(), Some(PRIVATE_CONTACT_NAME));
        assert_eq!(input.contact_type.as_deref(), Some("person"));
        assert_eq!(input.public_expense_amount, Some(3_000));
        assert_eq!(input.ledger_source_id, "ledger-1");
        assert!(input.is_test);
    }
}
