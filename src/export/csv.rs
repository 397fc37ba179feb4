//! CSV reports feeding the annual income and expenditure statement.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::models::journal::{JournalDetail, JournalEntry};
use crate::models::ledger::LedgerRef;

/// Prepended so spreadsheet tools detect UTF-8.
pub const UTF8_BOM: &str = "\u{feff}";

const REVENUE_PREFIX: &str = "REV_";
const EXPENSE_PREFIX: &str = "EXP_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Expense,
    Revenue,
    Summary,
    Assets,
}

impl ReportKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ReportKind::Expense => "expenses",
            ReportKind::Revenue => "revenues",
            ReportKind::Summary => "account-summary",
            ReportKind::Assets => "assets",
        }
    }
}

/// Quote a field if it contains a comma, quote or newline.
pub fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y/%m/%d").to_string()).unwrap_or_default()
}

fn render(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.iter().map(|h| escape(h)).collect::<Vec<_>>().join(","));
    for row in rows {
        lines.push(row.iter().map(|f| escape(f)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

fn first_with_prefix<'a>(entries: &'a [JournalEntry], prefix: &str) -> Option<&'a JournalEntry> {
    entries.iter().find(|e| e.account_code.starts_with(prefix))
}

/// One row per journal with an expense line. The subsidy column holds the
/// political grant for organizations and the public subsidy for elections.
pub fn expense_report(
    details: &[JournalDetail],
    sub_account_names: &HashMap<Uuid, String>,
    ledger: LedgerRef,
) -> String {
    let subsidy_header = match ledger {
        LedgerRef::Organization(_) => "Political grant applied",
        LedgerRef::Election(_) => "Public subsidy",
    };
    let headers = [
        "Date",
        "Purpose",
        "Amount",
        "Payee name",
        "Payee address",
        "Account",
        "Sub-account",
        subsidy_header,
        "No receipt",
        "Notes",
    ];

    let rows = details
        .iter()
        .filter_map(|d| {
            let entry = first_with_prefix(&d.entries, EXPENSE_PREFIX)?;
            let journal = &d.journal;
            let subsidy = match ledger {
                LedgerRef::Organization(_) => journal.amount_political_grant,
                LedgerRef::Election(_) => journal.amount_public_subsidy,
            };
            Some(vec![
                format_date(journal.journal_date),
                journal.description.clone(),
                entry.debit_amount.to_string(),
                d.contact.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
                d.contact.as_ref().and_then(|c| c.address.clone()).unwrap_or_default(),
                entry.account_code.clone(),
                entry
                    .sub_account_id
                    .and_then(|id| sub_account_names.get(&id).cloned())
                    .unwrap_or_default(),
                subsidy.to_string(),
                if journal.is_receipt_hard_to_collect { "yes" } else { "" }.to_string(),
                journal.notes.clone().unwrap_or_default(),
            ])
        })
        .collect();
    render(&headers, rows)
}

/// One row per journal with a revenue line.
pub fn revenue_report(details: &[JournalDetail]) -> String {
    let headers = [
        "Date",
        "Description",
        "Amount",
        "Donor name",
        "Donor type",
        "Donor address",
        "Donor occupation",
        "Account",
        "Notes",
    ];
    let rows = details
        .iter()
        .filter_map(|d| {
            let entry = first_with_prefix(&d.entries, REVENUE_PREFIX)?;
            let contact = d.contact.as_ref();
            let donor_type = match contact.map(|c| c.contact_type.as_str()) {
                Some("corporation") => "corporation",
                _ => "person",
            };
            Some(vec![
                format_date(d.journal.journal_date),
                d.journal.description.clone(),
                entry.credit_amount.to_string(),
                contact.map(|c| c.name.clone()).unwrap_or_default(),
                donor_type.to_string(),
                contact.and_then(|c| c.address.clone()).unwrap_or_default(),
                contact.and_then(|c| c.occupation.clone()).unwrap_or_default(),
                entry.account_code.clone(),
                d.journal.notes.clone().unwrap_or_default(),
            ])
        })
        .collect();
    render(&headers, rows)
}

/// Count and total per revenue and expense account, revenues first.
pub fn summary_report(details: &[JournalDetail]) -> String {
    let headers = ["Category", "Account", "Count", "Total"];
    let mut totals: BTreeMap<(&'static str, &str), (u64, i64)> = BTreeMap::new();
    for entry in details.iter().flat_map(|d| &d.entries) {
        let category = if entry.account_code.starts_with(REVENUE_PREFIX) {
            "revenue"
        } else if entry.account_code.starts_with(EXPENSE_PREFIX) {
            "expense"
        } else {
            continue;
        };
        let amount = if entry.debit_amount > 0 { entry.debit_amount } else { entry.credit_amount };
        let slot = totals.entry((category, entry.account_code.as_str())).or_default();
        slot.0 += 1;
        slot.1 = slot.1.saturating_add(amount);
    }

    let mut rows: Vec<(&str, &str, u64, i64)> =
        totals.into_iter().map(|((cat, code), (n, sum))| (cat, code, n, sum)).collect();
    rows.sort_by_key(|(cat, code, _, _)| (*cat != "revenue", *code));
    render(
        &headers,
        rows.into_iter()
            .map(|(cat, code, n, sum)| vec![cat.to_string(), code.to_string(), n.to_string(), sum.to_string()])
            .collect(),
    )
}

/// Journals flagged as asset acquisitions, valued at their debit total.
pub fn assets_report(details: &[JournalDetail]) -> String {
    let headers = [
        "Acquired on",
        "Asset type",
        "Description",
        "Seller name",
        "Seller address",
        "Acquisition cost",
    ];
    let rows = details
        .iter()
        .filter(|d| d.journal.is_asset_acquisition)
        .map(|d| {
            let amount = d
                .entries
                .iter()
                .fold(0i64, |sum, e| sum.saturating_add(e.debit_amount));
            vec![
                format_date(d.journal.journal_date),
                d.journal.asset_type.clone().unwrap_or_default(),
                d.journal.description.clone(),
                d.contact.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
                d.contact.as_ref().and_then(|c| c.address.clone()).unwrap_or_default(),
                amount.to_string(),
            ]
        })
        .collect();
    render(&headers, rows)
}

pub fn report(
    kind: ReportKind,
    details: &[JournalDetail],
    sub_account_names: &HashMap<Uuid, String>,
    ledger: LedgerRef,
) -> String {
    match kind {
        ReportKind::Expense => expense_report(details, sub_account_names, ledger),
        ReportKind::Revenue => revenue_report(details),
        ReportKind::Summary => summary_report(details),
        ReportKind::Assets => assets_report(details),
    }
}
