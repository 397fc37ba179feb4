use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use political_ledger::hub::HubClient;
use political_ledger::models::journal::{Journal, JournalDetail, JournalEntry, JournalStatus};
use political_ledger::models::ledger::LedgerRef;
use political_ledger::sync::{SyncTarget, sync_target};

fn detail(org: Uuid, status: JournalStatus, lines: &[(&str, i64, i64)]) -> JournalDetail {
    let id = Uuid::new_v4();
    JournalDetail {
        journal: Journal {
            id,
            organization_id: Some(org),
            election_id: None,
            journal_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            description: "Party dues".to_string(),
            contact_id: None,
            classification: None,
            non_monetary_basis: None,
            notes: None,
            amount_political_grant: 0,
            amount_political_fund: 0,
            amount_public_subsidy: 0,
            is_receipt_hard_to_collect: false,
            receipt_hard_to_collect_reason: None,
            status,
            is_asset_acquisition: false,
            asset_type: None,
            submitted_by_user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        entries: lines
            .iter()
            .map(|(code, debit, credit)| JournalEntry {
                id: Uuid::new_v4(),
                journal_id: id,
                account_code: code.to_string(),
                sub_account_id: None,
                debit_amount: *debit,
                credit_amount: *credit,
            })
            .collect(),
        contact: None,
    }
}

#[tokio::test]
async fn test_sync_target_pushes_ledger_journals_and_change_log() {
    let server = MockServer::start().await;
    let org = Uuid::new_v4();
    let source_id = org.to_string();

    Mock::given(method("POST"))
        .and(path("/api/v1/sync/ledger"))
        .and(body_partial_json(json!({
            "ledger": {
                "ledger_source_id": source_id,
                "fiscal_year": 2024,
                "total_income": 12_000,
                "total_expense": 0,
                "journal_count": 2,
                "is_test": true
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {}, "action": "updated" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/journals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "created": 1, "updated": 0, "skipped": 0, "errors": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sync/change-log"))
        .and(body_partial_json(json!({ "ledger_source_id": source_id, "change_summary": "sync" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let hub = HubClient::new(server.uri().parse().unwrap(), "k", 5).unwrap();
    let target = SyncTarget {
        ledger: LedgerRef::Organization(org),
        hub_politician_id: None,
        hub_election_id: None,
    };
    let details = vec![
        detail(org, JournalStatus::Approved, &[("ASSET_CASH", 12_000, 0), ("REV_DUES", 0, 12_000)]),
        detail(org, JournalStatus::Draft, &[("ASSET_CASH", 500, 0), ("REV_DUES", 0, 0)]),
    ];

    let result = sync_target(&hub, &target, 2024, &details, true, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.created, 1);
    // The draft is counted as skipped locally.
    assert_eq!(result.skipped, 1);
}

#[tokio::test]
async fn test_sync_target_without_journals_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let hub = HubClient::new(server.uri().parse().unwrap(), "k", 5).unwrap();
    let target = SyncTarget {
        ledger: LedgerRef::Election(Uuid::new_v4()),
        hub_politician_id: Some("pol-1".to_string()),
        hub_election_id: None,
    };
    let result = sync_target(&hub, &target, 2024, &[], false, false).await.unwrap();
    assert!(result.is_none());
}
