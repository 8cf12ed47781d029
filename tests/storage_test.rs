//! Storage round-trip tests: application rows, dashboard entities, the
//! broker task cache, and stale-draft pruning.

use tempfile::TempDir;

use onboardd::broker::BrokerTask;
use onboardd::storage::Storage;

async fn make_storage(dir: &TempDir) -> Storage {
    Storage::new(dir.path()).await.expect("storage init failed")
}

#[tokio::test]
async fn test_application_create_update_get() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let row = storage
        .create_application(
            "app-1",
            "account_type",
            "INDIVIDUAL",
            "{}",
            Some("ad"),
            Some("adv-1"),
            None,
        )
        .await
        .expect("create");
    assert_eq!(row.status, "Draft");
    assert_eq!(row.step, "account_type");
    assert_eq!(row.master_account.as_deref(), Some("ad"));

    storage
        .update_application(
            "app-1",
            "Draft",
            "personal_info",
            "JOINT",
            r#"{"edited":true}"#,
            Some(10_000.0),
            Some("Jane Doe"),
            Some("ad"),
            Some("adv-1"),
            None,
        )
        .await
        .expect("update");

    let row = storage.get_application("app-1").await.unwrap().unwrap();
    assert_eq!(row.step, "personal_info");
    assert_eq!(row.customer_type, "JOINT");
    assert_eq!(row.estimated_deposit, Some(10_000.0));
    assert_eq!(row.signature.as_deref(), Some("Jane Doe"));

    let all = storage.list_applications().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_update_missing_application_fails() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let err = storage
        .update_application("nope", "Draft", "account_type", "INDIVIDUAL", "{}", None, None, None, None, None)
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_prune_only_removes_old_drafts() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    storage
        .create_application("fresh", "account_type", "INDIVIDUAL", "{}", None, None, None)
        .await
        .unwrap();
    storage
        .create_application("old-draft", "account_type", "INDIVIDUAL", "{}", None, None, None)
        .await
        .unwrap();
    storage
        .create_application("old-done", "success", "INDIVIDUAL", "{}", None, None, None)
        .await
        .unwrap();

    // Backdate two rows and complete one of them.
    sqlx::query("UPDATE applications SET updated_at = '2020-01-01T00:00:00+00:00' WHERE id IN ('old-draft', 'old-done')")
        .execute(&storage.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE applications SET status = 'Completed' WHERE id = 'old-done'")
        .execute(&storage.pool())
        .await
        .unwrap();

    // days = 0 disables pruning entirely.
    assert_eq!(storage.prune_stale_drafts(0).await.unwrap(), 0);

    let removed = storage.prune_stale_drafts(30).await.unwrap();
    assert_eq!(removed, 1);
    assert!(storage.get_application("old-draft").await.unwrap().is_none());
    assert!(storage.get_application("old-done").await.unwrap().is_some());
    assert!(storage.get_application("fresh").await.unwrap().is_some());
}

#[tokio::test]
async fn test_lead_and_advisor_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    storage
        .upsert_advisor("adv-1", "Ada Advisor", "ada@example.com", "ad")
        .await
        .unwrap();
    // Upsert again with a new name — no duplicate row.
    storage
        .upsert_advisor("adv-1", "Ada A.", "ada@example.com", "ad")
        .await
        .unwrap();
    let advisors = storage.list_advisors().await.unwrap();
    assert_eq!(advisors.len(), 1);
    assert_eq!(advisors[0].name, "Ada A.");

    let lead = storage
        .create_lead("Lee Lead", "lee@example.com", Some("+351 900 000 000"), Some("adv-1"))
        .await
        .unwrap();
    assert_eq!(lead.status, "new");

    storage.update_lead_status(&lead.id, "applying").await.unwrap();
    let lead = storage.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(lead.status, "applying");
}

#[tokio::test]
async fn test_account_and_proposal_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let account = storage.record_account("app-1", "U1234567").await.unwrap();
    assert_eq!(account.status, "open_pending");

    storage
        .update_account_status(&account.id, "open")
        .await
        .unwrap();
    let accounts = storage.list_accounts().await.unwrap();
    assert_eq!(accounts[0].status, "open");

    let proposal = storage
        .create_proposal(&account.id, "Balanced 60/40", "moderate", r#"{"equity":60}"#)
        .await
        .unwrap();
    assert_eq!(proposal.risk_profile, "moderate");
    assert_eq!(storage.list_proposals().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broker_task_cache_replaces_per_kind() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let first = vec![
        BrokerTask {
            task_id: "t-1".to_string(),
            form_number: Some(5001),
            description: "W8 form required".to_string(),
            required: true,
        },
        BrokerTask {
            task_id: "t-2".to_string(),
            form_number: None,
            description: "Proof of address".to_string(),
            required: false,
        },
    ];
    storage
        .replace_broker_tasks("acct-1", "pending", &first)
        .await
        .unwrap();
    assert_eq!(
        storage.list_broker_tasks("acct-1", "pending").await.unwrap().len(),
        2
    );

    // A later fetch replaces the list rather than appending.
    let second = vec![BrokerTask {
        task_id: "t-3".to_string(),
        form_number: None,
        description: "ID re-scan".to_string(),
        required: true,
    }];
    storage
        .replace_broker_tasks("acct-1", "pending", &second)
        .await
        .unwrap();
    let cached = storage.list_broker_tasks("acct-1", "pending").await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].task_id, "t-3");

    // Registration cache is independent.
    assert!(storage
        .list_broker_tasks("acct-1", "registration")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_document_upsert_by_form_number() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    storage
        .record_document("app-1", 5001, "w8.pdf", 100, "aaaa")
        .await
        .unwrap();
    // Re-uploading the same form replaces the earlier attachment.
    let row = storage
        .record_document("app-1", 5001, "w8-fixed.pdf", 120, "bbbb")
        .await
        .unwrap();
    assert_eq!(row.file_name, "w8-fixed.pdf");
    assert_eq!(row.status, "attached");

    let docs = storage.list_documents("app-1").await.unwrap();
    assert_eq!(docs.len(), 1);

    storage.mark_documents_submitted("app-1").await.unwrap();
    let docs = storage.list_documents("app-1").await.unwrap();
    assert_eq!(docs[0].status, "submitted");
    assert!(docs[0].submitted_at.is_some());
}
