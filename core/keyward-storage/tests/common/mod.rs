//! Behaviour every key store engine must share.

#![allow(dead_code)]

use keyward_storage::{BindOutcome, KeyStore, StorageError};
use keyward_types::{HwidLimit, NewLicenseKey};
use std::collections::HashSet;
use std::sync::Arc;

pub async fn create_then_get<S: KeyStore>(store: &S) {
    let created = store
        .create(NewLicenseKey::new("ABC123").with_expiry("2020-01-01T00:00:00"))
        .await
        .unwrap();
    assert_eq!(created.key, "ABC123");
    assert_eq!(created.bound_hwid, None);

    let loaded = store.get("ABC123").await.unwrap().unwrap();
    assert_eq!(loaded.key, "ABC123");
    assert_eq!(loaded.expiry.as_str(), "2020-01-01T00:00:00");
    assert_eq!(loaded.hwid_limit, HwidLimit::SINGLE);
    assert_eq!(loaded.bound_hwid, None);
    assert_eq!(
        loaded.created_at.timestamp_millis(),
        created.created_at.timestamp_millis()
    );
}

pub async fn get_missing_is_none<S: KeyStore>(store: &S) {
    assert!(store.get("MISSING").await.unwrap().is_none());
}

pub async fn duplicate_create_fails<S: KeyStore>(store: &S) {
    store.create(NewLicenseKey::new("DUP")).await.unwrap();
    let err = store
        .create(NewLicenseKey::new("DUP").with_hwid_limit(HwidLimit::Unlimited))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists(ref k) if k == "DUP"));

    // The original record is untouched.
    let kept = store.get("DUP").await.unwrap().unwrap();
    assert_eq!(kept.hwid_limit, HwidLimit::SINGLE);
}

pub async fn delete_removes_record<S: KeyStore>(store: &S) {
    store.create(NewLicenseKey::new("GONE")).await.unwrap();
    store.delete("GONE").await.unwrap();
    assert!(store.get("GONE").await.unwrap().is_none());

    let err = store.delete("GONE").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

pub async fn delete_missing_is_not_found<S: KeyStore>(store: &S) {
    let err = store.delete("MISSING").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(ref k) if k == "MISSING"));
    assert!(!err.is_unavailable());
}

pub async fn bind_if_unbound_binds_once<S: KeyStore>(store: &S) {
    store.create(NewLicenseKey::new("FREE1")).await.unwrap();

    assert_eq!(
        store.bind_if_unbound("FREE1", "H1").await.unwrap(),
        BindOutcome::BoundNow
    );
    assert_eq!(
        store.bind_if_unbound("FREE1", "H2").await.unwrap(),
        BindOutcome::AlreadyBound("H1".into())
    );
    assert_eq!(
        store.bind_if_unbound("FREE1", "H1").await.unwrap(),
        BindOutcome::AlreadyBound("H1".into())
    );
    let record = store.get("FREE1").await.unwrap().unwrap();
    assert_eq!(record.bound_hwid.as_deref(), Some("H1"));
}

pub async fn bind_missing_is_not_found<S: KeyStore>(store: &S) {
    let err = store.bind_if_unbound("MISSING", "H1").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

pub async fn empty_binding_is_rebindable<S: KeyStore>(store: &S) {
    store.create(NewLicenseKey::new("EMPTY")).await.unwrap();
    assert_eq!(
        store.bind_if_unbound("EMPTY", "").await.unwrap(),
        BindOutcome::BoundNow
    );
    assert_eq!(
        store.bind_if_unbound("EMPTY", "H9").await.unwrap(),
        BindOutcome::BoundNow
    );
    let record = store.get("EMPTY").await.unwrap().unwrap();
    assert_eq!(record.binding(), Some("H9"));
}

pub async fn reset_reopens_binding<S: KeyStore>(store: &S) {
    store.create(NewLicenseKey::new("RESET")).await.unwrap();
    store.bind_if_unbound("RESET", "H1").await.unwrap();

    store.reset_binding("RESET").await.unwrap();
    assert_eq!(store.get("RESET").await.unwrap().unwrap().bound_hwid, None);

    assert_eq!(
        store.bind_if_unbound("RESET", "H2").await.unwrap(),
        BindOutcome::BoundNow
    );

    let err = store.reset_binding("MISSING").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

pub async fn list_is_ordered_by_key<S: KeyStore>(store: &S) {
    for key in ["charlie", "alpha", "bravo"] {
        store.create(NewLicenseKey::new(key)).await.unwrap();
    }
    store.bind_if_unbound("bravo", "HB").await.unwrap();

    let listed = store.list().await.unwrap();
    let keys: Vec<_> = listed.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["alpha", "bravo", "charlie"]);
    assert_eq!(listed[1].bound_hwid.as_deref(), Some("HB"));
}

/// Races `contenders` first-use binds with distinct HWIDs on one key.
pub async fn concurrent_binds_have_one_winner<S: KeyStore + 'static>(
    store: Arc<S>,
    contenders: usize,
) {
    store.create(NewLicenseKey::new("RACE")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..contenders {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let hwid = format!("HWID-{i}");
            let outcome = store.bind_if_unbound("RACE", &hwid).await.unwrap();
            (hwid, outcome)
        }));
    }

    let mut winners = Vec::new();
    let mut reported = HashSet::new();
    for handle in handles {
        let (hwid, outcome) = handle.await.unwrap();
        match outcome {
            BindOutcome::BoundNow => winners.push(hwid),
            BindOutcome::AlreadyBound(existing) => {
                reported.insert(existing);
            }
        }
    }

    assert_eq!(winners.len(), 1, "exactly one bind must win");
    let stored = store.get("RACE").await.unwrap().unwrap();
    assert_eq!(stored.bound_hwid.as_deref(), Some(winners[0].as_str()));
    assert!(reported.iter().all(|h| h == &winners[0]));
}

/// Races `contenders` creates of one key.
pub async fn concurrent_creates_have_one_winner<S: KeyStore + 'static>(
    store: Arc<S>,
    contenders: usize,
) {
    let mut handles = Vec::new();
    for _ in 0..contenders {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create(NewLicenseKey::new("ONCE")).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StorageError::AlreadyExists(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.list().await.unwrap().len(), 1);
}
