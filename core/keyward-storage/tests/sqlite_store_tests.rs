mod common;

use keyward_storage::{KeyStore, SqliteKeyStore};
use keyward_types::{HwidLimit, NewLicenseKey};
use std::sync::Arc;

#[tokio::test]
async fn create_then_get() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::create_then_get(&store).await;
}

#[tokio::test]
async fn get_missing_is_none() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::get_missing_is_none(&store).await;
}

#[tokio::test]
async fn duplicate_create_fails() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::duplicate_create_fails(&store).await;
}

#[tokio::test]
async fn delete_removes_record() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::delete_removes_record(&store).await;
}

#[tokio::test]
async fn delete_missing_is_not_found() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::delete_missing_is_not_found(&store).await;
}

#[tokio::test]
async fn bind_if_unbound_binds_once() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::bind_if_unbound_binds_once(&store).await;
}

#[tokio::test]
async fn bind_missing_is_not_found() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::bind_missing_is_not_found(&store).await;
}

#[tokio::test]
async fn empty_binding_is_rebindable() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::empty_binding_is_rebindable(&store).await;
}

#[tokio::test]
async fn reset_reopens_binding() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::reset_reopens_binding(&store).await;
}

#[tokio::test]
async fn list_is_ordered_by_key() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::list_is_ordered_by_key(&store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_binds_have_one_winner() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::concurrent_binds_have_one_winner(Arc::new(store), 32).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_have_one_winner() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    common::concurrent_creates_have_one_winner(Arc::new(store), 32).await;
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.db");
    {
        let store = SqliteKeyStore::open(&path).unwrap();
        store
            .create(
                NewLicenseKey::new("PERSIST")
                    .with_expiry("2099-12-31")
                    .with_hwid_limit(HwidLimit::Unlimited),
            )
            .await
            .unwrap();
    }

    let reopened = SqliteKeyStore::open(&path).unwrap();
    let record = reopened.get("PERSIST").await.unwrap().unwrap();
    assert_eq!(record.expiry.as_str(), "2099-12-31");
    assert!(record.hwid_limit.is_unlimited());
    assert_eq!(reopened.backend_name(), "sqlite");
}

#[tokio::test]
async fn malformed_expiry_text_is_stored_verbatim() {
    let store = SqliteKeyStore::open_in_memory().unwrap();
    store
        .create(NewLicenseKey::new("ODD").with_expiry("next tuesday"))
        .await
        .unwrap();
    let record = store.get("ODD").await.unwrap().unwrap();
    assert_eq!(record.expiry.as_str(), "next tuesday");
}
