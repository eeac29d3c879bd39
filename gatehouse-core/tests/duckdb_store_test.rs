//! DuckDB credential store tests
//!
//! Exercise the persistent store against real database files in a temp dir.
//!
//! Run with: cargo test --test duckdb_store_test

use std::sync::Arc;

use secrecy::SecretString;
use tempfile::TempDir;

use gatehouse_core::adapters::duckdb::DuckDbCredentialStore;
use gatehouse_core::domain::Argon2Params;
use gatehouse_core::ports::CredentialStore;
use gatehouse_core::services::PasswordHasher;
use gatehouse_core::{ErrorKind, Role, UserCredential, UserId};

fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(Argon2Params {
        time_cost: 1,
        memory_cost: 1024,
        parallelism: 1,
        hash_len: 32,
    })
    .unwrap()
}

fn open(temp_dir: &TempDir) -> DuckDbCredentialStore {
    let store = DuckDbCredentialStore::new(&temp_dir.path().join("gatehouse.duckdb"), test_hasher())
        .unwrap();
    store.ensure_schema().unwrap();
    store
}

fn id(s: &str) -> UserId {
    UserId::parse(s).unwrap()
}

fn credential(email: &str, role: &str, password: &str) -> UserCredential {
    UserCredential::parse(email, role, SecretString::from(password)).unwrap()
}

#[tokio::test]
async fn test_create_and_fetch_user() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);

    store
        .create_user(credential("a@x.com", "customer", "p1").with_phone("555-0100"))
        .await
        .unwrap();

    let stored = store.get_credential(&id("a@x.com")).await.unwrap();
    assert_eq!(stored.user.role, Role::Customer);
    assert!(stored.password_hash.starts_with("$argon2id$"));

    assert!(store
        .verify_secret(&SecretString::from("p1"), &stored.password_hash)
        .await
        .unwrap());
    assert!(!store
        .verify_secret(&SecretString::from("p2"), &stored.password_hash)
        .await
        .unwrap());

    let detail = store.get_detail(&id("a@x.com")).await.unwrap();
    assert_eq!(detail.phone.as_deref(), Some("555-0100"));
}

#[tokio::test]
async fn test_duplicate_identity_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);

    store.create_user(credential("a@x.com", "customer", "p1")).await.unwrap();
    let err = store
        .create_user(credential("a@x.com", "admin", "p2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let stored = store.get_credential(&id("a@x.com")).await.unwrap();
    assert_eq!(stored.user.role, Role::Customer);
}

#[tokio::test]
async fn test_unknown_user_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);

    let err = store.get_credential(&id("ghost@x.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.get_detail(&id("ghost@x.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.delete_user(&id("ghost@x.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_soft_delete_hides_user_but_keeps_row() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("gatehouse.duckdb");

    {
        let store = open(&temp_dir);
        store.create_user(credential("u@x.com", "customer", "pw")).await.unwrap();
        store.delete_user(&id("u@x.com")).await.unwrap();

        let err = store.get_credential(&id("u@x.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store
            .create_user(credential("u@x.com", "customer", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    // Inspect the raw row once the store has released the file
    let conn = duckdb::Connection::open(&db_path).unwrap();
    let (deleted, has_deleted_at): (bool, bool) = conn
        .query_row(
            "SELECT deleted, deleted_at IS NOT NULL FROM sys_users WHERE user_id = ?",
            ["u@x.com"],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(deleted);
    assert!(has_deleted_at);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = open(&temp_dir);
        store.create_user(credential("root@x.com", "admin", "rootpw")).await.unwrap();
    }

    // Reopening runs migrations again, which must be a no-op
    let store = open(&temp_dir);
    let stored = store.get_credential(&id("root@x.com")).await.unwrap();
    assert_eq!(stored.user.role, Role::Admin);
    assert!(store
        .verify_secret(&SecretString::from("rootpw"), &stored.password_hash)
        .await
        .unwrap());

    let migrations = store.run_migrations().unwrap();
    assert!(migrations.applied.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_has_one_winner() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(open(&temp_dir));

    let mut handles = Vec::new();
    for i in 0..6 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create_user(credential("race@x.com", "customer", &format!("pw{i}")))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists, "{e}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_in_memory_database() {
    let store = DuckDbCredentialStore::open_in_memory(test_hasher()).unwrap();
    store.ensure_schema().unwrap();
    assert!(store.db_path().is_none());

    store.create_user(credential("a@x.com", "customer", "p1")).await.unwrap();
    store.delete_user(&id("a@x.com")).await.unwrap();
    let err = store.get_detail(&id("a@x.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
