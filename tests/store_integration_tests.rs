//! Integration Tests for the Store
//!
//! Exercises the public API end to end: round-trips, namespacing,
//! expiration, encryption, caching, notifications and the local file scope.

use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use json_store::crypto::{AesGcmCipher, Cipher, KdfParams};
use json_store::error::{CipherError, DecodeError};
use json_store::{
    JsonStore, MemoryStorage, StorageBackend, StorageType, StoreError, StoreOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::tempdir;

// == Helper Functions ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
}

fn test_user() -> User {
    User {
        id: "1".to_string(),
        name: "Alice".to_string(),
    }
}

fn fast_cipher() -> AesGcmCipher {
    AesGcmCipher::with_kdf_params(KdfParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
}

fn create_store(options: StoreOptions, backend: &Arc<MemoryStorage>) -> JsonStore {
    JsonStore::with_backend(options, backend.clone())
        .unwrap()
        .with_cipher(fast_cipher())
}

type EventLog = Arc<Mutex<Vec<(String, Option<Value>)>>>;

fn record_changes(store: &mut JsonStore) -> EventLog {
    let log: EventLog = Arc::default();
    let sink = log.clone();
    store.on_change(move |key, value| {
        sink.lock().unwrap().push((key.to_string(), value.cloned()));
    });
    log
}

// == Round Trip ==

#[test]
fn test_store_and_retrieve_item() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);

    store.set_item("user", &test_user(), None).unwrap();
    assert_eq!(store.get_item::<User>("user").unwrap(), Some(test_user()));
}

#[test]
fn test_roundtrip_every_configuration() {
    for cache in [false, true] {
        for encrypt in [false, true] {
            for namespace in [None, Some("app")] {
                let mut options = StoreOptions::new().with_cache(cache);
                if encrypt {
                    options = options.with_encryption("test-secret");
                }
                if let Some(ns) = namespace {
                    options = options.with_namespace(ns);
                }
                let backend = Arc::new(MemoryStorage::new());
                let mut store = create_store(options, &backend);

                store.set_item("user", &test_user(), None).unwrap();
                assert_eq!(
                    store.get_item::<User>("user").unwrap(),
                    Some(test_user()),
                    "cache={cache} encrypt={encrypt} namespace={namespace:?}"
                );
            }
        }
    }
}

// == Remove and Clear ==

#[test]
fn test_remove_item() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);

    store.set_item("user", &test_user(), None).unwrap();
    store.remove_item("user").unwrap();
    assert_eq!(store.get_item::<User>("user").unwrap(), None);
}

#[test]
fn test_remove_missing_key_is_noop() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_cache(true), &backend);
    store.set_item("kept", &1, None).unwrap();

    store.remove_item("never-written").unwrap();

    assert_eq!(backend.keys(), vec!["kept"]);
    assert_eq!(store.get_item::<i32>("kept").unwrap(), Some(1));
}

#[test]
fn test_clear_all_items() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_cache(true), &backend);

    store.set_item("a", &test_user(), None).unwrap();
    store.set_item("b", &test_user(), None).unwrap();
    store.clear().unwrap();

    assert_eq!(store.get_item::<User>("a").unwrap(), None);
    assert_eq!(store.get_item::<User>("b").unwrap(), None);
    assert!(backend.is_empty());
}

// == Namespacing ==

#[test]
fn test_namespaces_are_isolated() {
    let backend = Arc::new(MemoryStorage::new());
    let mut first = create_store(StoreOptions::new().with_namespace("first"), &backend);
    let mut second = create_store(StoreOptions::new().with_namespace("second"), &backend);

    first.set_item("user", &"from first", None).unwrap();
    second.set_item("user", &"from second", None).unwrap();

    assert_eq!(
        first.get_item::<String>("user").unwrap().as_deref(),
        Some("from first")
    );
    assert_eq!(
        second.get_item::<String>("user").unwrap().as_deref(),
        Some("from second")
    );

    first.clear().unwrap();
    assert_eq!(first.get_item::<String>("user").unwrap(), None);
    assert_eq!(
        second.get_item::<String>("user").unwrap().as_deref(),
        Some("from second")
    );
    assert_eq!(backend.keys(), vec!["second:user"]);
}

#[test]
fn test_clear_without_namespace_removes_everything() {
    let backend = Arc::new(MemoryStorage::new());
    backend.set("foreign", "plain text").unwrap();
    let mut store = create_store(StoreOptions::new(), &backend);
    store.set_item("mine", &1, None).unwrap();

    store.clear().unwrap();
    assert!(backend.is_empty());
}

// == Expiration ==

#[test]
fn test_expired_item_returns_none_and_is_evicted() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);

    store.set_item("user", &test_user(), Some(10)).unwrap();
    sleep(Duration::from_millis(30));

    assert_eq!(store.get_item::<User>("user").unwrap(), None);
    assert!(backend.get("user").is_none());
}

#[test]
fn test_default_ttl_applies() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(
        StoreOptions::new().with_default_ttl_ms(10).with_cache(true),
        &backend,
    );

    store.set_item("user", &test_user(), None).unwrap();
    sleep(Duration::from_millis(30));

    assert_eq!(store.get_item::<User>("user").unwrap(), None);
    assert!(backend.is_empty());
}

#[test]
fn test_manually_expired_record() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_default_ttl_ms(10_000), &backend);
    store.set_item("user", &test_user(), None).unwrap();

    let mut record: Value = serde_json::from_str(&backend.get("user").unwrap()).unwrap();
    record["expiresAt"] = json!(chrono::Utc::now().timestamp_millis() - 1_000);
    backend.set("user", &record.to_string()).unwrap();

    assert_eq!(store.get_item::<User>("user").unwrap(), None);
}

#[test]
fn test_item_without_ttl_never_expires() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);
    store.set_item("user", &test_user(), None).unwrap();

    let record: Value = serde_json::from_str(&backend.get("user").unwrap()).unwrap();
    assert!(record.get("expiresAt").is_none());
    assert_eq!(store.purge_expired().unwrap(), 0);
}

// == Encryption ==

#[test]
fn test_encrypt_and_decrypt() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_encryption("test-secret"), &backend);

    store.set_item("user", &test_user(), None).unwrap();

    let raw = backend.get("user").unwrap();
    assert!(serde_json::from_str::<Value>(&raw).is_err());
    assert_eq!(store.get_item::<User>("user").unwrap(), Some(test_user()));
}

#[test]
fn test_wrong_key_is_retrieval_error() {
    let backend = Arc::new(MemoryStorage::new());
    let mut writer = create_store(StoreOptions::new().with_encryption("right"), &backend);
    writer.set_item("user", &test_user(), None).unwrap();

    let mut reader = create_store(StoreOptions::new().with_encryption("wrong"), &backend);
    let result = reader.get_item::<User>("user");

    assert!(matches!(
        result,
        Err(StoreError::Retrieval {
            source: DecodeError::Cipher(CipherError::Decrypt),
            ..
        })
    ));
    // Unreadable records stay in place
    assert!(backend.get("user").is_some());
}

#[test]
fn test_tampered_record_is_retrieval_error() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_encryption("test-secret"), &backend);
    store.set_item("user", &test_user(), None).unwrap();

    let token = backend.get("user").unwrap();
    let flipped = if token.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{flipped}{}", &token[1..]);
    backend.set("user", &tampered).unwrap();

    assert!(matches!(
        store.get_item::<User>("user"),
        Err(StoreError::Retrieval { .. })
    ));
}

#[test]
fn test_custom_cipher_is_used() {
    #[derive(Debug)]
    struct Reversing;

    impl Cipher for Reversing {
        fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, CipherError> {
            Ok(format!("{key}|{}", plaintext.chars().rev().collect::<String>()))
        }

        fn decrypt(&self, token: &str, key: &str) -> Result<String, CipherError> {
            let body = token
                .strip_prefix(&format!("{key}|"))
                .ok_or(CipherError::Decrypt)?;
            Ok(body.chars().rev().collect())
        }
    }

    let backend = Arc::new(MemoryStorage::new());
    let mut store = JsonStore::with_backend(StoreOptions::new().with_encryption("k"), backend.clone())
        .unwrap()
        .with_cipher(Reversing);

    store.set_item("n", &7, None).unwrap();
    assert_eq!(backend.get("n").as_deref(), Some(r#"k|}7:"atad"{"#));
    assert_eq!(store.get_item::<i32>("n").unwrap(), Some(7));
}

// == Cache ==

#[test]
fn test_cache_reflects_latest_write() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_cache(true), &backend);

    store.set_item("k", &"v1", None).unwrap();
    store.set_item("k", &"v2", None).unwrap();

    assert_eq!(store.get_item::<String>("k").unwrap().as_deref(), Some("v2"));
    let stats = store.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.total_entries, 1);
}

#[test]
fn test_cache_fills_on_read() {
    let backend = Arc::new(MemoryStorage::new());
    backend.set("k", r#"{"data":"stored"}"#).unwrap();
    let mut store = create_store(StoreOptions::new().with_cache(true), &backend);

    assert_eq!(store.get_item::<String>("k").unwrap().as_deref(), Some("stored"));
    assert_eq!(store.get_item::<String>("k").unwrap().as_deref(), Some("stored"));

    let stats = store.cache_stats().unwrap();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

// == Change Notification ==

#[test]
fn test_change_notifications() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new().with_namespace("app"), &backend);
    let log = record_changes(&mut store);

    store.set_item("user", &test_user(), None).unwrap();
    store.remove_item("user").unwrap();
    store.set_item("a", &1, None).unwrap();
    store.set_item("b", &2, None).unwrap();
    log.lock().unwrap().clear();

    store.clear().unwrap();

    let events = log.lock().unwrap();
    assert_eq!(
        *events,
        vec![("a".to_string(), None), ("b".to_string(), None)]
    );
}

#[test]
fn test_set_and_remove_notify_once() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);
    let log = record_changes(&mut store);

    store.set_item("user", &test_user(), None).unwrap();
    store.remove_item("user").unwrap();

    let events = log.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            (
                "user".to_string(),
                Some(serde_json::to_value(test_user()).unwrap())
            ),
            ("user".to_string(), None),
        ]
    );
}

#[test]
fn test_panicking_listener_does_not_abort_write() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = create_store(StoreOptions::new(), &backend);
    store.on_change(|_, _| panic!("observer failure"));
    let log = record_changes(&mut store);

    store.set_item("user", &test_user(), None).unwrap();

    assert!(backend.get("user").is_some());
    assert_eq!(log.lock().unwrap().len(), 1);
}

// == Construction ==

#[test]
fn test_encrypt_without_key_fails_before_storage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never-created.json");
    let options = StoreOptions {
        encrypt: Some(true),
        ..StoreOptions::new().with_storage_path(&path)
    };

    let result = JsonStore::new(options);
    assert!(matches!(result, Err(StoreError::Configuration(_))));
    assert!(!path.exists());
}

#[test]
fn test_unreadable_local_file_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "[not a map]").unwrap();

    let result = JsonStore::new(StoreOptions::new().with_storage_path(&path));
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

// == Storage Scopes ==

#[test]
fn test_local_scope_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("local.json");
    let options = || {
        StoreOptions::new()
            .with_storage_type(StorageType::Local)
            .with_storage_path(&path)
            .with_namespace("app")
    };

    let mut store = JsonStore::new(options()).unwrap();
    store.set_item("user", &test_user(), None).unwrap();
    drop(store);

    let mut reopened = JsonStore::new(options()).unwrap();
    assert_eq!(reopened.get_item::<User>("user").unwrap(), Some(test_user()));
    assert_eq!(reopened.keys(), vec!["user"]);
}

#[test]
fn test_local_stores_on_one_file_keep_namespaces() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("local.json");
    let options = |namespace: &str| {
        StoreOptions::new()
            .with_storage_path(&path)
            .with_namespace(namespace)
    };

    let mut first = JsonStore::new(options("a")).unwrap();
    let mut second = JsonStore::new(options("b")).unwrap();
    first.set_item("x", &1, None).unwrap();
    second.set_item("y", &2, None).unwrap();
    second.clear().unwrap();

    assert_eq!(first.get_item::<i32>("x").unwrap(), Some(1));
    assert_eq!(second.get_item::<i32>("y").unwrap(), None);
    drop(first);
    drop(second);

    let mut reopened = JsonStore::new(options("a")).unwrap();
    assert_eq!(reopened.get_item::<i32>("x").unwrap(), Some(1));
    assert_eq!(reopened.raw().keys(), vec!["a:x"]);
}

#[test]
fn test_local_stores_on_one_file_see_each_others_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("local.json");
    let options = || {
        StoreOptions::new()
            .with_storage_path(&path)
            .with_namespace("shared")
    };

    let mut writer = JsonStore::new(options()).unwrap();
    let mut reader = JsonStore::new(options()).unwrap();
    writer.set_item("user", &test_user(), None).unwrap();
    assert_eq!(reader.get_item::<User>("user").unwrap(), Some(test_user()));

    reader.remove_item("user").unwrap();
    assert_eq!(writer.get_item::<User>("user").unwrap(), None);
}

#[test]
fn test_session_stores_share_one_scope() {
    // The session scope is process-wide, so namespaces keep this test apart from others
    let options = |namespace: &str| {
        StoreOptions::new()
            .with_storage_type(StorageType::Session)
            .with_namespace(namespace)
    };

    let mut first = JsonStore::new(options("session-a")).unwrap();
    let mut second = JsonStore::new(options("session-b")).unwrap();
    first.set_item("user", &test_user(), None).unwrap();
    second.set_item("user", &"other", None).unwrap();
    second.clear().unwrap();

    assert_eq!(first.get_item::<User>("user").unwrap(), Some(test_user()));
    assert!(second.raw().get("session-a:user").is_some());
    drop(first);

    let mut later = JsonStore::new(options("session-a")).unwrap();
    assert_eq!(later.get_item::<User>("user").unwrap(), Some(test_user()));
    later.clear().unwrap();
}

#[test]
fn test_quota_rejection_is_storage_write_error() {
    let backend = Arc::new(MemoryStorage::with_quota(64));
    let mut store = create_store(StoreOptions::new(), &backend);

    let result = store.set_item("big", &"x".repeat(128), None);
    assert!(matches!(result, Err(StoreError::StorageWrite { .. })));
}
