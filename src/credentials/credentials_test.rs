use super::*;

fn pair(access: &str, refresh: &str) -> CredentialPair {
    CredentialPair::new(access, refresh)
}

// =============================================================================
// StoredKeys
// =============================================================================

#[test]
fn partial_pair_reads_as_absent() {
    let only_refresh = StoredKeys { access_token: None, refresh_token: Some("R1".into()) };
    assert!(only_refresh.into_pair().is_none());

    let only_access = StoredKeys { access_token: Some("T1".into()), refresh_token: None };
    assert!(only_access.into_pair().is_none());
}

#[test]
fn empty_string_key_reads_as_absent() {
    let keys = StoredKeys { access_token: Some(String::new()), refresh_token: Some("R1".into()) };
    assert!(keys.into_pair().is_none());
}

#[test]
fn stored_keys_use_portal_key_names() {
    let json = serde_json::to_value(StoredKeys::from(&pair("T1", "R1"))).unwrap();
    assert_eq!(json[ACCESS_TOKEN_KEY], "T1");
    assert_eq!(json[REFRESH_TOKEN_KEY], "R1");
}

#[test]
fn debug_redacts_tokens() {
    let rendered = format!("{:?}", pair("secret-access", "secret-refresh"));
    assert!(!rendered.contains("secret"));
}

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_starts_empty() {
    assert!(MemoryStore::new().get().unwrap().is_none());
}

#[test]
fn memory_store_set_then_get_returns_both_tokens() {
    let store = MemoryStore::new();
    store.set(&pair("T1", "R1")).unwrap();
    store.set(&pair("T2", "R2")).unwrap();
    assert_eq!(store.get().unwrap(), Some(pair("T2", "R2")));
}

#[test]
fn memory_store_clear_removes_both_keys() {
    let store = MemoryStore::with_pair(&pair("T1", "R1"));
    store.clear().unwrap();
    assert_eq!(store.keys().unwrap(), StoredKeys::default());
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("nope.json"));
    assert!(store.get().unwrap().is_none());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("credentials.json");

    FileStore::new(&path).set(&pair("T1", "R1")).unwrap();
    assert_eq!(FileStore::new(&path).get().unwrap(), Some(pair("T1", "R1")));
}

#[test]
fn file_store_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("credentials.json"));
    store.set(&pair("T1", "R1")).unwrap();
    store.clear().unwrap();
    store.clear().unwrap();
    assert!(store.get().unwrap().is_none());
    assert!(!store.path().exists());
}

#[test]
fn file_store_partial_file_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, r#"{"refreshToken":"R1"}"#).unwrap();

    let store = FileStore::new(&path);
    assert!(store.get().unwrap().is_none());
    assert_eq!(store.read_keys().unwrap().refresh_token.as_deref(), Some("R1"));
}

#[test]
fn file_store_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(FileStore::new(&path).get(), Err(StoreError::Serde(_))));
}

// =============================================================================
// SharedCredentials
// =============================================================================

#[test]
fn shared_credentials_accessors() {
    let creds = SharedCredentials::in_memory();
    assert!(creds.access_token().is_none());
    assert!(creds.refresh_token().is_none());

    creds.set(&pair("T1", "R1")).unwrap();
    assert_eq!(creds.access_token().as_deref(), Some("T1"));
    assert_eq!(creds.refresh_token().as_deref(), Some("R1"));

    creds.clear().unwrap();
    assert!(creds.get().is_none());
}

#[test]
fn shared_credentials_unreadable_store_reads_as_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "{{{").unwrap();

    let creds = SharedCredentials::new(Arc::new(FileStore::new(&path)));
    assert!(creds.get().is_none());
}

#[test]
fn shared_credentials_clones_share_one_store() {
    let creds = SharedCredentials::in_memory();
    let other = creds.clone();
    other.set(&pair("T9", "R9")).unwrap();
    assert_eq!(creds.get(), Some(pair("T9", "R9")));
}

#[test]
fn concurrent_writers_never_mix_pairs() {
    let creds = SharedCredentials::in_memory();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let creds = creds.clone();
            std::thread::spawn(move || {
                for j in 0..200 {
                    let n = i * 1000 + j;
                    creds.set(&pair(&format!("T{n}"), &format!("R{n}"))).unwrap();
                    let got = creds.get().unwrap();
                    assert_eq!(got.access_token[1..], got.refresh_token[1..]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn replace_if_current_writes_over_matching_session() {
    let creds = SharedCredentials::in_memory();
    creds.set(&pair("T1", "R1")).unwrap();

    assert!(creds.replace_if_current("R1", &pair("T2", "R2")).unwrap());
    assert_eq!(creds.get(), Some(pair("T2", "R2")));
}

#[test]
fn replace_if_current_leaves_replaced_or_cleared_session_alone() {
    let creds = SharedCredentials::in_memory();
    creds.set(&pair("NEW", "NEWR")).unwrap();
    assert!(!creds.replace_if_current("R1", &pair("T2", "R2")).unwrap());
    assert_eq!(creds.get(), Some(pair("NEW", "NEWR")));

    creds.clear().unwrap();
    assert!(!creds.replace_if_current("NEWR", &pair("T2", "R2")).unwrap());
    assert_eq!(creds.get(), None);
}

#[test]
fn clear_if_current_only_clears_matching_session() {
    let creds = SharedCredentials::in_memory();
    creds.set(&pair("NEW", "NEWR")).unwrap();

    assert!(!creds.clear_if_current("R1").unwrap());
    assert_eq!(creds.get(), Some(pair("NEW", "NEWR")));

    assert!(creds.clear_if_current("NEWR").unwrap());
    assert_eq!(creds.get(), None);
}
