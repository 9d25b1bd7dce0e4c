//! End-to-end store scenarios against the in-memory document backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use telestore_core::{
    Base64Cipher, Cipher, CipherError, DecodeFailure, DocumentClient, FileCredentialHook,
    IdentityCipher, MemoryClient, MemoryCredentialHook, Node, PasswordCipher, Store, StoreError,
};

fn ciphers() -> Vec<Arc<dyn Cipher>> {
    vec![
        Arc::new(IdentityCipher),
        Arc::new(Base64Cipher),
        Arc::new(PasswordCipher::with_iterations("sharedSecret", 1_000)),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    score: Option<f64>,
}

// ── Fresh store scenario ────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_init_set_get_list() {
    let client = MemoryClient::new();
    let store = Store::new(Arc::new(client), Arc::new(IdentityCipher));
    assert!(!store.is_bound().await);

    store.init(&MemoryCredentialHook::new()).await.unwrap();
    store.set("zebra", &json!({"hello": "world"})).await.unwrap();

    let value: Value = store.get("zebra").await.unwrap().unwrap();
    assert_eq!(value, json!({"hello": "world"}));
    assert!(store.list().await.unwrap().contains(&"zebra".to_owned()));
}

// ── Round-trip across ciphers ───────────────────────────────────────

#[tokio::test]
async fn typed_values_roundtrip_through_every_cipher() {
    let profile = Profile {
        name: "Zoë 🦓".to_owned(),
        tags: vec!["stripes".to_owned(), "savanna".to_owned()],
        score: Some(9.5),
    };

    for cipher in ciphers() {
        let name = cipher.name();
        let store = Store::new(Arc::new(MemoryClient::new()), cipher);
        store.register().await.unwrap();

        store.set("profile", &profile).await.unwrap();
        store.set("count", &42_u32).await.unwrap();
        store.set("nothing", &Value::Null).await.unwrap();

        let back: Profile = store.require("profile").await.unwrap();
        assert_eq!(back, profile, "cipher {name}");
        assert_eq!(store.get::<u32>("count").await.unwrap(), Some(42));
        assert_eq!(
            store.get::<Value>("nothing").await.unwrap(),
            Some(Value::Null),
            "a stored null is not a missing key"
        );
    }
}

// ── Overwrite keeps one document ────────────────────────────────────

#[tokio::test]
async fn repeated_sets_keep_exactly_one_document() {
    let client = MemoryClient::new();
    let store = Store::new(Arc::new(client.clone()), Arc::new(Base64Cipher));
    let credential = store.register().await.unwrap();

    for round in 0..5 {
        store.set("counter", &round).await.unwrap();
    }

    assert_eq!(store.get::<i32>("counter").await.unwrap(), Some(4));
    assert_eq!(client.count_titled(&credential, "counter").await, 1);
    assert_eq!(store.list().await.unwrap(), vec!["counter".to_owned()]);
}

#[tokio::test]
async fn independent_keys_can_be_set_concurrently() {
    let client = MemoryClient::new();
    let store = Arc::new(Store::new(Arc::new(client), Arc::new(IdentityCipher)));
    store.register().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.set(&format!("key-{i}"), &i).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut titles = store.list().await.unwrap();
    titles.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("key-{i}")).collect();
    assert_eq!(titles, expected);
}

// ── Tamper detection ────────────────────────────────────────────────

#[tokio::test]
async fn flipped_ciphertext_byte_is_detected() {
    let client = MemoryClient::new();
    let store = Store::new(
        Arc::new(client.clone()),
        Arc::new(PasswordCipher::with_iterations("sharedSecret", 1_000)),
    );
    let credential = store.register().await.unwrap();
    let path = store.set("vault", &json!({"pin": 1234})).await.unwrap();

    let document = client.fetch_document(&path).await.unwrap();
    let payload = telestore_core::codec::extract_payload(document.content.as_deref().unwrap())
        .unwrap()
        .to_owned();

    let mut bytes = payload.into_bytes();
    let middle = bytes.len() / 2;
    bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();

    client
        .update_document(&credential, &path, "vault", &telestore_core::codec::wrap(tampered))
        .await
        .unwrap();

    let err = store.get::<Value>("vault").await.unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::Decode {
                source: DecodeFailure::Cipher(
                    CipherError::Authentication | CipherError::Decode { .. }
                ),
                ..
            }
        ),
        "tampering must surface as a decode error, got {err:?}"
    );
}

// ── Foreign reads ───────────────────────────────────────────────────

#[tokio::test]
async fn foreign_document_written_by_hand_is_readable() {
    let client = MemoryClient::new();
    let author = client
        .create_account("author")
        .await
        .unwrap()
        .access_token
        .unwrap();
    let doc = client
        .create_document(
            &author,
            "shared",
            &[Node::element("blockquote", vec![Node::text(r#"{"v":1}"#)])],
        )
        .await
        .unwrap();

    let reader = Store::new(Arc::new(client), Arc::new(IdentityCipher));
    let value: Value = reader.get_foreign(&doc.path).await.unwrap();
    assert_eq!(value, json!({"v": 1}));
}

// ── Credential persistence ──────────────────────────────────────────

#[tokio::test]
async fn file_hook_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let client = MemoryClient::new();

    let first = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
    first.init(&FileCredentialHook::new(&state)).await.unwrap();
    first.set("persisted", &"yes").await.unwrap();

    // A new process: same backend, same state file, no re-registration.
    let second = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
    second.init(&FileCredentialHook::new(&state)).await.unwrap();
    assert_eq!(
        second.get::<String>("persisted").await.unwrap().as_deref(),
        Some("yes")
    );
    assert_eq!(client.calls().await.create_account, 1);
}

#[tokio::test]
async fn revoked_credential_is_rejected_by_backend() {
    let client = MemoryClient::new();
    let hook = MemoryCredentialHook::new();
    let store = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
    let old = store.init(&hook).await.unwrap();
    store.rotate_credential(&hook).await.unwrap();

    let stale = Store::with_credential(Arc::new(client), Arc::new(IdentityCipher), old);
    let err = stale.list().await.unwrap_err();
    assert_eq!(err.backend_code(), Some("ACCESS_TOKEN_INVALID"));
}
