//! Title-indexed key-value store over hosted documents.
//!
//! Each key is the title of exactly one document owned by the store's
//! credential; the value lives in that document's content (see
//! [`codec`](crate::codec)). The backend has no key index, no upsert and no
//! uniqueness on titles, so:
//!
//! - Every lookup lists the whole account and scans for the title. This is
//!   O(documents) per call and always fresh; nothing is cached.
//! - A new key is provisioned in two writes: create a draft under a
//!   throwaway title, then rewrite it to the real title and content. A
//!   cancelled or failed `set` can leave the draft behind.
//! - Two writers racing on the same new key can both miss it in the listing
//!   and both create a document. The store neither locks nor repairs this;
//!   reads take the first match. Callers that need stronger guarantees must
//!   serialize `set` calls per key themselves.
//!
//! Size and credential checks run locally before any remote call. Backend
//! errors are passed through with operation and key attached, never retried.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use telestore_client::{DocumentClient, DocumentSummary};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cipher::Cipher;
use crate::codec;
use crate::credential::{CREDENTIAL_KEY, CredentialHook};
use crate::error::StoreError;

/// Length of the generated account display name.
const SHORT_NAME_LEN: usize = 8;

/// Longest key the backend accepts as a title, in characters.
pub const MAX_KEY_LEN: usize = 256;

/// A key-value store bound to one backend account.
///
/// The client and cipher are shared capabilities; the credential is owned by
/// the store and starts out absent unless given at construction.
pub struct Store {
    client: Arc<dyn DocumentClient>,
    cipher: Arc<dyn Cipher>,
    credential: RwLock<Option<String>>,
}

impl Store {
    /// Create a store with no credential. Call [`init`](Self::init) or
    /// [`register`](Self::register) before keyed operations.
    #[must_use]
    pub fn new(client: Arc<dyn DocumentClient>, cipher: Arc<dyn Cipher>) -> Self {
        Self {
            client,
            cipher,
            credential: RwLock::new(None),
        }
    }

    /// Create a store already bound to `credential`.
    #[must_use]
    pub fn with_credential(
        client: Arc<dyn DocumentClient>,
        cipher: Arc<dyn Cipher>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cipher,
            credential: RwLock::new(Some(credential.into())),
        }
    }

    /// Bind the store to `credential`, replacing any previous one.
    pub async fn bind(&self, credential: impl Into<String>) {
        let credential = credential.into();
        info!(credential = %redact(&credential), "credential bound");
        *self.credential.write().await = Some(credential);
    }

    /// Whether a credential is bound.
    pub async fn is_bound(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// The bound credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] if none is bound.
    pub async fn credential(&self) -> Result<String, StoreError> {
        self.credential
            .read()
            .await
            .clone()
            .ok_or(StoreError::Unauthenticated)
    }

    /// The cipher applied to every payload.
    #[must_use]
    pub fn cipher(&self) -> &dyn Cipher {
        self.cipher.as_ref()
    }

    /// Create a new backend account, bind its credential and return it.
    ///
    /// The account gets a short random display name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend refuses the account or
    /// answers without an access token.
    pub async fn register(&self) -> Result<String, StoreError> {
        let short_name: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SHORT_NAME_LEN)
            .collect();

        let account = self
            .client
            .create_account(&short_name)
            .await
            .map_err(StoreError::backend("create_account", &short_name))?;
        let credential = account.access_token.ok_or_else(|| StoreError::Backend {
            operation: "create_account",
            target: short_name.clone(),
            source: telestore_client::ClientError::UnexpectedResponse {
                reason: "account created without an access token".to_owned(),
            },
        })?;

        info!(short_name = %short_name, "registered backend account");
        self.bind(credential.clone()).await;
        Ok(credential)
    }

    /// Make sure the store has a credential, registering one only if the hook
    /// has none persisted.
    ///
    /// Returns the bound credential. If the store is already bound, the hook
    /// is not consulted. Concurrent calls on an unbound store may each
    /// register an account; the last one bound wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Hook`] if the hook fails, or
    /// [`StoreError::Backend`] if registration fails.
    pub async fn init(&self, hook: &dyn CredentialHook) -> Result<String, StoreError> {
        if let Some(credential) = self.credential.read().await.clone() {
            return Ok(credential);
        }

        if let Some(saved) = hook.load(CREDENTIAL_KEY).await? {
            debug!("loaded persisted credential");
            self.bind(saved.clone()).await;
            return Ok(saved);
        }

        let credential = self.register().await?;
        hook.save(CREDENTIAL_KEY, &credential).await?;
        Ok(credential)
    }

    /// Revoke the bound credential, bind the replacement the backend issues
    /// and persist it through `hook`. Documents stay with the account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] if no credential is bound,
    /// [`StoreError::Backend`] if revocation fails, or [`StoreError::Hook`]
    /// if the new credential cannot be saved (the store is still bound to it).
    pub async fn rotate_credential(&self, hook: &dyn CredentialHook) -> Result<String, StoreError> {
        let old = self.credential().await?;
        let account = self
            .client
            .revoke_credential(&old)
            .await
            .map_err(StoreError::backend("revoke_credential", &redact(&old)))?;
        let credential = account.access_token.ok_or_else(|| StoreError::Backend {
            operation: "revoke_credential",
            target: redact(&old),
            source: telestore_client::ClientError::UnexpectedResponse {
                reason: "revocation returned no access token".to_owned(),
            },
        })?;

        info!(short_name = %account.short_name, "credential rotated");
        self.bind(credential.clone()).await;
        hook.save(CREDENTIAL_KEY, &credential).await?;
        Ok(credential)
    }

    /// Titles of every document owned by the credential, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] if no credential is bound, or
    /// [`StoreError::Backend`] if listing fails.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let credential = self.credential().await?;
        let documents = self
            .client
            .list_documents(&credential)
            .await
            .map_err(StoreError::backend("list", "*"))?;
        Ok(documents.into_iter().map(|d| d.title).collect())
    }

    /// Resolve `key` to its document by scanning the full listing.
    ///
    /// The first title match wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] if no credential is bound, or
    /// [`StoreError::Backend`] if listing fails.
    pub async fn locate(&self, key: &str) -> Result<Option<DocumentSummary>, StoreError> {
        let credential = self.credential().await?;
        self.locate_with(&credential, key).await
    }

    /// Read the value stored under `key`, or `None` if no document has that
    /// title. A missing key performs no writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the stored value cannot be decrypted
    /// or parsed as `T`; this is never reported as a missing key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(document) = self.locate(key).await? else {
            debug!(key, "key not found");
            return Ok(None);
        };
        self.read_path(&document.path, key).await.map(Some)
    }

    /// Read the value under `key`, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Read the value under `key`, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyMissing`] if no document has that title, or
    /// any error of [`get`](Self::get).
    pub async fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        self.get(key).await?.ok_or_else(|| StoreError::KeyMissing {
            key: key.to_owned(),
        })
    }

    /// Read a document directly by path, bypassing title resolution.
    ///
    /// Works without a credential, so it can read documents of other
    /// accounts as long as they were written with a compatible cipher.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the fetch fails, or
    /// [`StoreError::Decode`] if the content cannot be decoded.
    pub async fn get_foreign<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        self.read_path(path, path).await
    }

    /// Store `value` under `key` and return the document path.
    ///
    /// Overwrites the existing document titled `key` in place, or provisions
    /// a new one (draft, then rewrite) if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`], [`StoreError::Unauthenticated`] or
    /// [`StoreError::DataTooLong`] before any remote call, [`StoreError::Encode`] if the value cannot be
    /// serialized, or [`StoreError::Backend`] if a remote call fails. A
    /// failure after the draft was created leaves the draft in place.
    pub async fn set<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<String, StoreError> {
        check_key(key)?;
        let credential = self.credential().await?;
        let content = codec::encode(&self.cipher, key, value).await?;

        if let Some(existing) = self.locate_with(&credential, key).await? {
            debug!(key, path = %existing.path, "overwriting document");
            self.client
                .update_document(&credential, &existing.path, key, &content)
                .await
                .map_err(StoreError::backend("update", key))?;
            return Ok(existing.path);
        }

        // Draft first: creation needs content up front and the final title
        // must not be visible before the content is in place.
        let draft_title = Uuid::new_v4().to_string();
        let draft = self
            .client
            .create_document(&credential, &draft_title, &content)
            .await
            .map_err(StoreError::backend("create", key))?;
        debug!(key, path = %draft.path, "draft created");

        let document = self
            .client
            .update_document(&credential, &draft.path, key, &content)
            .await
            .map_err(StoreError::backend("update", key))?;
        info!(key, path = %document.path, "provisioned document");
        Ok(document.path)
    }

    async fn locate_with(
        &self,
        credential: &str,
        key: &str,
    ) -> Result<Option<DocumentSummary>, StoreError> {
        let documents = self
            .client
            .list_documents(credential)
            .await
            .map_err(StoreError::backend("list", key))?;
        let scanned = documents.len();

        let mut matches = documents.into_iter().filter(|d| d.title == key);
        let first = matches.next();
        let duplicates = matches.count();
        if duplicates > 0 {
            warn!(key, duplicates, "several documents share this title; using the first");
        }
        debug!(key, documents = scanned, found = first.is_some(), "resolved title");
        Ok(first)
    }

    async fn read_path<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T, StoreError> {
        let document = self
            .client
            .fetch_document(path)
            .await
            .map_err(StoreError::backend("fetch", context))?;
        debug!(path, "fetched document");
        let content = document.content.unwrap_or_default();
        codec::decode(&self.cipher, context, &content).await
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("cipher", &self.cipher.name())
            .field("credential", &"<check with is_bound()>")
            .finish_non_exhaustive()
    }
}

/// Reject keys the backend would refuse as a title.
fn check_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.trim().is_empty() {
        "key is blank".to_owned()
    } else if key.chars().count() > MAX_KEY_LEN {
        format!("key is longer than {MAX_KEY_LEN} characters")
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey {
        key: key.to_owned(),
        reason,
    })
}

/// First characters of a credential, for logs and error context.
fn redact(credential: &str) -> String {
    let prefix: String = credential.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};
    use telestore_client::{ClientError, MemoryClient, Node};

    use super::*;
    use crate::cipher::{Base64Cipher, IdentityCipher, PasswordCipher};
    use crate::codec::DATA_LENGTH_LIMIT;
    use crate::credential::MemoryCredentialHook;
    use crate::error::{CipherError, DecodeFailure};

    fn make_store(cipher: Arc<dyn Cipher>) -> (Store, MemoryClient) {
        let client = MemoryClient::new();
        let store = Store::new(Arc::new(client.clone()), cipher);
        (store, client)
    }

    async fn registered(cipher: Arc<dyn Cipher>) -> (Store, MemoryClient) {
        let (store, client) = make_store(cipher);
        store.register().await.unwrap();
        client.reset_calls().await;
        (store, client)
    }

    #[tokio::test]
    async fn unbound_store_rejects_keyed_operations() {
        let (store, client) = make_store(Arc::new(IdentityCipher));
        assert!(matches!(store.list().await, Err(StoreError::Unauthenticated)));
        assert!(matches!(
            store.get::<Value>("k").await,
            Err(StoreError::Unauthenticated)
        ));
        assert!(matches!(
            store.set("k", &1).await,
            Err(StoreError::Unauthenticated)
        ));
        assert_eq!(client.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let (store, _) = registered(Arc::new(IdentityCipher)).await;
        store.set("zebra", &json!({"hello": "world"})).await.unwrap();
        let value: Value = store.get("zebra").await.unwrap().unwrap();
        assert_eq!(value, json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn new_key_takes_two_writes() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        store.set("k", &1).await.unwrap();
        let calls = client.calls().await;
        assert_eq!(calls.list_documents, 1);
        assert_eq!(calls.create_document, 1);
        assert_eq!(calls.update_document, 1);
    }

    #[tokio::test]
    async fn existing_key_is_overwritten_in_place() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let first = store.set("k", &"v1").await.unwrap();
        client.reset_calls().await;

        let second = store.set("k", &"v2").await.unwrap();
        assert_eq!(first, second);
        let calls = client.calls().await;
        assert_eq!(calls.create_document, 0);
        assert_eq!(calls.update_document, 1);

        let credential = store.credential().await.unwrap();
        assert_eq!(client.count_titled(&credential, "k").await, 1);
        assert_eq!(store.get::<String>("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn missing_key_returns_default_without_writes() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let value = store
            .get_or("nonexistent-key", json!({"default": true}))
            .await
            .unwrap();
        assert_eq!(value, json!({"default": true}));
        let calls = client.calls().await;
        assert_eq!(calls.writes(), 0);
        assert_eq!(calls.fetch_document, 0);
    }

    #[tokio::test]
    async fn require_reports_missing_key() {
        let (store, _) = registered(Arc::new(IdentityCipher)).await;
        let err = store.require::<Value>("absent").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMissing { key } if key == "absent"));
    }

    #[tokio::test]
    async fn oversized_value_fails_before_any_remote_call() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let too_long = "a".repeat(DATA_LENGTH_LIMIT - 1);
        let err = store.set("big", &too_long).await.unwrap_err();
        assert!(matches!(err, StoreError::DataTooLong { .. }));
        assert_eq!(client.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn value_at_limit_is_stored() {
        let (store, _) = registered(Arc::new(IdentityCipher)).await;
        let at_limit = "a".repeat(DATA_LENGTH_LIMIT - 2);
        store.set("edge", &at_limit).await.unwrap();
        assert_eq!(store.get::<String>("edge").await.unwrap(), Some(at_limit));
    }

    #[tokio::test]
    async fn corrupt_payload_is_not_reported_as_missing() {
        let (store, client) = registered(Arc::new(Base64Cipher)).await;
        let path = store.set("k", &json!([1, 2, 3])).await.unwrap();

        let credential = store.credential().await.unwrap();
        let garbage = vec![Node::element("p", vec![Node::text("@@not-base64@@")])];
        client
            .update_document(&credential, &path, "k", &garbage)
            .await
            .unwrap();

        let err = store.get::<Value>("k").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode { context, source: DecodeFailure::Cipher(CipherError::Decode { .. }) }
                if context == "k"
        ));
    }

    #[tokio::test]
    async fn wrong_password_surfaces_authentication_failure() {
        let client = MemoryClient::new();
        let writer = Store::new(
            Arc::new(client.clone()),
            Arc::new(PasswordCipher::with_iterations("right", 1_000)),
        );
        let credential = writer.register().await.unwrap();
        writer.set("secret", &"value").await.unwrap();

        let reader = Store::with_credential(
            Arc::new(client),
            Arc::new(PasswordCipher::with_iterations("wrong", 1_000)),
            credential,
        );
        let err = reader.get::<String>("secret").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode {
                source: DecodeFailure::Cipher(CipherError::Authentication),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_titles_resolve_to_first_listed() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let credential = store.credential().await.unwrap();
        let older = crate::codec::wrap("\"older\"".to_owned());
        let newer = crate::codec::wrap("\"newer\"".to_owned());
        client.create_document(&credential, "dup", &older).await.unwrap();
        client.create_document(&credential, "dup", &newer).await.unwrap();

        let listed = client.list_documents(&credential).await.unwrap();
        let expected = client.fetch_document(&listed[0].path).await.unwrap();
        let expected: String =
            crate::codec::decode(&store.cipher, "dup", &expected.content.unwrap())
                .await
                .unwrap();

        assert_eq!(store.get::<String>("dup").await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn backend_errors_carry_operation_and_key() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        client.fail_next("TOO_MANY_REQUESTS").await;
        let err = store.set("k", &1).await.unwrap_err();
        assert!(matches!(
            &err,
            StoreError::Backend { operation: "list", target, source: ClientError::RateLimited { .. } }
                if target == "k"
        ));
        assert_eq!(err.backend_code(), Some("TOO_MANY_REQUESTS"));
    }

    #[tokio::test]
    async fn failed_rewrite_leaves_draft() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let credential = store.credential().await.unwrap();

        // list and create succeed, the rewrite to the real title fails.
        client.fail_after(2, "INTERNAL_ERROR").await;
        let err = store.set("other", &2).await.unwrap_err();
        assert!(matches!(
            &err,
            StoreError::Backend { operation: "update", .. }
        ));
        assert_eq!(err.backend_code(), Some("INTERNAL_ERROR"));

        assert_eq!(client.count_titled(&credential, "other").await, 0);
        let titles = store.list().await.unwrap();
        assert_eq!(titles.len(), 1);
        assert!(Uuid::parse_str(&titles[0]).is_ok());
        assert_eq!(store.get::<i32>("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_foreign_reads_by_path_without_credential() {
        let client = MemoryClient::new();
        let owner = Store::new(Arc::new(client.clone()), Arc::new(Base64Cipher));
        owner.register().await.unwrap();
        let path = owner.set("shared", &json!({"n": 42})).await.unwrap();

        let reader = Store::new(Arc::new(client), Arc::new(Base64Cipher));
        assert!(!reader.is_bound().await);
        let value: Value = reader.get_foreign(&path).await.unwrap();
        assert_eq!(value, json!({"n": 42}));
    }

    #[tokio::test]
    async fn get_foreign_missing_path_is_backend_error() {
        let (store, _) = make_store(Arc::new(IdentityCipher));
        let err = store.get_foreign::<Value>("no-such-path").await.unwrap_err();
        assert_eq!(err.backend_code(), Some("PAGE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn credentials_scope_key_spaces() {
        let client = MemoryClient::new();
        let a = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
        let b = Store::new(Arc::new(client), Arc::new(IdentityCipher));
        a.register().await.unwrap();
        b.register().await.unwrap();

        a.set("k", &"from a").await.unwrap();
        assert_eq!(b.get::<String>("k").await.unwrap(), None);
        assert!(b.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn init_registers_once_and_persists() {
        let client = MemoryClient::new();
        let hook = MemoryCredentialHook::new();

        let first = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
        let credential = first.init(&hook).await.unwrap();
        assert_eq!(
            hook.load(CREDENTIAL_KEY).await.unwrap().as_deref(),
            Some(credential.as_str())
        );

        let second = Store::new(Arc::new(client.clone()), Arc::new(IdentityCipher));
        assert_eq!(second.init(&hook).await.unwrap(), credential);
        assert_eq!(client.calls().await.create_account, 1);
    }

    #[tokio::test]
    async fn init_on_bound_store_skips_hook() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let hook = MemoryCredentialHook::new();
        let credential = store.init(&hook).await.unwrap();
        assert_eq!(credential, store.credential().await.unwrap());
        assert_eq!(hook.load(CREDENTIAL_KEY).await.unwrap(), None);
        assert_eq!(client.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn rotate_keeps_documents_and_persists_new_token() {
        let (store, _) = registered(Arc::new(IdentityCipher)).await;
        let hook = MemoryCredentialHook::new();
        let old = store.credential().await.unwrap();
        store.set("kept", &true).await.unwrap();

        let new = store.rotate_credential(&hook).await.unwrap();
        assert_ne!(old, new);
        assert_eq!(store.credential().await.unwrap(), new);
        assert_eq!(hook.load(CREDENTIAL_KEY).await.unwrap(), Some(new));
        assert_eq!(store.get::<bool>("kept").await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn register_failure_leaves_store_unbound() {
        let (store, client) = make_store(Arc::new(IdentityCipher));
        client.fail_next("INTERNAL_ERROR").await;
        let err = store.register().await.unwrap_err();
        assert_eq!(err.backend_code(), Some("INTERNAL_ERROR"));
        assert!(!store.is_bound().await);
    }

    #[tokio::test]
    async fn unusable_keys_fail_before_any_call() {
        let (store, client) = registered(Arc::new(IdentityCipher)).await;
        let long = "k".repeat(MAX_KEY_LEN + 1);
        for key in ["", "  ", "\t\n", long.as_str()] {
            let err = store.set(key, &1).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "key {key:?}");
        }
        assert_eq!(client.calls().await.total(), 0);

        let credential = store.credential().await.unwrap();
        assert!(client.list_documents(&credential).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn longest_allowed_key_is_accepted() {
        let (store, _) = registered(Arc::new(IdentityCipher)).await;
        let key = "é".repeat(MAX_KEY_LEN);
        store.set(&key, &1).await.unwrap();
        assert_eq!(store.get::<i32>(&key).await.unwrap(), Some(1));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn password_cipher_does_not_starve_other_tasks() {
        let (store, _) = registered(Arc::new(PasswordCipher::new("pw"))).await;

        let started = std::time::Instant::now();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            std::time::Instant::now()
        });

        store.set("slow", &"value").await.unwrap();
        assert_eq!(
            store.get::<String>("slow").await.unwrap().as_deref(),
            Some("value")
        );
        let finished = std::time::Instant::now();

        let woke = ticker.await.unwrap();
        assert!(
            woke < finished,
            "timer woke {:?} after start, store finished after {:?}",
            woke - started,
            finished - started
        );
    }

    #[test]
    fn redact_keeps_only_prefix() {
        assert_eq!(redact("abcdef123456"), "abcd***");
        assert_eq!(redact("ab"), "ab***");
    }

    #[test]
    fn debug_hides_credential() {
        let store = Store::with_credential(
            Arc::new(MemoryClient::new()),
            Arc::new(IdentityCipher),
            "super-secret-token",
        );
        let debug = format!("{store:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("identity"));
    }
}
