//! Error types for `telestore-core`.
//!
//! Each error variant carries enough context to tell "key absent" from
//! "data corrupt" from "backend rejected the request". Cipher errors never
//! include key material or plaintext.

use telestore_client::ClientError;

/// Errors from cipher encode/decode.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The input could not be turned into ciphertext.
    #[error("encoding failed: {reason}")]
    Encoding { reason: String },

    /// The input is not a well-formed envelope (bad base64, wrong structure,
    /// wrong nonce length, non-UTF-8 plaintext).
    #[error("malformed ciphertext: {reason}")]
    Decode { reason: String },

    /// The authentication tag did not verify: wrong password or tampered data.
    #[error("authentication failed: wrong password or tampered ciphertext")]
    Authentication,
}

/// Why a stored value could not be turned back into a value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    /// The document content holds no payload text node.
    #[error("document content has no payload text node")]
    MissingPayload,

    /// The cipher rejected the payload.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The decoded payload is not valid JSON for the requested type.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the credential load/save hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Failed to read persisted state.
    #[error("failed to read credential state at '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Failed to write persisted state.
    #[error("failed to write credential state at '{path}': {reason}")]
    Write { path: String, reason: String },

    /// Persisted state exists but cannot be parsed.
    #[error("credential state at '{path}' is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No credential is bound to the store.
    #[error("store has no credential; call init() or register() first")]
    Unauthenticated,

    /// The key can never be a document title (blank or too long).
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The key is absent and the caller required it.
    #[error("key '{key}' is missing")]
    KeyMissing { key: String },

    /// The encoded payload exceeds the per-document ceiling.
    #[error("encoded value for '{key}' is {length} units, limit is {limit}")]
    DataTooLong {
        key: String,
        length: usize,
        limit: usize,
    },

    /// The value could not be serialized or encrypted.
    #[error("failed to encode value for '{key}': {reason}")]
    Encode { key: String, reason: String },

    /// A stored value could not be decrypted or parsed. `context` is the key
    /// or path that was read.
    #[error("failed to decode stored value for '{context}': {source}")]
    Decode {
        context: String,
        #[source]
        source: DecodeFailure,
    },

    /// The document backend rejected a call.
    #[error("backend {operation} failed for '{target}': {source}")]
    Backend {
        operation: &'static str,
        target: String,
        #[source]
        source: ClientError,
    },

    /// The credential hook failed.
    #[error("credential hook error: {0}")]
    Hook(#[from] HookError),
}

impl StoreError {
    /// The backend error code behind this error, if any.
    #[must_use]
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            Self::Backend { source, .. } => source.code(),
            _ => None,
        }
    }

    pub(crate) fn backend(
        operation: &'static str,
        target: &str,
    ) -> impl FnOnce(ClientError) -> Self {
        let target = target.to_owned();
        move |source| Self::Backend {
            operation,
            target,
            source,
        }
    }

    pub(crate) fn decode(context: &str, source: impl Into<DecodeFailure>) -> Self {
        Self::Decode {
            context: context.to_owned(),
            source: source.into(),
        }
    }
}
