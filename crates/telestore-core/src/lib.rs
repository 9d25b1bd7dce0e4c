//! Core library for `telestore`.
//!
//! Builds a key-value store on top of a hosted document service: keys are
//! document titles, values are JSON encoded through a pluggable [`Cipher`]
//! and written as document content. Contains the store, the ciphers, the
//! payload codec and the credential hooks. This crate depends on
//! `telestore-client` for the [`DocumentClient`] trait and knows nothing
//! about HTTP.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use telestore_core::{IdentityCipher, MemoryClient, MemoryCredentialHook, Store};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), telestore_core::StoreError> {
//! let store = Store::new(Arc::new(MemoryClient::new()), Arc::new(IdentityCipher));
//! store.init(&MemoryCredentialHook::new()).await?;
//! store.set("zebra", &serde_json::json!({"hello": "world"})).await?;
//! let value: Option<serde_json::Value> = store.get("zebra").await?;
//! assert_eq!(value, Some(serde_json::json!({"hello": "world"})));
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod codec;
pub mod credential;
pub mod error;
pub mod store;

pub use cipher::{Base64Cipher, Cipher, IdentityCipher, PasswordCipher};
pub use codec::DATA_LENGTH_LIMIT;
pub use credential::{CREDENTIAL_KEY, CredentialHook, FileCredentialHook, MemoryCredentialHook};
pub use error::{CipherError, DecodeFailure, HookError, StoreError};
pub use store::{MAX_KEY_LEN, Store};
pub use telestore_client::{ClientError, DocumentClient, DocumentSummary, MemoryClient, Node};
