//! Document client abstraction for `telestore`.
//!
//! This crate defines the [`DocumentClient`] trait: the handful of page and
//! account calls the key-value store needs from the hosted document service.
//! It knows nothing about keys, values, or encryption. The store in
//! `telestore-core` builds key-value semantics on top of it.
//!
//! Two implementations are provided:
//!
//! - [`HttpClient`]: talks to the Telegraph API over HTTPS (feature `http-client`)
//! - [`MemoryClient`]: in-memory, for testing only

mod error;
#[cfg(feature = "http-client")]
mod http;
mod memory;
mod types;

pub use error::ClientError;
#[cfg(feature = "http-client")]
pub use http::{ClientConfig, HttpClient};
pub use memory::{CallCounts, MemoryClient};
pub use types::{Account, Document, DocumentSummary, Node, NodeElement};

/// A pluggable document backend.
///
/// Documents are addressed by backend-assigned paths. Titles are free-form
/// and not unique; the backend does not enforce anything about them beyond
/// being non-empty.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait DocumentClient: Send + Sync + 'static {
    /// Create a new account and return it, including its access token.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ClientError`] if the account cannot be created.
    async fn create_account(&self, short_name: &str) -> Result<Account, ClientError>;

    /// Revoke `credential` and return the account with a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidCredential`] if the token is unknown.
    async fn revoke_credential(&self, credential: &str) -> Result<Account, ClientError>;

    /// Create a document owned by `credential`.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ClientError`] (empty title or content, content
    /// too big, invalid token, rate limit, ...).
    async fn create_document(
        &self,
        credential: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError>;

    /// Fetch a document with its content. No credential is needed: documents
    /// are public by path.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ClientError`] if the path does not resolve.
    async fn fetch_document(&self, path: &str) -> Result<Document, ClientError>;

    /// Replace the title and content of an existing document.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ClientError`]; editing a document owned by a
    /// different credential is rejected by the backend.
    async fn update_document(
        &self,
        credential: &str,
        path: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError>;

    /// List every document owned by `credential`, in backend order.
    ///
    /// Implementations walk all listing pages; the result is the full set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidCredential`] if the token is unknown.
    async fn list_documents(&self, credential: &str) -> Result<Vec<DocumentSummary>, ClientError>;
}
