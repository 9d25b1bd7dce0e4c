//! In-memory document backend for testing.
//!
//! Behaves like the hosted service where the store can observe it: titles
//! are not unique, documents are readable by path without a token, edits
//! require the owning token, and empty titles or content are rejected. All
//! data is lost when the process exits.
//!
//! Every call is counted per operation so tests can assert how many remote
//! round-trips (and writes in particular) an operation performed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{Account, ClientError, Document, DocumentClient, DocumentSummary, Node};

/// Serialized content above this many bytes is rejected with `CONTENT_TOO_BIG`.
const MAX_CONTENT_BYTES: usize = 64 * 1024;

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create_account: usize,
    pub revoke_credential: usize,
    pub create_document: usize,
    pub fetch_document: usize,
    pub update_document: usize,
    pub list_documents: usize,
}

impl CallCounts {
    /// Calls that mutate documents.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.create_document + self.update_document
    }

    /// Every call of any kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.create_account
            + self.revoke_credential
            + self.create_document
            + self.fetch_document
            + self.update_document
            + self.list_documents
    }
}

#[derive(Debug)]
struct StoredDocument {
    owner: String,
    title: String,
    content: Vec<Node>,
}

#[derive(Debug, Default)]
struct State {
    /// access token -> short name
    accounts: HashMap<String, String>,
    documents: HashMap<String, StoredDocument>,
    /// Creation order; listing returns newest first like the hosted service.
    order: Vec<String>,
    next_id: u64,
    calls: CallCounts,
    /// Remaining successful calls before failing, and the code to fail with.
    failure: Option<(usize, String)>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    fn take_failure(&mut self) -> Result<(), ClientError> {
        match self.failure.take() {
            Some((0, code)) => Err(ClientError::from_code(&code)),
            Some((remaining, code)) => {
                self.failure = Some((remaining - 1, code));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn require_account(&self, credential: &str) -> Result<(), ClientError> {
        if self.accounts.contains_key(credential) {
            Ok(())
        } else {
            Err(ClientError::InvalidCredential)
        }
    }

    fn document(&self, path: &str) -> Result<Document, ClientError> {
        let stored = self
            .documents
            .get(path)
            .ok_or_else(|| ClientError::from_code("PAGE_NOT_FOUND"))?;
        Ok(to_document(path, stored))
    }
}

/// An in-memory [`DocumentClient`].
///
/// Cloning shares state, so a test can keep a handle for inspection while
/// the store owns another.
///
/// # Examples
///
/// ```
/// # use telestore_client::{DocumentClient, MemoryClient, Node};
/// # #[tokio::main]
/// # async fn main() {
/// let client = MemoryClient::new();
/// let account = client.create_account("demo").await.unwrap();
/// let token = account.access_token.unwrap();
/// let doc = client
///     .create_document(&token, "hello", &[Node::text("world")])
///     .await
///     .unwrap();
/// assert_eq!(client.fetch_document(&doc.path).await.unwrap().title, "hello");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    state: Arc<RwLock<State>>,
}

impl MemoryClient {
    /// Create an empty backend with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the call counters.
    pub async fn calls(&self) -> CallCounts {
        self.state.read().await.calls
    }

    /// Zero the call counters.
    pub async fn reset_calls(&self) {
        self.state.write().await.calls = CallCounts::default();
    }

    /// Make the next call of any kind fail with the given backend code.
    pub async fn fail_next(&self, code: &str) {
        self.fail_after(0, code).await;
    }

    /// Let `calls` more calls succeed, then fail the one after with `code`.
    /// The failure fires once.
    pub async fn fail_after(&self, calls: usize, code: &str) {
        self.state.write().await.failure = Some((calls, code.to_owned()));
    }

    /// Number of documents titled `title` owned by `credential`.
    pub async fn count_titled(&self, credential: &str, title: &str) -> usize {
        let state = self.state.read().await;
        state
            .documents
            .values()
            .filter(|d| d.owner == credential && d.title == title)
            .count()
    }
}

#[async_trait::async_trait]
impl DocumentClient for MemoryClient {
    async fn create_account(&self, short_name: &str) -> Result<Account, ClientError> {
        let mut state = self.state.write().await;
        state.calls.create_account += 1;
        state.take_failure()?;

        let token = format!("mem-token-{:08}", state.next_id());
        state.accounts.insert(token.clone(), short_name.to_owned());
        Ok(account(short_name, token))
    }

    async fn revoke_credential(&self, credential: &str) -> Result<Account, ClientError> {
        let mut state = self.state.write().await;
        state.calls.revoke_credential += 1;
        state.take_failure()?;

        let short_name = state
            .accounts
            .remove(credential)
            .ok_or(ClientError::InvalidCredential)?;
        let token = format!("mem-token-{:08}", state.next_id());
        state.accounts.insert(token.clone(), short_name.clone());
        for doc in state.documents.values_mut() {
            if doc.owner == credential {
                token.clone_into(&mut doc.owner);
            }
        }
        Ok(account(&short_name, token))
    }

    async fn create_document(
        &self,
        credential: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError> {
        let mut state = self.state.write().await;
        state.calls.create_document += 1;
        state.take_failure()?;
        state.require_account(credential)?;
        validate(title, content)?;

        let path = format!("{}-{}", slug(title), state.next_id());
        state.documents.insert(
            path.clone(),
            StoredDocument {
                owner: credential.to_owned(),
                title: title.to_owned(),
                content: content.to_vec(),
            },
        );
        state.order.push(path.clone());
        state.document(&path)
    }

    async fn fetch_document(&self, path: &str) -> Result<Document, ClientError> {
        let mut state = self.state.write().await;
        state.calls.fetch_document += 1;
        state.take_failure()?;
        state.document(path)
    }

    async fn update_document(
        &self,
        credential: &str,
        path: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError> {
        let mut state = self.state.write().await;
        state.calls.update_document += 1;
        state.take_failure()?;
        state.require_account(credential)?;
        validate(title, content)?;

        let stored = state
            .documents
            .get_mut(path)
            .ok_or_else(|| ClientError::from_code("PAGE_NOT_FOUND"))?;
        if stored.owner != credential {
            return Err(ClientError::from_code("PAGE_ACCESS_DENIED"));
        }
        title.clone_into(&mut stored.title);
        stored.content = content.to_vec();
        state.document(path)
    }

    async fn list_documents(&self, credential: &str) -> Result<Vec<DocumentSummary>, ClientError> {
        let mut state = self.state.write().await;
        state.calls.list_documents += 1;
        state.take_failure()?;
        state.require_account(credential)?;

        let listing = state
            .order
            .iter()
            .rev()
            .filter_map(|path| {
                state
                    .documents
                    .get(path)
                    .filter(|d| d.owner == credential)
                    .map(|d| DocumentSummary {
                        path: path.clone(),
                        title: d.title.clone(),
                    })
            })
            .collect();
        Ok(listing)
    }
}

fn account(short_name: &str, token: String) -> Account {
    Account {
        short_name: short_name.to_owned(),
        author_name: String::new(),
        author_url: String::new(),
        access_token: Some(token),
        auth_url: None,
    }
}

fn to_document(path: &str, stored: &StoredDocument) -> Document {
    Document {
        path: path.to_owned(),
        url: format!("memory://{path}"),
        title: stored.title.clone(),
        description: String::new(),
        content: Some(stored.content.clone()),
    }
}

fn validate(title: &str, content: &[Node]) -> Result<(), ClientError> {
    if title.trim().is_empty() {
        return Err(ClientError::TitleEmpty);
    }
    if content.is_empty() {
        return Err(ClientError::ContentEmpty);
    }
    let size = serde_json::to_vec(content)?.len();
    if size > MAX_CONTENT_BYTES {
        return Err(ClientError::PayloadTooLarge);
    }
    Ok(())
}

/// Path prefix derived from a title, like the hosted service does.
fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .take(64)
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "page".to_owned()
    } else {
        slug.to_owned()
    }
}
