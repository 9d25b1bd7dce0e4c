//! Telegraph API client over HTTPS.
//!
//! Every API method is a `POST https://api.<domain>/<method>[/<path>]` with
//! form-encoded parameters; content trees travel as a JSON string parameter.
//! Responses are `{"ok": true, "result": ...}` or `{"ok": false, "error": CODE}`.
//!
//! Transport failures (connection errors, timeouts, 5xx) on read-only calls
//! are retried with backoff. Account and page creation are sent once, since
//! a retried create could leave a second document behind. Backend error
//! codes are never retried here.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::DocumentList;
use crate::{Account, ClientError, Document, DocumentClient, DocumentSummary, Node};

const DEFAULT_DOMAIN: &str = "telegra.ph";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 2;
/// The service caps `getPageList` at 200 entries per call.
const MAX_PAGE_SIZE: u32 = 200;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API domain. Default: `telegra.ph` (mirrors such as `graph.org` work too).
    pub domain: String,
    /// Request timeout. Default: 10 seconds.
    pub timeout: Duration,
    /// Retries for read-only calls on transport failure. Default: 2.
    pub max_retries: u32,
    /// Entries per listing request, capped at 200. Default: 200.
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Whether a call may be safely repeated after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Idempotent,
    Once,
}

impl Retry {
    /// Reads and full-replacement edits repeat safely; anything that creates
    /// an account, a page or a token is sent once.
    fn for_method(method: &str) -> Self {
        match method {
            "getPage" | "getPageList" | "editPage" => Self::Idempotent,
            _ => Self::Once,
        }
    }

    /// Total attempts, the first one included.
    fn attempts(self, max_retries: u32) -> u32 {
        match self {
            Self::Idempotent => max_retries.saturating_add(1),
            Self::Once => 1,
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

/// A [`DocumentClient`] backed by the Telegraph HTTP API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    max_retries: u32,
    page_size: u32,
    http: reqwest::Client,
}

impl HttpClient {
    /// Create a client for `telegra.ph` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with full configuration. An empty domain, a zero
    /// timeout or a zero page size fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: ClientConfig) -> Result<Self, ClientError> {
        let domain = if cfg.domain.trim().is_empty() {
            DEFAULT_DOMAIN
        } else {
            cfg.domain.trim().trim_end_matches('/')
        };

        let timeout = if cfg.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            cfg.timeout
        };

        let page_size = if cfg.page_size == 0 {
            MAX_PAGE_SIZE
        } else {
            cfg.page_size.min(MAX_PAGE_SIZE)
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("telestore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: format!("https://api.{domain}"),
            max_retries: cfg.max_retries,
            page_size,
            http,
        })
    }

    fn url(&self, method: &str, path: Option<&str>) -> String {
        match path {
            Some(path) => format!("{}/{method}/{}", self.base_url, path.trim_matches('/')),
            None => format!("{}/{method}", self.base_url),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        path: Option<&str>,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(method, path);
        let attempts = Retry::for_method(method).attempts(self.max_retries);
        let mut last_err = None;

        for attempt in 0..attempts {
            let retry_left = attempt + 1 < attempts;
            debug!(method, attempt, "backend request");
            match self.http.post(&url).form(params).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await?;

                    if status.is_success() {
                        return decode_envelope(&text);
                    }

                    // Error envelopes can also arrive with a failure status.
                    let code = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                        .ok()
                        .and_then(|envelope| envelope.error);
                    if let Some(code) = code {
                        return Err(ClientError::from_code(&code));
                    }

                    last_err = Some(ClientError::Http {
                        status: status.as_u16(),
                    });
                    if retry_left && is_retryable(status) {
                        tokio::time::sleep(backoff(attempt, jitter())).await;
                        continue;
                    }
                }
                Err(e) => {
                    last_err = Some(if e.is_timeout() {
                        ClientError::Timeout
                    } else {
                        ClientError::Network(e)
                    });
                    if retry_left {
                        tokio::time::sleep(backoff(attempt, jitter())).await;
                        continue;
                    }
                }
            }

            break;
        }

        Err(last_err.unwrap_or(ClientError::UnexpectedResponse {
            reason: "no response received".to_owned(),
        }))
    }
}

#[async_trait::async_trait]
impl DocumentClient for HttpClient {
    async fn create_account(&self, short_name: &str) -> Result<Account, ClientError> {
        let params = [("short_name", short_name.to_owned())];
        self.call("createAccount", None, &params).await
    }

    async fn revoke_credential(&self, credential: &str) -> Result<Account, ClientError> {
        let params = [("access_token", credential.to_owned())];
        self.call("revokeAccessToken", None, &params).await
    }

    async fn create_document(
        &self,
        credential: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError> {
        let params = [
            ("access_token", credential.to_owned()),
            ("title", title.to_owned()),
            ("content", serde_json::to_string(content)?),
        ];
        self.call("createPage", None, &params).await
    }

    async fn fetch_document(&self, path: &str) -> Result<Document, ClientError> {
        let params = [("return_content", "true".to_owned())];
        self.call("getPage", Some(path), &params).await
    }

    async fn update_document(
        &self,
        credential: &str,
        path: &str,
        title: &str,
        content: &[Node],
    ) -> Result<Document, ClientError> {
        let params = [
            ("access_token", credential.to_owned()),
            ("title", title.to_owned()),
            ("content", serde_json::to_string(content)?),
        ];
        self.call("editPage", Some(path), &params).await
    }

    async fn list_documents(&self, credential: &str) -> Result<Vec<DocumentSummary>, ClientError> {
        let client = self;
        let limit = self.page_size.to_string();
        let documents = walk_listing(move |offset| {
            let params = [
                ("access_token", credential.to_owned()),
                ("offset", offset.to_string()),
                ("limit", limit.clone()),
            ];
            async move { client.call("getPageList", None, &params).await }
        })
        .await?;

        debug!(documents = documents.len(), "listed documents");
        Ok(documents)
    }
}

/// Collect a paginated listing from offset 0.
///
/// `fetch_page` gets the offset to read from. The walk ends when the offset
/// reaches the `total_count` of the latest page or a page comes back empty.
async fn walk_listing<F, Fut>(mut fetch_page: F) -> Result<Vec<DocumentSummary>, ClientError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<DocumentList, ClientError>>,
{
    let mut documents = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let page = fetch_page(offset).await?;
        let fetched = page.pages.len() as u64;
        documents.extend(page.pages);
        offset = offset.saturating_add(fetched);

        if fetched == 0 || offset >= page.total_count {
            return Ok(documents);
        }
    }
}

/// Decode an API envelope into its result, mapping `ok: false` to a typed error.
fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    if envelope.ok {
        envelope.result.ok_or_else(|| ClientError::UnexpectedResponse {
            reason: "ok response without a result".to_owned(),
        })
    } else {
        Err(ClientError::from_code(
            envelope.error.as_deref().unwrap_or("UNKNOWN_ERROR"),
        ))
    }
}

/// Rate limiting and server-side failures; client errors will not improve.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before the retry that follows `attempt`: the base delay doubled per
/// attempt, stretched by up to 30% with `jitter` in `[0, 1]`.
fn backoff(attempt: u32, jitter: f64) -> Duration {
    // A large max_retries must not overflow the shift.
    let doubled = RETRY_BASE_DELAY.saturating_mul(1 << attempt.min(6));
    doubled.mul_f64(1.0 + 0.3 * jitter.clamp(0.0, 1.0))
}

/// A value in `[0, 1]` that differs between calls and processes.
fn jitter() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let bits = RandomState::new().hash_one(std::time::Instant::now()) >> 32;
    f64::from(u32::try_from(bits).unwrap_or(u32::MAX)) / f64::from(u32::MAX)
}
