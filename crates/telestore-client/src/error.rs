//! Document client error types.
//!
//! The hosted service reports failures as string codes inside an `ok: false`
//! envelope. [`ClientError::from_code`] is the one place those codes become
//! typed variants; any code it does not know lands in
//! [`ClientError::Unrecognized`] so nothing is silently dropped.

/// Errors that can occur while talking to the document backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The access token was rejected (`ACCESS_TOKEN_INVALID`).
    #[error("backend rejected the access token")]
    InvalidCredential,

    /// The document content exceeds the backend's size limit (`CONTENT_TOO_BIG`).
    #[error("document content is too big for the backend")]
    PayloadTooLarge,

    /// The backend is throttling this caller (`TOO_MANY_REQUESTS`, `FLOOD_WAIT_<n>`).
    #[error("backend rate limit hit")]
    RateLimited {
        /// Seconds to wait, when the backend said so.
        retry_after_secs: Option<u64>,
    },

    /// A document already exists at the requested path (`PATH_ALREADY_EXISTS`).
    #[error("a document with this path already exists")]
    DuplicateTitle,

    /// The document title was empty (`TITLE_EMPTY`).
    #[error("document title is empty")]
    TitleEmpty,

    /// The document content was empty (`CONTENT_EMPTY`).
    #[error("document content is empty")]
    ContentEmpty,

    /// The account author name was too long (`AUTHOR_NAME_TOO_LONG`).
    #[error("author name is too long")]
    AuthorNameTooLong,

    /// The account author URL was rejected (`AUTHOR_URL_INVALID`).
    #[error("author URL is invalid")]
    AuthorUrlInvalid,

    /// The request was malformed (`INVALID_REQUEST`).
    #[error("backend rejected the request as malformed")]
    MalformedRequest,

    /// The backend failed internally (`INTERNAL_ERROR`).
    #[error("backend internal error")]
    BackendInternalError,

    /// The backend returned an error code this client does not know.
    #[error("backend error: {code}")]
    Unrecognized { code: String },

    /// The backend answered with a non-success HTTP status and no envelope.
    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    /// The request did not complete in time.
    #[error("backend request timed out")]
    Timeout,

    /// Network or HTTP client failure.
    #[cfg(feature = "http-client")]
    #[error("backend network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be parsed.
    #[error("backend response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The response envelope was well-formed JSON but structurally wrong.
    #[error("unexpected backend response: {reason}")]
    UnexpectedResponse { reason: String },
}

impl ClientError {
    /// Map a backend error code to its typed variant.
    ///
    /// Total over all strings: unknown codes become [`ClientError::Unrecognized`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "ACCESS_TOKEN_INVALID" => Self::InvalidCredential,
            "CONTENT_TOO_BIG" => Self::PayloadTooLarge,
            "TOO_MANY_REQUESTS" => Self::RateLimited {
                retry_after_secs: None,
            },
            "PATH_ALREADY_EXISTS" => Self::DuplicateTitle,
            "TITLE_EMPTY" => Self::TitleEmpty,
            "CONTENT_EMPTY" => Self::ContentEmpty,
            "AUTHOR_NAME_TOO_LONG" => Self::AuthorNameTooLong,
            "AUTHOR_URL_INVALID" => Self::AuthorUrlInvalid,
            "INVALID_REQUEST" => Self::MalformedRequest,
            "INTERNAL_ERROR" => Self::BackendInternalError,
            other => match other.strip_prefix("FLOOD_WAIT_") {
                Some(secs) => Self::RateLimited {
                    retry_after_secs: secs.parse().ok(),
                },
                None => Self::Unrecognized {
                    code: other.to_owned(),
                },
            },
        }
    }

    /// The backend error code behind this error, if it came from the backend.
    ///
    /// Transport-level failures (network, timeout, bad JSON) have no code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::InvalidCredential => Some("ACCESS_TOKEN_INVALID"),
            Self::PayloadTooLarge => Some("CONTENT_TOO_BIG"),
            Self::RateLimited { .. } => Some("TOO_MANY_REQUESTS"),
            Self::DuplicateTitle => Some("PATH_ALREADY_EXISTS"),
            Self::TitleEmpty => Some("TITLE_EMPTY"),
            Self::ContentEmpty => Some("CONTENT_EMPTY"),
            Self::AuthorNameTooLong => Some("AUTHOR_NAME_TOO_LONG"),
            Self::AuthorUrlInvalid => Some("AUTHOR_URL_INVALID"),
            Self::MalformedRequest => Some("INVALID_REQUEST"),
            Self::BackendInternalError => Some("INTERNAL_ERROR"),
            Self::Unrecognized { code } => Some(code),
            Self::Http { .. } | Self::Timeout | Self::Json(_) | Self::UnexpectedResponse { .. } => {
                None
            }
            #[cfg(feature = "http-client")]
            Self::Network(_) => None,
        }
    }
}
