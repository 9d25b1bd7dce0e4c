//! Payload codec: value → JSON → cipher → document content, and back.
//!
//! The stored shape is one `p` element holding one text child:
//! `[{"tag":"p","children":["<payload>"]}]`. This layout is the on-backend
//! format and must stay readable across versions.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use telestore_client::Node;

use crate::cipher::Cipher;
use crate::error::{CipherError, DecodeFailure, StoreError};

/// Maximum payload length after cipher encoding, in UTF-16 code units.
pub const DATA_LENGTH_LIMIT: usize = 65_500;

const PAYLOAD_TAG: &str = "p";

/// Length of an encoded payload as the size ceiling measures it.
///
/// Identical to the byte length for the ASCII output of the base64 and
/// password ciphers.
#[must_use]
pub fn payload_len(payload: &str) -> usize {
    payload.encode_utf16().count()
}

/// Wrap an encoded payload into document content.
#[must_use]
pub fn wrap(payload: String) -> Vec<Node> {
    vec![Node::element(PAYLOAD_TAG, vec![Node::Text(payload)])]
}

/// Find the payload in document content.
///
/// Takes the first node whose first child is non-empty and returns that
/// child if it is text. The wrapping tag is not checked.
#[must_use]
pub fn extract_payload(content: &[Node]) -> Option<&str> {
    content
        .iter()
        .find_map(|node| {
            node.children()
                .first()
                .filter(|child| !matches!(child, Node::Text(text) if text.is_empty()))
        })
        .and_then(Node::as_text)
}

/// Encode a value for storage under `key`, enforcing [`DATA_LENGTH_LIMIT`].
///
/// The cipher runs on the blocking pool: password-based ciphers spend a slow
/// key derivation on every call.
pub(crate) async fn encode<T: Serialize + ?Sized>(
    cipher: &Arc<dyn Cipher>,
    key: &str,
    value: &T,
) -> Result<Vec<Node>, StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Encode {
        key: key.to_owned(),
        reason: e.to_string(),
    })?;

    let cipher = Arc::clone(cipher);
    let payload = tokio::task::spawn_blocking(move || cipher.encrypt(&json))
        .await
        .map_err(|e| StoreError::Encode {
            key: key.to_owned(),
            reason: format!("cipher task failed: {e}"),
        })?
        .map_err(|e| StoreError::Encode {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;

    let length = payload_len(&payload);
    if length > DATA_LENGTH_LIMIT {
        return Err(StoreError::DataTooLong {
            key: key.to_owned(),
            length,
            limit: DATA_LENGTH_LIMIT,
        });
    }
    Ok(wrap(payload))
}

/// Decode document content read for `context` (a key or a path).
///
/// Decryption runs on the blocking pool, like [`encode`].
pub(crate) async fn decode<T: DeserializeOwned>(
    cipher: &Arc<dyn Cipher>,
    context: &str,
    content: &[Node],
) -> Result<T, StoreError> {
    let payload = extract_payload(content)
        .ok_or_else(|| StoreError::decode(context, DecodeFailure::MissingPayload))?
        .to_owned();

    let cipher = Arc::clone(cipher);
    let json = tokio::task::spawn_blocking(move || cipher.decrypt(&payload))
        .await
        .map_err(|e| {
            StoreError::decode(
                context,
                CipherError::Decode {
                    reason: format!("cipher task failed: {e}"),
                },
            )
        })?
        .map_err(|e| StoreError::decode(context, e))?;
    serde_json::from_str(&json).map_err(|e| StoreError::decode(context, e))
}
