//! Pluggable at-rest ciphers for stored payloads.
//!
//! A [`Cipher`] turns the JSON text of a value into the text that is written
//! into a document, and back. Three variants are provided:
//!
//! - [`IdentityCipher`]: no transformation.
//! - [`Base64Cipher`]: transport-safe encoding of the UTF-8 bytes, no secrecy.
//! - [`PasswordCipher`]: PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM.
//!
//! # Password envelope
//!
//! `PasswordCipher` output is self-contained: base64 of a JSON object
//! `{"ciphertext": b64, "iv": b64, "salt": b64}`. Salt (16 bytes) and nonce
//! (12 bytes) are fresh per call, so two encryptions of the same input
//! differ. The ciphertext includes the 16-byte GCM tag. The envelope is
//! roughly 1.8x the plaintext length plus ~110 characters, which counts
//! against the per-document size ceiling.

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CipherError;

/// PBKDF2 iteration count used by [`PasswordCipher::new`].
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A reversible text transformation applied to every stored payload.
///
/// `decrypt(encrypt(x)) == x` for every accepted `x`. Implementations may be
/// randomized per call. Ciphers are shared across stores and tasks.
pub trait Cipher: Send + Sync {
    /// Short name for logs and configuration.
    fn name(&self) -> &'static str;

    /// Encode plaintext for storage.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encoding`] if the input cannot be encoded.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decode stored text back to plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decode`] for malformed input and
    /// [`CipherError::Authentication`] when an authenticated cipher rejects it.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Stores payloads as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCipher;

impl Cipher for IdentityCipher {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(plaintext.to_owned())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        Ok(ciphertext.to_owned())
    }
}

/// Standard padded base64 over the UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Cipher;

impl Cipher for Base64Cipher {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(STANDARD.encode(plaintext.as_bytes()))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let bytes = decode_b64(ciphertext, "payload")?;
        utf8(bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    ciphertext: String,
    iv: String,
    salt: String,
}

/// Password-derived authenticated encryption.
///
/// The password is zeroized on drop and never shown in `Debug` output.
#[derive(Clone)]
pub struct PasswordCipher {
    password: Zeroizing<String>,
    iterations: u32,
}

impl PasswordCipher {
    /// Create a cipher using [`PBKDF2_ITERATIONS`] rounds.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_iterations(password, PBKDF2_ITERATIONS)
    }

    /// Create a cipher with a custom PBKDF2 round count (at least 1).
    ///
    /// Both sides of an exchange must agree on the count; it is not stored
    /// in the envelope.
    #[must_use]
    pub fn with_iterations(password: impl Into<String>, iterations: u32) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
            iterations: iterations.max(1),
        }
    }

    fn derive_key(&self, salt: &[u8]) -> Zeroizing<[u8; 32]> {
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2::pbkdf2_hmac::<Sha256>(
            self.password.as_bytes(),
            salt,
            self.iterations,
            key.as_mut_slice(),
        );
        key
    }
}

impl fmt::Debug for PasswordCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCipher")
            .field("password", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl Cipher for PasswordCipher {
    fn name(&self) -> &'static str {
        "password"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = self.derive_key(&salt);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext =
            cipher
                .encrypt(&nonce, plaintext.as_bytes())
                .map_err(|e| CipherError::Encoding {
                    reason: e.to_string(),
                })?;

        let envelope = Envelope {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce),
            salt: STANDARD.encode(salt),
        };
        let json = serde_json::to_string(&envelope).map_err(|e| CipherError::Encoding {
            reason: e.to_string(),
        })?;
        Ok(STANDARD.encode(json))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let json = decode_b64(ciphertext, "envelope")?;
        let envelope: Envelope =
            serde_json::from_slice(&json).map_err(|e| CipherError::Decode {
                reason: format!("envelope is not valid JSON: {e}"),
            })?;

        let salt = decode_b64(&envelope.salt, "salt")?;
        let nonce = decode_b64(&envelope.iv, "iv")?;
        let sealed = decode_b64(&envelope.ciphertext, "ciphertext")?;

        if nonce.len() != NONCE_LEN {
            return Err(CipherError::Decode {
                reason: format!("iv must be {NONCE_LEN} bytes, got {}", nonce.len()),
            });
        }
        if sealed.len() < TAG_LEN {
            return Err(CipherError::Decode {
                reason: format!(
                    "ciphertext too short: expected at least {TAG_LEN} bytes, got {}",
                    sealed.len()
                ),
            });
        }

        let key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| CipherError::Authentication)?;
        utf8(plaintext)
    }
}

fn decode_b64(text: &str, what: &str) -> Result<Vec<u8>, CipherError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| CipherError::Decode {
            reason: format!("{what} is not valid base64: {e}"),
        })
}

fn utf8(bytes: Vec<u8>) -> Result<String, CipherError> {
    String::from_utf8(bytes).map_err(|e| CipherError::Decode {
        reason: format!("plaintext is not UTF-8: {e}"),
    })
}
