//! CLI configuration.
//!
//! Loaded from `TELESTORE_*` environment variables with defaults; the global
//! command-line flags override individual settings afterwards.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use telestore_client::ClientConfig;
use telestore_core::{Base64Cipher, Cipher, IdentityCipher, PasswordCipher};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which value cipher to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CipherKind {
    /// Plain JSON.
    #[default]
    Identity,
    /// Base64-encoded JSON (obfuscation only).
    Base64,
    /// AES-256-GCM with a PBKDF2-derived key; needs `TELESTORE_PASSWORD`.
    Password,
}

/// Resolved CLI configuration.
#[derive(Clone)]
pub struct CliConfig {
    /// Document service domain (API host is `api.<domain>`).
    pub domain: String,
    /// Access token to use instead of the persisted one.
    pub token: Option<String>,
    /// Value cipher.
    pub cipher: CipherKind,
    /// Password for [`CipherKind::Password`].
    pub password: Option<String>,
    /// State file holding the persisted access token.
    pub state_file: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("domain", &self.domain)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("cipher", &self.cipher)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("state_file", &self.state_file)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TELESTORE_DOMAIN` (default: `telegra.ph`)
    /// - `TELESTORE_TOKEN` (optional)
    /// - `TELESTORE_CIPHER`: `identity`, `base64` or `password` (default: `identity`)
    /// - `TELESTORE_PASSWORD` (required for the `password` cipher)
    /// - `TELESTORE_STATE_FILE` (default: `$HOME/.telestore/state.json`)
    /// - `TELESTORE_LOG_LEVEL` (default: `warn`)
    /// - `TELESTORE_LOG_FORMAT`: `json` for JSON lines, anything else for text
    /// - `TELESTORE_TIMEOUT_SECS` (default: `10`)
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let cipher = match var("TELESTORE_CIPHER") {
            Some(name) => parse_cipher(&name).context("invalid TELESTORE_CIPHER")?,
            None => CipherKind::default(),
        };

        let timeout_secs = match var("TELESTORE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid TELESTORE_TIMEOUT_SECS: '{raw}'"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let state_file = var("TELESTORE_STATE_FILE").map_or_else(
            || {
                var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_default()
                    .join(".telestore")
                    .join("state.json")
            },
            PathBuf::from,
        );

        Ok(Self {
            domain: var("TELESTORE_DOMAIN").unwrap_or_else(|| "telegra.ph".to_owned()),
            token: var("TELESTORE_TOKEN"),
            cipher,
            password: var("TELESTORE_PASSWORD"),
            state_file,
            log_level: var("TELESTORE_LOG_LEVEL").unwrap_or_else(|| "warn".to_owned()),
            json_logs: var("TELESTORE_LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Settings for the HTTP document client.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            domain: self.domain.clone(),
            timeout: self.timeout,
            ..ClientConfig::default()
        }
    }

    /// Build the configured cipher.
    ///
    /// # Errors
    ///
    /// Returns an error if the password cipher is selected without a password.
    pub fn build_cipher(&self) -> Result<Arc<dyn Cipher>> {
        Ok(match self.cipher {
            CipherKind::Identity => Arc::new(IdentityCipher),
            CipherKind::Base64 => Arc::new(Base64Cipher),
            CipherKind::Password => {
                let Some(password) = self.password.as_deref() else {
                    bail!("the password cipher needs TELESTORE_PASSWORD to be set");
                };
                Arc::new(PasswordCipher::new(password))
            }
        })
    }
}

fn parse_cipher(name: &str) -> Result<CipherKind> {
    match <CipherKind as ValueEnum>::from_str(name.trim(), true) {
        Ok(kind) => Ok(kind),
        Err(_) => bail!("unknown cipher '{name}' (expected identity, base64 or password)"),
    }
}
