//! `telestore` CLI: read and write JSON values kept as Telegraph pages.
//!
//! Each key is a page title owned by the configured account; values are
//! JSON passed through the configured cipher. The access token is persisted
//! in a state file and an account is registered on first use.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use telestore_client::HttpClient;
use telestore_core::{CREDENTIAL_KEY, CredentialHook, FileCredentialHook, Store};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{CipherKind, CliConfig};

/// telestore: a key-value store kept in Telegraph pages.
#[derive(Parser)]
#[command(
    name = "telestore",
    version,
    about = "telestore CLI: store JSON values as Telegraph pages",
    long_about = None,
    after_help = "Environment variables:\n  \
         TELESTORE_DOMAIN        Document service domain (default: telegra.ph)\n  \
         TELESTORE_TOKEN         Access token (overrides the state file)\n  \
         TELESTORE_CIPHER        identity | base64 | password (default: identity)\n  \
         TELESTORE_PASSWORD      Password for the password cipher\n  \
         TELESTORE_STATE_FILE    Credential file (default: ~/.telestore/state.json)\n  \
         TELESTORE_LOG_LEVEL     Log filter (default: warn)\n  \
         TELESTORE_LOG_FORMAT    Set to json for JSON log lines\n  \
         TELESTORE_TIMEOUT_SECS  Request timeout (default: 10)\n\n\
         Examples:\n  \
         telestore set zebra '{\"hello\":\"world\"}'\n  \
         telestore get zebra\n  \
         telestore list"
)]
struct Cli {
    /// Document service domain.
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Access token to use instead of the persisted one.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Value cipher.
    #[arg(long, global = true, value_enum)]
    cipher: Option<CipherKind>,

    /// Credential state file.
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every key owned by the account.
    List,
    /// Print the value stored under a key.
    Get {
        /// Key (page title).
        key: String,
        /// JSON printed when the key is missing, instead of failing.
        #[arg(long)]
        default: Option<String>,
    },
    /// Store a JSON value under a key, printing the page path.
    Set {
        /// Key (page title).
        key: String,
        /// JSON value.
        value: String,
        /// Store the value as a JSON string instead of parsing it.
        #[arg(long, default_value = "false")]
        string: bool,
    },
    /// Print the value of any page by its path, without a credential.
    #[command(name = "get-foreign")]
    GetForeign {
        /// Page path, e.g. `Sample-Page-12-15`.
        path: String,
    },
    /// Register a new account and save its credential.
    Register {
        /// Replace an already saved credential. Keys stored under the old
        /// one become unreachable.
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// Revoke the current credential and save its replacement.
    Rotate,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(domain) = &self.domain {
            config.domain.clone_from(domain);
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(cipher) = self.cipher {
            config.cipher = cipher;
        }
        if let Some(path) = &self.state_file {
            config.state_file.clone_from(path);
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);
    init_tracing(&config);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Commands, config: &CliConfig) -> Result<()> {
    let cipher = config.build_cipher()?;
    let client =
        HttpClient::with_config(config.client_config()).context("failed to build HTTP client")?;
    let store = Store::new(Arc::new(client), cipher);
    let hook = FileCredentialHook::new(&config.state_file);
    debug!(?config, "configuration loaded");

    match command {
        Commands::List => {
            authenticate(&store, config, &hook).await?;
            for title in store.list().await.context("failed to list keys")? {
                println!("{title}");
            }
        }
        Commands::Get { key, default } => {
            let fallback = default.map(|raw| parse_value(&raw, false)).transpose()?;
            authenticate(&store, config, &hook).await?;
            let value: Option<Value> = store
                .get(&key)
                .await
                .with_context(|| format!("failed to read '{key}'"))?;
            match value.or(fallback) {
                Some(value) => print_json(&value)?,
                None => bail!("no value stored under '{key}'"),
            }
        }
        Commands::Set { key, value, string } => {
            let value = parse_value(&value, string)?;
            authenticate(&store, config, &hook).await?;
            let path = store
                .set(&key, &value)
                .await
                .with_context(|| format!("failed to write '{key}'"))?;
            println!("{path}");
        }
        Commands::GetForeign { path } => {
            let value: Value = store
                .get_foreign(&path)
                .await
                .with_context(|| format!("failed to read page '{path}'"))?;
            print_json(&value)?;
        }
        Commands::Register { force } => {
            let saved = hook
                .load(CREDENTIAL_KEY)
                .await
                .context("failed to read saved credential")?;
            if saved.is_some() && !force {
                bail!(
                    "a credential is already saved in {}; pass --force to replace it \
                     (keys stored under it will become unreachable)",
                    hook.path().display()
                );
            }
            let credential = store
                .register()
                .await
                .context("failed to register account")?;
            hook.save(CREDENTIAL_KEY, &credential)
                .await
                .context("failed to save credential")?;
            eprintln!(
                "registered new account; credential saved to {}",
                hook.path().display()
            );
        }
        Commands::Rotate => {
            authenticate(&store, config, &hook).await?;
            store
                .rotate_credential(&hook)
                .await
                .context("failed to rotate credential")?;
            eprintln!(
                "credential rotated; saved to {}",
                hook.path().display()
            );
        }
    }
    Ok(())
}

/// Bind the explicit token if one is configured, otherwise load or register
/// through the state file.
async fn authenticate(store: &Store, config: &CliConfig, hook: &dyn CredentialHook) -> Result<()> {
    if let Some(token) = &config.token {
        store.bind(token.clone()).await;
        return Ok(());
    }
    store
        .init(hook)
        .await
        .context("failed to obtain a credential")?;
    Ok(())
}

fn parse_value(raw: &str, as_string: bool) -> Result<Value> {
    if as_string {
        return Ok(Value::String(raw.to_owned()));
    }
    serde_json::from_str(raw)
        .with_context(|| format!("'{raw}' is not valid JSON (use --string to store text)"))
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to format value")?
    );
    Ok(())
}
