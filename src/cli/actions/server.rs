use crate::{
    cli::telemetry,
    enrol::{
        self,
        keys::public_key_from_pem,
        oauth::OAuthConfig,
        provider::{Provider, RetryPolicy},
        session::CookieConfig,
        state::AppState,
        store::{KeyStrategy, MemoryStore, PostgresStore, RegistrationStore},
    },
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub private_key: SecretString,
    pub dsn: Option<String>,
    pub client_id: String,
    pub client_secret: SecretString,
    pub oauth_base_url: String,
    pub api_base_url: String,
    pub provider_timeout: Duration,
    pub retry: RetryPolicy,
    pub key_strategy: KeyStrategy,
    pub cookie: CookieConfig,
    pub assets_dir: Option<PathBuf>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the private key is invalid, the provider URLs or DSN
/// cannot be parsed, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let public_key = public_key_from_pem(args.private_key.expose_secret().as_bytes())
        .context("Failed to load private key")?;

    let provider = Provider::new(
        &args.oauth_base_url,
        &args.api_base_url,
        args.provider_timeout,
        args.retry,
    )
    .context("Failed to configure identity provider")?;

    let store: Arc<dyn RegistrationStore> = match &args.dsn {
        Some(dsn) => Arc::new(PostgresStore::connect_lazy(dsn).context("Invalid database DSN")?),
        None => {
            warn!("No DSN configured, registrations are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if args.client_id.trim().is_empty() {
        warn!("No GitHub client id configured, /auth/start will fail");
    }

    let state = Arc::new(AppState {
        public_key,
        oauth: OAuthConfig::new(args.client_id, args.client_secret),
        provider,
        store,
        cookie: args.cookie,
        key_strategy: args.key_strategy,
    });

    let result = enrol::new(args.port, state, args.assets_dir).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_deref()
                .map_or_else(|| "none (memory)".to_string(), redact_dsn),
        ),
        ("gh_client_id", args.client_id.clone()),
        (
            "gh_secret_set",
            (!args.client_secret.expose_secret().is_empty()).to_string(),
        ),
        ("oauth_base_url", args.oauth_base_url.clone()),
        ("api_base_url", args.api_base_url.clone()),
        (
            "provider_timeout",
            format!("{}s", args.provider_timeout.as_secs()),
        ),
        (
            "provider_retries",
            format!(
                "{} (backoff {}ms)",
                args.retry.retries,
                args.retry.backoff.as_millis()
            ),
        ),
        ("registration_key", format!("{:?}", args.key_strategy)),
        ("cookie", format!("{:?}", args.cookie)),
        (
            "assets_dir",
            args.assets_dir
                .as_ref()
                .map_or_else(|| "none".to_string(), |dir| dir.display().to_string()),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", enrol_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn enrol_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    ENROL_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const ENROL_BANNER: &str = r"
    .---.
   /  o  \
  |  -+-  |   E N R O L {VERSION}
   \  |  /
    '---'";
