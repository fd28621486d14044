use crate::cli::{
    actions::{server::Args, Action},
    commands::{cookie, provider, CMD_KEYGEN},
};
use crate::enrol::{
    provider::RetryPolicy,
    session::{CookieConfig, SameSite},
    store::KeyStrategy,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if matches.subcommand_name() == Some(CMD_KEYGEN) {
        return Ok(Action::Keygen);
    }

    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let private_key = matches
        .get_one::<String>("private-key")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --private-key")?;

    let dsn = matches.get_one::<String>("dsn").cloned();

    let key_strategy = matches
        .get_one::<String>("registration-key")
        .map_or(Ok(KeyStrategy::default()), |value| value.parse())
        .map_err(|e| anyhow!(e))?;

    let string_arg = |id: &str| matches.get_one::<String>(id).cloned().unwrap_or_default();

    let retry = RetryPolicy {
        retries: matches
            .get_one::<u32>(provider::ARG_PROVIDER_RETRIES)
            .copied()
            .unwrap_or(2),
        backoff: Duration::from_millis(
            matches
                .get_one::<u64>(provider::ARG_PROVIDER_BACKOFF_MS)
                .copied()
                .unwrap_or(250),
        ),
    };

    let same_site = matches
        .get_one::<String>(cookie::ARG_COOKIE_SAME_SITE)
        .map_or(Ok(SameSite::default()), |value| value.parse::<SameSite>())
        .map_err(|e| anyhow!(e))?;

    let cookie = CookieConfig::default()
        .with_secure(
            matches
                .get_one::<bool>(cookie::ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
        )
        .with_http_only(
            matches
                .get_one::<bool>(cookie::ARG_COOKIE_HTTP_ONLY)
                .copied()
                .unwrap_or(true),
        )
        .with_same_site(same_site)
        .with_max_age_seconds(
            matches
                .get_one::<u64>(cookie::ARG_COOKIE_MAX_AGE_SECONDS)
                .copied(),
        );

    Ok(Action::Server(Args {
        port,
        private_key,
        dsn,
        client_id: string_arg(provider::ARG_GH_CLIENT_ID),
        client_secret: SecretString::from(string_arg(provider::ARG_GH_SECRET)),
        oauth_base_url: string_arg(provider::ARG_OAUTH_BASE_URL),
        api_base_url: string_arg(provider::ARG_API_BASE_URL),
        provider_timeout: Duration::from_secs(
            matches
                .get_one::<u64>(provider::ARG_PROVIDER_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        ),
        retry,
        key_strategy,
        cookie,
        assets_dir: matches.get_one::<PathBuf>("assets-dir").cloned(),
    }))
}
