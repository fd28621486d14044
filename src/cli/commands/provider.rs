use crate::enrol::provider::{DEFAULT_API_BASE_URL, DEFAULT_OAUTH_BASE_URL};
use clap::{Arg, Command};

pub const ARG_GH_CLIENT_ID: &str = "gh-client-id";
pub const ARG_GH_SECRET: &str = "gh-secret";
pub const ARG_OAUTH_BASE_URL: &str = "oauth-base-url";
pub const ARG_API_BASE_URL: &str = "api-base-url";
pub const ARG_PROVIDER_TIMEOUT_SECONDS: &str = "provider-timeout-seconds";
pub const ARG_PROVIDER_RETRIES: &str = "provider-retries";
pub const ARG_PROVIDER_BACKOFF_MS: &str = "provider-backoff-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GH_CLIENT_ID)
                .long(ARG_GH_CLIENT_ID)
                .help("GitHub OAuth application client id")
                .env("ENROL_GH_CLIENT_ID")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_GH_SECRET)
                .long(ARG_GH_SECRET)
                .help("GitHub OAuth application client secret")
                .env("ENROL_GH_SECRET")
                .hide_env_values(true)
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_OAUTH_BASE_URL)
                .long(ARG_OAUTH_BASE_URL)
                .help("Base URL for the authorize and token endpoints")
                .env("ENROL_OAUTH_BASE_URL")
                .default_value(DEFAULT_OAUTH_BASE_URL),
        )
        .arg(
            Arg::new(ARG_API_BASE_URL)
                .long(ARG_API_BASE_URL)
                .help("Base URL for the user API")
                .env("ENROL_API_BASE_URL")
                .default_value(DEFAULT_API_BASE_URL),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT_SECONDS)
                .long(ARG_PROVIDER_TIMEOUT_SECONDS)
                .help("Timeout for each outbound provider request")
                .env("ENROL_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PROVIDER_RETRIES)
                .long(ARG_PROVIDER_RETRIES)
                .help("Retries for transient provider failures")
                .env("ENROL_PROVIDER_RETRIES")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_PROVIDER_BACKOFF_MS)
                .long(ARG_PROVIDER_BACKOFF_MS)
                .help("Initial retry backoff in milliseconds, doubled on each retry")
                .env("ENROL_PROVIDER_BACKOFF_MS")
                .default_value("250")
                .value_parser(clap::value_parser!(u64)),
        )
}
