//! Authorization-code flow against the identity provider.
//!
//! A login moves `Idle -> AwaitingCode` when the caller is redirected to the
//! provider, and `AwaitingCode -> Authenticated` once the callback's code has
//! been exchanged for a credential. Any failure ends in `Failed`. No state is
//! kept between the two requests; the transitions are only recorded in logs.

use super::{error::Error, provider::Provider};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;
use utoipa::IntoParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingCode,
    Authenticated,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::AwaitingCode => "awaiting_code",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        })
    }
}

/// OAuth application credentials.
#[derive(Clone)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: SecretString,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.trim()
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id())
            .finish_non_exhaustive()
    }
}

/// Query parameters the provider appends when redirecting back.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Single-use authorization code.
    pub code: Option<String>,
    /// Set by the provider when the user denied access or the request was invalid.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn fail(err: Error) -> Error {
    warn!(state = %FlowState::Failed, "OAuth flow failed: {err}");
    err
}

/// Authorization URL for a new login.
///
/// # Errors
/// Returns `Error::Config` if no client id is configured.
pub fn start(config: &OAuthConfig, provider: &Provider) -> Result<Url, Error> {
    if config.client_id().is_empty() {
        return Err(fail(Error::Config("Missing client ID")));
    }

    debug!(from = %FlowState::Idle, to = %FlowState::AwaitingCode, "Redirecting to provider");

    Ok(provider.authorize_url(config.client_id()))
}

/// Finish a login by exchanging the callback's code for a credential.
///
/// # Errors
/// Returns `Error::OAuthDenied` when the provider reported an error,
/// `Error::Client` when no code was supplied, and `Error::Provider` when the
/// exchange fails.
pub async fn callback(
    config: &OAuthConfig,
    provider: &Provider,
    query: CallbackQuery,
) -> Result<SecretString, Error> {
    // an empty `error=` reports nothing
    if let Some(error) = query.error.filter(|error| !error.is_empty()) {
        let description = query
            .error_description
            .filter(|description| !description.is_empty())
            .unwrap_or(error);
        return Err(fail(Error::OAuthDenied(description)));
    }

    let code = match query.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(fail(Error::Client("Missing code"))),
    };

    let credential = provider
        .exchange_code(&code, config.client_id(), &config.client_secret)
        .await
        .map_err(|err| fail(err.into()))?;

    info!(from = %FlowState::AwaitingCode, to = %FlowState::Authenticated, "OAuth login completed");

    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrol::provider::{RetryPolicy, DEFAULT_API_BASE_URL, DEFAULT_OAUTH_BASE_URL};
    use anyhow::{bail, Result};
    use std::time::Duration;

    fn provider() -> Result<Provider> {
        Ok(Provider::new(
            DEFAULT_OAUTH_BASE_URL,
            DEFAULT_API_BASE_URL,
            Duration::from_secs(1),
            RetryPolicy::default(),
        )?)
    }

    #[test]
    fn start_requires_client_id() -> Result<()> {
        let config = OAuthConfig::new("   ", SecretString::from("s".to_string()));
        match start(&config, &provider()?) {
            Err(Error::Config(message)) => assert_eq!(message, "Missing client ID"),
            other => bail!("expected Config error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn start_builds_authorize_url() -> Result<()> {
        let config = OAuthConfig::new("cid", SecretString::from("s".to_string()));
        let url = start(&config, &provider()?)?;
        assert_eq!(url.path(), "/login/oauth/authorize");
        assert_eq!(
            url.query(),
            Some("client_id=cid&scope=notifications")
        );
        Ok(())
    }

    #[tokio::test]
    async fn callback_prefers_error_description() -> Result<()> {
        let config = OAuthConfig::new("cid", SecretString::from("s".to_string()));
        let query = CallbackQuery {
            code: Some("abc".to_string()),
            error: Some("access_denied".to_string()),
            error_description: Some("denied".to_string()),
        };
        match callback(&config, &provider()?, query).await {
            Err(Error::OAuthDenied(description)) => assert_eq!(description, "denied"),
            other => bail!("expected OAuthDenied, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn callback_falls_back_to_error_code() -> Result<()> {
        let config = OAuthConfig::new("cid", SecretString::from("s".to_string()));
        let query = CallbackQuery {
            error: Some("access_denied".to_string()),
            ..CallbackQuery::default()
        };
        match callback(&config, &provider()?, query).await {
            Err(Error::OAuthDenied(description)) => assert_eq!(description, "access_denied"),
            other => bail!("expected OAuthDenied, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn callback_requires_code() -> Result<()> {
        let config = OAuthConfig::new("cid", SecretString::from("s".to_string()));
        let query = CallbackQuery {
            code: Some(String::new()),
            ..CallbackQuery::default()
        };
        match callback(&config, &provider()?, query).await {
            Err(Error::Client(message)) => assert_eq!(message, "Missing code"),
            other => bail!("expected Client error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn callback_ignores_empty_error() -> Result<()> {
        let config = OAuthConfig::new("cid", SecretString::from("s".to_string()));
        let query = CallbackQuery {
            error: Some(String::new()),
            ..CallbackQuery::default()
        };
        match callback(&config, &provider()?, query).await {
            Err(Error::Client(message)) => assert_eq!(message, "Missing code"),
            other => bail!("expected Client error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn debug_hides_client_secret() {
        let config = OAuthConfig::new("cid", SecretString::from("hunter2".to_string()));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("cid"));
        assert!(!rendered.contains("hunter2"));
    }
}
