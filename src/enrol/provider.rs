//! Outbound calls to the OAuth identity provider (GitHub).

use super::store::Identity;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, RequestBuilder, Response, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

/// Scope requested on every authorization redirect.
pub const OAUTH_SCOPE: &str = "notifications";

pub const DEFAULT_OAUTH_BASE_URL: &str = "https://github.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("provider request failed: {0}")]
    Transport(reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(StatusCode),
    #[error("provider rejected the credential")]
    Unauthorized,
    #[error("provider rejected the authorization code: {0}")]
    Rejected(String),
    #[error("provider response is missing {0}")]
    MissingField(&'static str),
    #[error("provider issued a credential that cannot be stored in a cookie")]
    MalformedCredential,
}

impl From<reqwest::Error> for ProviderError {
    // Request URLs carry the client secret as a query parameter.
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

/// Which failures may be replayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Replay {
    /// Only when the request never left (connect errors). Authorization codes
    /// are single use.
    ConnectOnly,
    /// Connect errors, timeouts and 5xx responses.
    Idempotent,
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: u64,
}

#[derive(Debug)]
pub struct Provider {
    client: Client,
    authorize_endpoint: Url,
    token_endpoint: Url,
    user_endpoint: Url,
    retry: RetryPolicy,
}

impl Provider {
    /// # Errors
    /// Returns an error if the base URLs are invalid or the HTTP client cannot
    /// be built.
    pub fn new(
        oauth_base: &str,
        api_base: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let oauth_base = Url::parse(oauth_base)?;
        let api_base = Url::parse(api_base)?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            authorize_endpoint: oauth_base.join("/login/oauth/authorize")?,
            token_endpoint: oauth_base.join("/login/oauth/access_token")?,
            user_endpoint: api_base.join("/user")?,
            retry,
        })
    }

    /// Authorization URL the caller is redirected to.
    #[must_use]
    pub fn authorize_url(&self, client_id: &str) -> Url {
        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", client_id.trim())
            .append_pair("scope", OAUTH_SCOPE);
        url
    }

    /// Exchange an authorization code for a bearer credential.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-2xx status, an undecodable
    /// body, or a provider-reported error.
    #[instrument(skip_all, fields(client_id = client_id.trim()))]
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<SecretString, ProviderError> {
        let response = self
            .send("token exchange", Replay::ConnectOnly, || {
                self.client
                    .post(self.token_endpoint.clone())
                    .query(&[
                        ("code", code),
                        ("client_id", client_id.trim()),
                        ("client_secret", client_secret.expose_secret().trim()),
                    ])
                    .header(ACCEPT, "application/json")
            })
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let token: TokenResponse = response.json().await?;

        if let Some(error) = token.error {
            return Err(ProviderError::Rejected(
                token.error_description.unwrap_or(error),
            ));
        }

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => {
                debug!("token exchange succeeded");
                Ok(SecretString::from(access_token))
            }
            _ => Err(ProviderError::MissingField("access_token")),
        }
    }

    /// Resolve the account behind a credential.
    ///
    /// # Errors
    /// Returns `ProviderError::Unauthorized` if the provider rejects the
    /// credential, or another variant on transport or decode failure.
    #[instrument(skip_all)]
    pub async fn identity(&self, credential: &SecretString) -> Result<Identity, ProviderError> {
        let response = self
            .send("identity lookup", Replay::Idempotent, || {
                self.client
                    .get(self.user_endpoint.clone())
                    .header(
                        AUTHORIZATION,
                        format!("Bearer {}", credential.expose_secret()),
                    )
                    .header(ACCEPT, "application/vnd.github+json")
            })
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Unauthorized)
            }
            status if !status.is_success() => return Err(ProviderError::Status(status)),
            _ => {}
        }

        let user: UserResponse = response.json().await?;

        Ok(Identity::new(user.id.to_string()))
    }

    async fn send<F>(
        &self,
        operation: &'static str,
        replay: Replay,
        build: F,
    ) -> Result<Response, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let can_retry = attempt < self.retry.retries;

            match build().send().await {
                Ok(response)
                    if can_retry
                        && replay == Replay::Idempotent
                        && response.status().is_server_error() =>
                {
                    warn!(
                        "{operation} returned {}, attempt {}",
                        response.status(),
                        attempt + 1
                    );
                }
                Ok(response) => return Ok(response),
                Err(err) if can_retry && is_transient(&err, replay) => {
                    warn!("{operation} failed: {}, attempt {}", err.without_url(), attempt + 1);
                }
                Err(err) => return Err(err.into()),
            }

            let delay = self.retry.delay(attempt);
            warn!("Backing off for {} ms", delay.as_millis());
            sleep(delay).await;

            attempt += 1;
        }
    }
}

fn is_transient(err: &reqwest::Error, replay: Replay) -> bool {
    match replay {
        Replay::ConnectOnly => err.is_connect(),
        Replay::Idempotent => err.is_connect() || err.is_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    fn provider(base: &str) -> Result<Provider> {
        Ok(Provider::new(
            base,
            base,
            Duration::from_secs(5),
            fast_retry(),
        )?)
    }

    #[test]
    fn authorize_url_carries_client_id_and_scope() -> Result<()> {
        let provider = provider(DEFAULT_OAUTH_BASE_URL)?;
        let url = provider.authorize_url(" client-123 ");
        assert_eq!(
            url.as_str(),
            "https://github.com/login/oauth/authorize?client_id=client-123&scope=notifications"
        );
        Ok(())
    }

    #[test]
    fn retry_delay_doubles() {
        let policy = RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn exchange_code_returns_access_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(query_param("code", "abc123"))
            .and(query_param("client_id", "cid"))
            .and(query_param("client_secret", "shh"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "T1",
                "token_type": "bearer",
                "scope": "notifications"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = provider(&server.uri())?
            .exchange_code("abc123", "cid", &SecretString::from("shh".to_string()))
            .await?;
        assert_eq!(token.expose_secret(), "T1");
        Ok(())
    }

    #[tokio::test]
    async fn exchange_code_surfaces_provider_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let result = provider(&server.uri())?
            .exchange_code("stale", "cid", &SecretString::from("shh".to_string()))
            .await;
        match result {
            Err(ProviderError::Rejected(description)) => {
                assert!(description.contains("incorrect or expired"));
            }
            other => bail!("expected Rejected, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn exchange_code_is_not_replayed_on_server_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server.uri())?
            .exchange_code("abc123", "cid", &SecretString::from("shh".to_string()))
            .await;
        assert!(matches!(result, Err(ProviderError::Status(StatusCode::BAD_GATEWAY))));
        Ok(())
    }

    #[tokio::test]
    async fn exchange_code_rejects_garbage_body() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = provider(&server.uri())?
            .exchange_code("abc123", "cid", &SecretString::from("shh".to_string()))
            .await;
        match result {
            Err(ProviderError::Transport(err)) => {
                assert!(!err.to_string().contains("shh"));
            }
            other => bail!("expected Transport, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn identity_resolves_user_id() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "id": 583231
            })))
            .mount(&server)
            .await;

        let identity = provider(&server.uri())?
            .identity(&SecretString::from("T1".to_string()))
            .await?;
        assert_eq!(identity.as_str(), "583231");
        Ok(())
    }

    #[tokio::test]
    async fn identity_maps_401_to_unauthorized() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Bad credentials"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server.uri())?
            .identity(&SecretString::from("revoked".to_string()))
            .await;
        assert!(matches!(result, Err(ProviderError::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn identity_retries_server_errors() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = provider(&server.uri())?
            .identity(&SecretString::from("T1".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
        Ok(())
    }
}
