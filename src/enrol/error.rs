//! Request and startup error taxonomy.
//!
//! Request-scoped variants render into an HTTP response and are logged; none of
//! them stops the server.

use super::{keys::KeyError, provider::ProviderError, store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

const INTERNAL_ERROR_BODY: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (e.g. no OAuth client id).
    #[error("{0}")]
    Config(&'static str),
    #[error(transparent)]
    Key(#[from] KeyError),
    /// Malformed request: bad body, missing cookie, missing code.
    #[error("{0}")]
    Client(&'static str),
    /// The identity provider redirected back with an `error` parameter.
    #[error("Error: {0}")]
    OAuthDenied(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client(_) => StatusCode::BAD_REQUEST,
            Self::Provider(ProviderError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Config(_)
            | Self::Key(_)
            | Self::OAuthDenied(_)
            | Self::Provider(_)
            | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> String {
        match self {
            Self::Client(_) | Self::Config(_) | Self::OAuthDenied(_) => self.to_string(),
            Self::Provider(ProviderError::Unauthorized) => "Unauthorized".to_string(),
            Self::Key(_) | Self::Provider(_) | Self::Store(_) => INTERNAL_ERROR_BODY.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            warn!("Request rejected: {self}");
        }

        (status, self.body()).into_response()
    }
}
