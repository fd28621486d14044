use crate::enrol::{
    error::Error,
    oauth::{self, CallbackQuery},
    provider::ProviderError,
    state::AppState,
};
use axum::{
    extract::{Extension, Query},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path= "/auth/start",
    responses (
        (status = 303, description = "Redirect to the provider's authorization page"),
        (status = 500, description = "OAuth client id is not configured", body = String),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn start(Extension(state): Extension<Arc<AppState>>) -> Result<Redirect, Error> {
    let url = oauth::start(&state.oauth, &state.provider)?;

    Ok(Redirect::to(url.as_str()))
}

#[utoipa::path(
    get,
    path= "/auth/callback",
    params(CallbackQuery),
    responses (
        (status = 303, description = "Login complete; `token` cookie set, redirect to /"),
        (status = 400, description = "Missing code", body = String),
        (status = 500, description = "Provider denied access or the code exchange failed", body = String),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, Error> {
    let credential = oauth::callback(&state.oauth, &state.provider, query).await?;

    let cookie = state
        .cookie
        .credential_cookie(&credential)
        .map_err(|_| ProviderError::MalformedCredential)?;

    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}
