use crate::enrol::{
    error::Error,
    session::extract_credential,
    state::AppState,
    store::RegistrationRecord,
};
use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    /// Callback URL (or any opaque address) to associate with the caller.
    endpoint: String,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body = RegisterRequest,
    responses (
        (status = 200, description = "Registration created or updated"),
        (status = 400, description = "Missing token cookie or malformed body", body = String),
        (status = 401, description = "Provider rejected the credential", body = String),
        (status = 500, description = "Provider or store failure", body = String),
    ),
    tag= "register"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, Error> {
    // the cookie is checked before anything else touches the provider or store
    let credential = extract_credential(&headers).ok_or(Error::Client("Missing token cookie"))?;

    let request: RegisterRequest = serde_json::from_slice(&body).map_err(|err| {
        debug!("Invalid register body: {err}");
        Error::Client("Invalid request body")
    })?;

    // stored exactly as sent; whitespace only counts as missing
    if request.endpoint.trim().is_empty() {
        return Err(Error::Client("Missing endpoint"));
    }

    let identity = state.provider.identity(&credential).await?;
    let key = state.key_strategy.record_key(&identity, &credential);

    state
        .store
        .upsert(
            &key,
            &RegistrationRecord {
                identity: identity.clone(),
                endpoint: request.endpoint,
            },
        )
        .await?;

    info!(%identity, "Registered endpoint");

    Ok(StatusCode::OK)
}
