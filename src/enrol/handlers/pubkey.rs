use crate::enrol::state::AppState;
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path= "/pubkey",
    responses (
        (status = 200, description = "Uncompressed P-256 public point, base64url with padding", body = String, content_type = "text/plain"),
    ),
    tag= "keys"
)]
pub async fn pubkey(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        state.public_key.encoded().to_string(),
    )
}
