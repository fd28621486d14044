pub mod error;
pub mod keys;
pub mod oauth;
pub mod provider;
pub mod session;
pub mod state;
pub mod store;

mod handlers;

use self::{
    handlers::{auth, health, pubkey, register},
    state::AppState,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Method, Request},
    response::Json,
    routing::get,
    Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generated `OpenAPI` document for every documented route.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the `OpenAPI` document.
fn api_router() -> OpenApiRouter {
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let mut router = OpenApiRouter::with_openapi(OpenApiBuilder::new().info(info).build())
        .routes(routes!(pubkey::pubkey))
        .routes(routes!(register::register))
        .routes(routes!(auth::start))
        .routes(routes!(auth::callback))
        .routes(routes!(health::health));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("GitHub OAuth login".to_string());
    let mut register_tag = Tag::new("register");
    register_tag.description = Some("Bind an endpoint to the caller's identity".to_string());
    router.get_openapi_mut().tags = Some(vec![auth_tag, register_tag]);

    router
}

/// Build the application with its middleware stack.
///
/// Unmatched paths are served from `assets_dir` when set, otherwise 404.
pub fn router(state: Arc<AppState>, assets_dir: Option<PathBuf>) -> Router {
    let (router, openapi) = api_router().split_for_parts();

    let router = router.route(
        "/openapi.json",
        get(move || {
            let openapi = openapi.clone();
            async move { Json(openapi) }
        }),
    );

    let router = match assets_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID_HEADER),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID_HEADER,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(state)),
    )
}

/// Serve until ctrl-c.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn new(port: u16, state: Arc<AppState>, assets_dir: Option<PathBuf>) -> Result<()> {
    let app = router(state, assets_dir);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    // headers are left out: the Cookie header carries the credential
    debug_span!("http-request", method, path, request_id)
}
