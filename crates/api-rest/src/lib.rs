//! # API REST
//!
//! REST API for the block store.
//!
//! Handles:
//! - HTTP endpoints with axum (`/blocks/*path` for get, put and delete)
//! - Path and content-type validation before any storage call
//! - Mapping storage errors to status codes
//! - OpenAPI/Swagger documentation
//! - Request tracing, body limits, panic recovery and CORS
//!
//! Storage itself lives in `blocks-core`; this crate only holds an
//! `Arc<dyn BlockManager>` chosen at startup.

#![warn(rust_2018_idioms)]

pub mod blocks;
pub mod config;
pub mod error;
pub mod home;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use blocks_core::BlockManager;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::{HttpConfig, ServerConfig};
pub use error::{ApiError, ErrorRes};
pub use home::AppInfo;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<dyn BlockManager>,
    pub app: Arc<AppInfo>,
}

impl AppState {
    pub fn new(manager: Arc<dyn BlockManager>, app: AppInfo) -> Self {
        Self {
            manager,
            app: Arc::new(app),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        home::home,
        blocks::get_block,
        blocks::put_block,
        blocks::delete_block,
    ),
    components(schemas(
        AppInfo,
        ErrorRes,
        blocks::BlockRes,
        blocks::BlockRefRes,
    ))
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// Request bodies larger than `max_upload_size` bytes are rejected with 413.
pub fn router(state: AppState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/blocks", get(blocks::get_root_block))
        .route("/blocks/", get(blocks::get_root_block))
        .route(
            "/blocks/*path",
            get(blocks::get_block)
                .put(blocks::put_block)
                .delete(blocks::delete_block),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let matched_path = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str);
                    let user_agent = req
                        .headers()
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok());

                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        matched_path,
                        user_agent,
                    )
                })
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                )
                .on_failure(()),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "request handler panicked");
    ApiError::internal().into_response()
}
