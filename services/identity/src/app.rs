//! Identity service HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures tracing middleware, and defines the
//! shared state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::identity::{Invites, People, Users};
use crate::observability;
use axum::{Json, Router};
use roster_directory::DirectoryConnector;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<Users>,
    pub people: Arc<People>,
    pub invites: Arc<Invites>,
    /// Registration link prefix attached to incomplete-registration errors.
    pub invite_link: Option<String>,
    pub directory: Arc<dyn DirectoryConnector>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/users/:external_id",
            axum::routing::get(api::users::get_user),
        )
        .route(
            "/v1/people/:account_name",
            axum::routing::get(api::people::get_person),
        )
        .route(
            "/v1/invites/redeem",
            axum::routing::post(api::invites::redeem_invite),
        )
        .route(
            "/v1/caches/users",
            axum::routing::delete(api::caches::bust_users),
        )
        .route(
            "/v1/caches/people",
            axum::routing::delete(api::caches::bust_people),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(trace_layer)
        .with_state(state)
}
