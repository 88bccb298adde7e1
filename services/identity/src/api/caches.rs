//! Cache invalidation handlers.
//!
//! # Purpose and responsibility
//! Administrative endpoints that drop every cached entry so the next lookup
//! goes back to the directory. Used after bulk directory edits.
use crate::api::types::CacheBustResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    delete,
    path = "/v1/caches/users",
    tag = "caches",
    responses(
        (status = 200, description = "Identity cache cleared", body = CacheBustResponse)
    )
)]
/// Drop every cached profile.
pub(crate) async fn bust_users(State(state): State<AppState>) -> Json<CacheBustResponse> {
    Json(CacheBustResponse {
        busted: state.users.invalidate_all().await,
    })
}

#[utoipa::path(
    delete,
    path = "/v1/caches/people",
    tag = "caches",
    responses(
        (status = 200, description = "Roster cleared", body = CacheBustResponse)
    )
)]
/// Drop the roster snapshot; the next lookup resyncs.
pub(crate) async fn bust_people(State(state): State<AppState>) -> Json<CacheBustResponse> {
    Json(CacheBustResponse {
        busted: state.people.invalidate_all().await,
    })
}
