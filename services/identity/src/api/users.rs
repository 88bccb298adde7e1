//! Profile resolution handler.
//!
//! # Purpose and responsibility
//! Resolves a chat identity to its directory profile through the identity
//! cache. Every command that needs to know "who is this" goes through here.
//!
//! # Key invariants and assumptions
//! - The `handle` query parameter is the caller's current handle; resolution
//!   may write it to the directory.
use crate::api::error::{ApiError, api_identity};
use crate::api::parse_external_id;
use crate::api::types::{UserQuery, UserView};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};

#[utoipa::path(
    get,
    path = "/v1/users/{external_id}",
    tag = "users",
    params(
        ("external_id" = i64, Path, description = "Chat platform account ID"),
        UserQuery
    ),
    responses(
        (status = 200, description = "Resolved profile", body = UserView),
        (status = 400, description = "Malformed external ID", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Account locked", body = crate::api::types::ErrorResponse),
        (status = 404, description = "No matching directory entry", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Duplicate entries or incomplete registration", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Resolve an external ID (and optional handle) to a profile.
pub(crate) async fn get_user(
    Path(external_id): Path<String>,
    Query(query): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<UserView>, ApiError> {
    let external_id = parse_external_id(&external_id)?;
    let handle = query.handle.as_deref().filter(|handle| !handle.is_empty());
    let user = state
        .users
        .get(external_id, handle)
        .await
        .map_err(|err| api_identity(&err, state.invite_link.as_deref()))?;
    Ok(Json(UserView::from(&user)))
}
