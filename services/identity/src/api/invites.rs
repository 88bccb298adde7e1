//! Invite redemption handler.
//!
//! # Purpose and responsibility
//! Lets the command layer bind a chat identity to a pending registration
//! before the person fills in the registration form.
//!
//! # Security considerations
//! - Codes are matched literally; filter metacharacters in a code never widen
//!   the search.
use crate::api::error::{ApiError, api_bad_request, api_identity};
use crate::api::types::RedeemRequest;
use crate::app::AppState;
use crate::model::ExternalId;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

#[utoipa::path(
    post,
    path = "/v1/invites/redeem",
    tag = "invites",
    request_body = RedeemRequest,
    responses(
        (status = 204, description = "Invite redeemed"),
        (status = 400, description = "Empty invite code", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown invite code", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Code matches more than one invite", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Write the caller's external ID and handle onto the invite record.
pub(crate) async fn redeem_invite(
    State(state): State<AppState>,
    Json(body): Json<RedeemRequest>,
) -> Result<StatusCode, ApiError> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(api_bad_request("invite code must not be empty"));
    }
    let handle = body.handle.as_deref().filter(|handle| !handle.is_empty());
    state
        .invites
        .redeem(code, ExternalId::new(body.external_id), handle)
        .await
        .map_err(|err| api_identity(&err, None))?;
    Ok(StatusCode::NO_CONTENT)
}
