//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Lightweight readiness endpoint for load balancers and operators.
//!
//! # Key invariants and assumptions
//! - Health opens and releases one directory session and performs no search.
use crate::api::error::{ApiError, api_identity};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use crate::identity::IdentityError;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Identity service health", body = HealthStatus),
        (status = 503, description = "Directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Return service health, probing directory connectivity.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    let session = state
        .directory
        .open()
        .await
        .map_err(|err| api_identity(&IdentityError::from(err), None))?;
    session.release().await;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        backend: state.directory.backend_name().to_string(),
    }))
}
