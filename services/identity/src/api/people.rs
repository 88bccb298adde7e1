//! Roster lookup handler.
use crate::api::error::{ApiError, api_identity, api_not_found};
use crate::api::types::PersonView;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, State};

#[utoipa::path(
    get,
    path = "/v1/people/{account_name}",
    tag = "people",
    params(
        ("account_name" = String, Path, description = "Local account name, case-insensitive")
    ),
    responses(
        (status = 200, description = "Roster entry", body = PersonView),
        (status = 404, description = "Unknown person", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Look up a person in the roster by account name.
///
/// # Errors
/// - 404 `unknown_person` when the roster has no such account.
/// - 503 when the roster is due for a resync and the directory is down.
pub(crate) async fn get_person(
    Path(account_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PersonView>, ApiError> {
    let person = state
        .people
        .get(&account_name)
        .await
        .map_err(|err| api_identity(&err, None))?;
    match person {
        Some(person) => Ok(Json(PersonView::from(person))),
        None => Err(api_not_found("unknown_person", "person not in roster")),
    }
}
