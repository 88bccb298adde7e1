//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Keeps error shapes uniform across identity endpoints and translates
//! `IdentityError` into HTTP responses.
//!
//! # Key invariants and assumptions
//! - Error responses always include a stable `code` and a human-readable `message`.
//! - Status codes align with the error category; only directory outages are 5xx.
use crate::api::types::ErrorResponse;
use crate::identity::IdentityError;
use crate::identity::invites::invite_link;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// `status` must match the semantics of `body.code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            invite_code: None,
            invite_link: None,
        },
    }
}

/// Build a 404 Not Found error with a caller-provided code.
pub fn api_not_found(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, code, message)
}

/// Build a 400 Bad Request error.
pub fn api_bad_request(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

/// Map an identity failure onto its HTTP shape.
///
/// `invite_prefix` is the configured registration link prefix; when set, an
/// incomplete registration also carries the full link.
pub fn api_identity(err: &IdentityError, invite_prefix: Option<&str>) -> ApiError {
    let message = err.to_string();
    match err {
        IdentityError::NotFound => api_error(StatusCode::NOT_FOUND, err.kind(), &message),
        IdentityError::DuplicateEntry { .. } => {
            tracing::warn!(error = %err, "directory integrity violation");
            api_error(StatusCode::CONFLICT, err.kind(), &message)
        }
        IdentityError::AccountLocked => api_error(StatusCode::FORBIDDEN, err.kind(), &message),
        IdentityError::IncompleteRegistration { invite_code } => {
            let mut api = api_error(StatusCode::CONFLICT, err.kind(), &message);
            api.body.invite_link = invite_prefix.map(|prefix| invite_link(prefix, invite_code));
            api.body.invite_code = Some(invite_code.clone());
            api
        }
        IdentityError::GatewayUnavailable(detail) => {
            // Outage details stay server-side.
            tracing::error!(error = %detail, "directory unavailable");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                err.kind(),
                "directory unavailable",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_category() {
        let cases = [
            (IdentityError::NotFound, StatusCode::NOT_FOUND, "not_found"),
            (
                IdentityError::duplicate("Telegram ID 5", 2),
                StatusCode::CONFLICT,
                "duplicate_entry",
            ),
            (
                IdentityError::AccountLocked,
                StatusCode::FORBIDDEN,
                "account_locked",
            ),
            (
                IdentityError::GatewayUnavailable("connection refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "directory_unavailable",
            ),
        ];
        for (err, status, code) in cases {
            let api = api_identity(&err, None);
            assert_eq!(api.status, status);
            assert_eq!(api.body.code, code);
        }
    }

    #[test]
    fn outage_details_are_not_exposed() {
        let api = api_identity(
            &IdentityError::GatewayUnavailable("bind failed for cn=bot".into()),
            None,
        );
        assert!(!api.body.message.contains("cn=bot"));
    }

    #[test]
    fn incomplete_registration_carries_code_and_link() {
        let err = IdentityError::IncompleteRegistration {
            invite_code: "INV-7".into(),
        };
        let api = api_identity(&err, Some("https://example.com/register?invite="));
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.body.invite_code.as_deref(), Some("INV-7"));
        assert_eq!(
            api.body.invite_link.as_deref(),
            Some("https://example.com/register?invite=INV-7")
        );

        let api = api_identity(&err, None);
        assert_eq!(api.body.invite_link, None);
    }
}
