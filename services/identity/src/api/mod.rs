//! Identity service HTTP API module.
//!
//! # Purpose
//! Exposes the route handlers the command layer calls: profile resolution,
//! roster lookup, invite redemption, cache busting, and health.
pub mod caches;
pub mod error;
pub mod invites;
pub mod openapi;
pub mod people;
pub mod system;
pub mod types;
pub mod users;

use crate::api::error::{ApiError, api_bad_request};
use crate::model::ExternalId;

pub(crate) fn parse_external_id(raw: &str) -> Result<ExternalId, ApiError> {
    raw.parse()
        .map_err(|_| api_bad_request("external id must be an integer"))
}
