//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes exchanged with the command layer and used for
//! OpenAPI schema generation.
use crate::model::{Person, User};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct UserView {
    pub external_id: i64,
    pub uid: String,
    pub cn: String,
    pub given_name: String,
    pub surname: String,
    pub display_name: String,
    pub is_admin: bool,
    pub handle: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            external_id: user.external_id.get(),
            uid: user.uid.clone(),
            cn: user.cn.clone(),
            given_name: user.given_name.clone(),
            surname: user.surname.clone(),
            display_name: user.display_name(),
            is_admin: user.is_admin,
            handle: user.handle.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PersonView {
    pub uid: String,
    pub cn: String,
    pub is_admin: bool,
    pub handle: Option<String>,
    pub external_id: Option<i64>,
}

impl From<Person> for PersonView {
    fn from(person: Person) -> Self {
        Self {
            uid: person.uid,
            cn: person.cn,
            is_admin: person.is_admin,
            handle: person.handle,
            external_id: person.external_id.map(|id| id.get()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Current chat handle of the caller, if any.
    pub handle: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RedeemRequest {
    pub code: String,
    pub external_id: i64,
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct CacheBustResponse {
    pub busted: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_link: Option<String>,
}
