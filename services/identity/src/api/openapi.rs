//! OpenAPI schema aggregation for the identity API.
use crate::api::{
    caches, invites, people, system,
    types::{
        CacheBustResponse, ErrorResponse, HealthStatus, PersonView, RedeemRequest, UserView,
    },
    users,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "roster-identity",
        version = "v1",
        description = "Chat identity resolution and roster HTTP API"
    ),
    paths(
        system::system_health,
        users::get_user,
        people::get_person,
        invites::redeem_invite,
        caches::bust_users,
        caches::bust_people,
    ),
    components(schemas(
        CacheBustResponse,
        ErrorResponse,
        HealthStatus,
        PersonView,
        RedeemRequest,
        UserView,
    )),
    tags(
        (name = "system", description = "Health"),
        (name = "users", description = "Identity resolution"),
        (name = "people", description = "Roster lookups"),
        (name = "invites", description = "Invite redemption"),
        (name = "caches", description = "Cache invalidation")
    )
)]
pub struct ApiDoc;
