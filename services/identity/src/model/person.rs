use super::ExternalId;
use serde::Serialize;

/// Roster record for name-keyed lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub uid: String,
    pub cn: String,
    pub is_admin: bool,
    pub handle: Option<String>,
    pub external_id: Option<ExternalId>,
}
