use super::ExternalId;
use std::time::Duration;
use tokio::time::Instant;

/// Cached directory profile bound to one external ID.
///
/// `dn` locates the entry for stale refreshes; `uid` is the authoritative
/// local account name. `refreshed_at` drives staleness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub dn: String,
    pub external_id: ExternalId,
    pub uid: String,
    pub cn: String,
    pub given_name: String,
    pub surname: String,
    pub is_admin: bool,
    pub handle: Option<String>,
    pub refreshed_at: Instant,
}

impl User {
    pub fn age(&self) -> Duration {
        self.refreshed_at.elapsed()
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    /// "Given Surname" when both parts are known, otherwise the common name.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.given_name, self.surname);
        let full = full.trim();
        if full.is_empty() {
            self.cn.clone()
        } else {
            full.to_string()
        }
    }
}
