//! Per-ID profile cache with TTL-driven revalidation.
//!
//! # Purpose
//! Answers "who is external ID N" without touching the directory while the
//! cached profile is fresh, and revalidates lazily once it goes stale.
//!
//! # Key invariants
//! - A fresh hit performs no directory work and no handle reconciliation.
//! - A stale hit re-reads the entry by DN. `NotFound`, `AccountLocked` and
//!   `DuplicateEntry` evict it and fall through to a cold resolution.
//! - `GatewayUnavailable` never mutates the cache.
//! - Failed resolutions are never cached, so locked accounts are rejected on
//!   every call.
//!
//! # Concurrency model
//! The map sits behind one async mutex held for the whole lookup, including
//! directory round trips. Lookups are serialized per cache.
use crate::identity::error::IdentityResult;
use crate::identity::resolve::Resolver;
use crate::model::{ExternalId, User};
use roster_directory::{DirectoryConnector, DirectorySession};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Users {
    directory: Arc<dyn DirectoryConnector>,
    resolver: Resolver,
    ttl: Duration,
    entries: Mutex<HashMap<ExternalId, User>>,
}

impl Users {
    pub fn new(directory: Arc<dyn DirectoryConnector>, resolver: Resolver, ttl: Duration) -> Self {
        Self {
            directory,
            resolver,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the profile for `external_id`, resolving or refreshing as needed.
    ///
    /// `handle` is the caller's current handle. It is the fallback search key
    /// on a cold resolution and the value the directory converges to whenever
    /// a resolution or refresh runs.
    pub async fn get(&self, external_id: ExternalId, handle: Option<&str>) -> IdentityResult<User> {
        let mut entries = self.entries.lock().await;
        let stale = match entries.get(&external_id) {
            Some(user) if !user.is_stale(self.ttl) => {
                metrics::counter!("roster_users_cache_hits_total").increment(1);
                return Ok(user.clone());
            }
            Some(user) => Some(user.clone()),
            None => None,
        };
        metrics::counter!("roster_users_cache_misses_total").increment(1);

        let mut session = self.directory.open().await?;
        let result = self
            .load(&mut *session, &mut entries, stale, external_id, handle)
            .await;
        session.release().await;
        metrics::gauge!("roster_users_cached").set(entries.len() as f64);
        if let Err(err) = &result {
            tracing::info!(%external_id, kind = err.kind(), error = %err, "identity lookup failed");
        }
        result
    }

    async fn load(
        &self,
        session: &mut dyn DirectorySession,
        entries: &mut HashMap<ExternalId, User>,
        stale: Option<User>,
        external_id: ExternalId,
        handle: Option<&str>,
    ) -> IdentityResult<User> {
        if let Some(cached) = stale {
            match self.resolver.refresh(session, &cached, handle).await {
                Ok(user) => {
                    entries.insert(external_id, user.clone());
                    return Ok(user);
                }
                Err(err) if err.evicts_cached_entry() => {
                    tracing::info!(%external_id, kind = err.kind(), "evicting stale profile");
                    metrics::counter!("roster_users_cache_evictions_total").increment(1);
                    entries.remove(&external_id);
                }
                Err(err) => return Err(err),
            }
        }

        let user = self.resolver.resolve(session, external_id, handle).await?;
        entries.insert(external_id, user.clone());
        Ok(user)
    }

    /// Drop every cached profile and return how many were removed.
    pub async fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let busted = entries.len();
        entries.clear();
        metrics::gauge!("roster_users_cached").set(0.0);
        tracing::info!(busted, "identity cache invalidated");
        busted
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::admin::AdminGroups;
    use crate::identity::error::IdentityError;
    use crate::identity::resolve::DirectoryLayout;
    use roster_directory::{Entry, MemoryDirectory};

    const PEOPLE: &str = "ou=People,dc=example,dc=it";
    const TTL: Duration = Duration::from_secs(3600);

    fn users(directory: &MemoryDirectory) -> Users {
        let resolver = Resolver::new(
            DirectoryLayout {
                people_tree: PEOPLE.to_string(),
                invite_tree: "ou=Invites,dc=example,dc=it".to_string(),
            },
            Arc::new(AdminGroups::default()),
        );
        Users::new(Arc::new(directory.clone()), resolver, TTL)
    }

    fn alice() -> Entry {
        Entry::new(format!("uid=alice,{PEOPLE}"))
            .with("objectClass", ["weeeOpenPerson"])
            .with("uid", ["alice"])
            .with("cn", ["Alice"])
            .with("telegramId", ["555"])
            .with("telegramNickname", ["alice"])
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_hits_skip_the_directory_and_reconciliation() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        let users = users(&directory);
        let id = ExternalId::new(555);

        users.get(id, Some("alice")).await.expect("cold");
        let before = directory.stats();

        tokio::time::advance(TTL).await;
        let user = users.get(id, Some("renamed")).await.expect("hit");
        assert_eq!(user.handle.as_deref(), Some("alice"));
        assert_eq!(directory.stats(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_hits_refresh_in_place_by_dn() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        let users = users(&directory);
        let id = ExternalId::new(555);

        users.get(id, Some("alice")).await.expect("cold");
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let before = directory.stats();

        let user = users.get(id, Some("renamed")).await.expect("refresh");
        let after = directory.stats();
        assert_eq!(user.handle.as_deref(), Some("renamed"));
        assert_eq!(after.reads - before.reads, 1);
        assert_eq!(after.searches, before.searches);
        assert!(!user.is_stale(TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_locked_entries_are_evicted() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        let users = users(&directory);
        let id = ExternalId::new(555);

        users.get(id, Some("alice")).await.expect("cold");
        directory
            .insert(alice().with("nsAccountLock", ["true"]))
            .await;
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        let err = users.get(id, Some("alice")).await.unwrap_err();
        assert_eq!(err, IdentityError::AccountLocked);
        assert!(users.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn outages_keep_stale_entries() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        let users = users(&directory);
        let id = ExternalId::new(555);

        users.get(id, Some("alice")).await.expect("cold");
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        directory.set_unavailable(true);

        let err = users.get(id, Some("alice")).await.unwrap_err();
        assert!(matches!(err, IdentityError::GatewayUnavailable(_)));
        assert_eq!(users.len().await, 1);

        directory.set_unavailable(false);
        users.get(id, Some("alice")).await.expect("recovered");
    }

    #[tokio::test]
    async fn every_session_is_released() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        let users = users(&directory);

        users.get(ExternalId::new(555), None).await.expect("found");
        users.get(ExternalId::new(1), None).await.unwrap_err();
        let stats = directory.stats();
        assert_eq!(stats.opens, 2);
        assert_eq!(stats.closes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_lookups_still_release_their_session() {
        let directory = MemoryDirectory::new();
        directory.insert(alice()).await;
        directory.set_latency(Duration::from_secs(60));
        let users = users(&directory);

        let outcome =
            tokio::time::timeout(Duration::from_secs(1), users.get(ExternalId::new(555), None))
                .await;
        assert!(outcome.is_err());
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let stats = directory.stats();
        assert_eq!((stats.opens, stats.closes), (1, 1));
        assert!(users.is_empty().await);
    }
}
