//! Wholesale roster cache keyed by local account name.
//!
//! # Purpose
//! Serves reverse lookups (account name to person) for callers that have no
//! external ID, e.g. when enriching log lines with display names.
//!
//! # Key invariants
//! - The roster is a full snapshot: every resync replaces it, nothing is
//!   merged, so people removed from the directory disappear immediately.
//! - The age clock resets on every successful resync, even an empty one.
//! - A failed resync leaves the previous snapshot and clock untouched.
//! - Keys are lower-cased account names; lookups are case-insensitive.
use crate::identity::admin::AdminGroups;
use crate::identity::error::IdentityResult;
use crate::model::{ExternalId, Person};
use crate::schema;
use roster_directory::{DirectoryConnector, DirectorySession, Entry, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Roster {
    people: HashMap<String, Person>,
    synced_at: Option<Instant>,
}

impl Roster {
    fn needs_sync(&self, ttl: Duration) -> bool {
        self.synced_at.is_none_or(|at| at.elapsed() > ttl)
    }
}

pub struct People {
    directory: Arc<dyn DirectoryConnector>,
    people_tree: String,
    admin_groups: Arc<AdminGroups>,
    ttl: Duration,
    roster: Mutex<Roster>,
}

impl People {
    pub fn new(
        directory: Arc<dyn DirectoryConnector>,
        people_tree: impl Into<String>,
        admin_groups: Arc<AdminGroups>,
        ttl: Duration,
    ) -> Self {
        Self {
            directory,
            people_tree: people_tree.into(),
            admin_groups,
            ttl,
            roster: Mutex::new(Roster::default()),
        }
    }

    /// Look up a person by account name, resyncing first if the roster expired.
    ///
    /// `Ok(None)` means the person is unknown, which is not an error.
    pub async fn get(&self, uid: &str) -> IdentityResult<Option<Person>> {
        let mut roster = self.roster.lock().await;
        if roster.needs_sync(self.ttl) {
            let mut session = self.directory.open().await?;
            let synced = self.fetch(&mut *session).await;
            session.release().await;
            roster.people = synced?;
            roster.synced_at = Some(Instant::now());
            metrics::counter!("roster_people_resyncs_total").increment(1);
            metrics::gauge!("roster_people_cached").set(roster.people.len() as f64);
            tracing::info!(people = roster.people.len(), "roster synced from directory");
        }
        Ok(roster.people.get(&uid.to_lowercase()).cloned())
    }

    async fn fetch(
        &self,
        session: &mut dyn DirectorySession,
    ) -> IdentityResult<HashMap<String, Person>> {
        let entries = session
            .search(
                &self.people_tree,
                Scope::Subtree,
                &schema::all_people(),
                schema::PERSON_ATTRIBUTES,
            )
            .await?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.person(entry))
            .map(|person| (person.uid.to_lowercase(), person))
            .collect())
    }

    fn person(&self, entry: &Entry) -> Option<Person> {
        let Some(uid) = entry.first(schema::UID) else {
            tracing::warn!(dn = %entry.dn, "skipping roster entry without uid");
            return None;
        };
        let external_id = entry.first(schema::TELEGRAM_ID).and_then(|raw| {
            raw.parse::<ExternalId>()
                .inspect_err(|err| {
                    tracing::warn!(dn = %entry.dn, value = raw, error = %err, "ignoring malformed telegram id");
                })
                .ok()
        });
        Some(Person {
            uid: uid.to_string(),
            cn: entry.first(schema::CN).unwrap_or_default().to_string(),
            is_admin: self.admin_groups.is_admin(entry.values(schema::MEMBER_OF)),
            handle: entry.first(schema::TELEGRAM_NICKNAME).map(str::to_string),
            external_id,
        })
    }

    /// Clear the roster and force a resync on the next lookup.
    pub async fn invalidate_all(&self) -> usize {
        let mut roster = self.roster.lock().await;
        let busted = roster.people.len();
        *roster = Roster::default();
        metrics::gauge!("roster_people_cached").set(0.0);
        tracing::info!(busted, "roster cache invalidated");
        busted
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::error::IdentityError;
    use roster_directory::MemoryDirectory;

    const PEOPLE: &str = "ou=People,dc=example,dc=it";
    const ADMINS: &str = "cn=Admins,ou=Groups,dc=example,dc=it";
    const TTL: Duration = Duration::from_secs(3600);

    fn person(uid: &str) -> Entry {
        Entry::new(format!("uid={uid},{PEOPLE}"))
            .with("objectClass", ["weeeOpenPerson"])
            .with("uid", [uid])
            .with("cn", [format!("{uid} cn")])
    }

    fn people(directory: &MemoryDirectory) -> People {
        People::new(
            Arc::new(directory.clone()),
            PEOPLE,
            Arc::new(AdminGroups::new([ADMINS])),
            TTL,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_are_case_insensitive_and_projected() {
        let directory = MemoryDirectory::new();
        directory
            .insert(
                person("Alice")
                    .with("memberOf", [ADMINS])
                    .with("telegramId", ["555"])
                    .with("telegramNickname", ["alice_tg"]),
            )
            .await;
        let people = people(&directory);

        let alice = people.get("ALICE").await.expect("get").expect("alice");
        assert_eq!(alice.uid, "Alice");
        assert!(alice.is_admin);
        assert_eq!(alice.external_id, Some(ExternalId::new(555)));
        assert_eq!(alice.handle.as_deref(), Some("alice_tg"));
        assert_eq!(people.get("nobody").await.expect("get"), None);
        assert_eq!(directory.stats().searches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_resync_still_resets_the_clock() {
        let directory = MemoryDirectory::new();
        let people = people(&directory);
        assert_eq!(people.get("alice").await.expect("get"), None);
        assert_eq!(people.get("alice").await.expect("get"), None);
        assert_eq!(directory.stats().searches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_resync_keeps_previous_snapshot() {
        let directory = MemoryDirectory::new();
        directory.insert(person("alice")).await;
        let people = people(&directory);
        people.get("alice").await.expect("get");

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        directory.set_unavailable(true);
        let err = people.get("alice").await.unwrap_err();
        assert!(matches!(err, IdentityError::GatewayUnavailable(_)));

        directory.set_unavailable(false);
        directory.remove(&format!("uid=alice,{PEOPLE}")).await;
        assert_eq!(people.get("alice").await.expect("get"), None);
    }

    #[tokio::test]
    async fn malformed_ids_are_dropped_not_fatal() {
        let directory = MemoryDirectory::new();
        directory
            .insert(person("bob").with("telegramId", ["not-a-number"]))
            .await;
        directory
            .insert(Entry::new(format!("cn=orphan,{PEOPLE}")).with("objectClass", ["weeeOpenPerson"]))
            .await;
        let people = people(&directory);
        let bob = people.get("bob").await.expect("get").expect("bob");
        assert_eq!(bob.external_id, None);
        assert_eq!(people.invalidate_all().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_resync_releases_its_session_and_keeps_the_clock() {
        let directory = MemoryDirectory::new();
        directory.insert(person("alice")).await;
        directory.set_latency(Duration::from_secs(60));
        let people = people(&directory);

        let outcome = tokio::time::timeout(Duration::from_secs(1), people.get("alice")).await;
        assert!(outcome.is_err());
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let stats = directory.stats();
        assert_eq!((stats.opens, stats.closes), (1, 1));

        directory.set_latency(Duration::ZERO);
        assert!(people.get("alice").await.expect("get").is_some());
        assert_eq!(directory.stats().searches, 2);
    }
}
