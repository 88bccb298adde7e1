//! In-memory directory backend.
//!
//! # Purpose
//! Implements the gateway traits over an in-process tree of entries. It exists
//! for:
//! - tests, which need to count directory round trips and inject outages
//! - local runs without an LDAP server, seeded from a YAML file
//!
//! # Consistency
//! - **Not durable**: all state is lost on process restart.
//! - Writes are last-writer-wins per attribute, like the real directory.
//! - DNs compare case-insensitively; scope checks work on the DN suffix.
//!
//! # Stats
//! Every session-level call bumps a counter in [`DirectoryStats`], so callers
//! can assert that a cache hit performed zero directory work.
use crate::entry::Entry;
use crate::filter::Filter;
use crate::gateway::{
    DirectoryConnector, DirectoryError, DirectoryResult, DirectorySession, Modification, Scope,
    Session,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Snapshot of the calls made against a [`MemoryDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectoryStats {
    pub opens: usize,
    pub closes: usize,
    pub searches: usize,
    pub reads: usize,
    pub modifies: usize,
}

#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    searches: AtomicUsize,
    reads: AtomicUsize,
    modifies: AtomicUsize,
}

#[derive(Debug, Default)]
struct Shared {
    /// Entries keyed by lower-cased DN.
    entries: RwLock<BTreeMap<String, Entry>>,
    counters: Counters,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

/// Shared in-process directory. Clones observe the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    shared: Arc<Shared>,
}

#[derive(Debug, Deserialize)]
struct Seed {
    #[serde(default)]
    entries: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    dn: String,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory from a YAML document of the form
    /// `entries: [{ dn: ..., attributes: { name: [values] } }]`.
    pub fn from_yaml(contents: &str) -> DirectoryResult<Self> {
        let seed: Seed = serde_yaml::from_str(contents)
            .map_err(|err| DirectoryError::Operation(format!("invalid seed: {err}")))?;
        let directory = Self::new();
        {
            let mut entries = directory.shared.entries.try_write().map_err(|_| {
                DirectoryError::Operation("seed directory is already in use".to_string())
            })?;
            for seed_entry in seed.entries {
                let entry = Entry::from_attributes(seed_entry.dn, seed_entry.attributes);
                entries.insert(entry.dn.to_ascii_lowercase(), entry);
            }
        }
        Ok(directory)
    }

    pub fn from_yaml_file(path: &Path) -> DirectoryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            DirectoryError::Operation(format!("read seed {}: {err}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub async fn insert(&self, entry: Entry) {
        self.shared
            .entries
            .write()
            .await
            .insert(entry.dn.to_ascii_lowercase(), entry);
    }

    pub async fn remove(&self, dn: &str) -> Option<Entry> {
        self.shared
            .entries
            .write()
            .await
            .remove(&dn.to_ascii_lowercase())
    }

    pub async fn get(&self, dn: &str) -> Option<Entry> {
        self.shared
            .entries
            .read()
            .await
            .get(&dn.to_ascii_lowercase())
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.shared.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.entries.read().await.is_empty()
    }

    /// Make subsequent `open` calls fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every search, read and modify by `latency`, like a slow server.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.shared.latency_ms.store(millis, Ordering::SeqCst);
    }

    pub fn stats(&self) -> DirectoryStats {
        let counters = &self.shared.counters;
        DirectoryStats {
            opens: counters.opens.load(Ordering::SeqCst),
            closes: counters.closes.load(Ordering::SeqCst),
            searches: counters.searches.load(Ordering::SeqCst),
            reads: counters.reads.load(Ordering::SeqCst),
            modifies: counters.modifies.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl DirectoryConnector for MemoryDirectory {
    async fn open(&self) -> DirectoryResult<Session> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connect(
                "memory directory marked unavailable".to_string(),
            ));
        }
        self.shared.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Session::new(Box::new(MemorySession {
            directory: self.clone(),
            closed: false,
        })))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySession {
    directory: MemoryDirectory,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> DirectoryResult<()> {
        if self.closed {
            return Err(DirectoryError::Operation("session already closed".into()));
        }
        Ok(())
    }

    fn counters(&self) -> &Counters {
        &self.directory.shared.counters
    }

    async fn round_trip(&self) {
        let millis = self.directory.shared.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

fn in_scope(dn: &str, base: &str, scope: Scope) -> bool {
    let dn = dn.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    match scope {
        Scope::Base => dn == base,
        Scope::OneLevel => dn
            .split_once(',')
            .is_some_and(|(_, parent)| parent.trim() == base),
        Scope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
    }
}

#[async_trait]
impl DirectorySession for MemorySession {
    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        self.ensure_open()?;
        self.counters().searches.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;
        let entries = self.directory.shared.entries.read().await;
        Ok(entries
            .values()
            .filter(|entry| in_scope(&entry.dn, base, scope) && filter.matches(entry))
            .map(|entry| entry.project(attributes))
            .collect())
    }

    async fn read_one(
        &mut self,
        dn: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<Entry>> {
        self.ensure_open()?;
        self.counters().reads.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;
        let entries = self.directory.shared.entries.read().await;
        Ok(entries
            .get(&dn.to_ascii_lowercase())
            .map(|entry| entry.project(attributes)))
    }

    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()> {
        self.ensure_open()?;
        self.counters().modifies.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;
        let mut entries = self.directory.shared.entries.write().await;
        let entry = entries
            .get_mut(&dn.to_ascii_lowercase())
            .ok_or_else(|| DirectoryError::Operation(format!("no such object: {dn}")))?;
        // Apply to a copy so a failing change leaves the entry untouched.
        let mut updated = entry.clone();
        for change in changes {
            match change {
                Modification::Replace { attribute, values } => updated.set(&attribute, values),
                Modification::Delete { attribute } => {
                    if updated.remove(&attribute).is_none() {
                        return Err(DirectoryError::Operation(format!(
                            "no such attribute: {attribute}"
                        )));
                    }
                }
            }
        }
        *entry = updated;
        Ok(())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        self.ensure_open()?;
        self.closed = true;
        self.counters().closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
