//! Resolution protocol: external ID (plus optional handle) to directory profile.
//!
//! # Purpose
//! Finds the directory entry bound to an external ID, falling back to an
//! unbound entry carrying the caller's handle and binding it on the spot.
//!
//! # Key invariants
//! - More than one match on any search path is `DuplicateEntry`; the protocol
//!   never picks one.
//! - The handle fallback only matches entries without an external ID, so a
//!   bound entry can only be found by ID afterwards.
//! - Locked entries are rejected before any profile is built.
//! - The stored handle is reconciled with the caller's on every full
//!   resolution and stale refresh, never on cache hits.
//!
//! # Concurrency model
//! Stateless. All directory work goes through the caller's session, which the
//! caller opens and releases.
use crate::identity::admin::AdminGroups;
use crate::identity::error::{IdentityError, IdentityResult};
use crate::model::{ExternalId, User};
use crate::schema;
use roster_directory::{DirectorySession, Entry, Modification, NO_ATTRIBUTES, Scope};
use std::sync::Arc;
use tokio::time::Instant;

/// Base DNs of the person and pending-invite trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    pub people_tree: String,
    pub invite_tree: String,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    layout: DirectoryLayout,
    admin_groups: Arc<AdminGroups>,
}

impl Resolver {
    pub fn new(layout: DirectoryLayout, admin_groups: Arc<AdminGroups>) -> Self {
        Self {
            layout,
            admin_groups,
        }
    }


    /// Run the full protocol for `external_id`.
    ///
    /// # Errors
    /// - `IncompleteRegistration` when only a pending invite carries the ID.
    /// - `NotFound` when neither the ID nor the handle finds an entry.
    /// - `DuplicateEntry` when any search path is ambiguous.
    /// - `AccountLocked` when the entry carries a lock marker.
    /// - `GatewayUnavailable` on any directory failure.
    pub async fn resolve(
        &self,
        session: &mut dyn DirectorySession,
        external_id: ExternalId,
        handle: Option<&str>,
    ) -> IdentityResult<User> {
        tracing::debug!(%external_id, ?handle, "resolving identity");
        let entry = match self.search_by_external_id(session, external_id).await {
            Ok(entry) => entry,
            Err(IdentityError::NotFound) => match handle {
                Some(handle) => self.bind_by_handle(session, external_id, handle).await?,
                None => return Err(IdentityError::NotFound),
            },
            Err(err) => return Err(err),
        };
        self.finish(session, entry, external_id, handle).await
    }

    /// Re-read a cached profile's entry by DN and rebuild it.
    ///
    /// An entry that vanished or whose stored ID no longer equals the cached
    /// one is `NotFound`.
    pub async fn refresh(
        &self,
        session: &mut dyn DirectorySession,
        cached: &User,
        handle: Option<&str>,
    ) -> IdentityResult<User> {
        tracing::debug!(external_id = %cached.external_id, dn = %cached.dn, "refreshing stale profile");
        let entry = session
            .read_one(&cached.dn, schema::USER_ATTRIBUTES)
            .await?
            .ok_or(IdentityError::NotFound)?;
        let bound_to_cached_id = entry
            .first(schema::TELEGRAM_ID)
            .and_then(|value| value.parse::<ExternalId>().ok())
            == Some(cached.external_id);
        if !bound_to_cached_id {
            tracing::info!(dn = %cached.dn, "cached entry no longer bound to external id");
            return Err(IdentityError::NotFound);
        }
        self.finish(session, entry, cached.external_id, handle).await
    }

    async fn search_by_external_id(
        &self,
        session: &mut dyn DirectorySession,
        external_id: ExternalId,
    ) -> IdentityResult<Entry> {
        let mut found = session
            .search(
                &self.layout.people_tree,
                Scope::Subtree,
                &schema::person_by_external_id(external_id),
                schema::USER_ATTRIBUTES,
            )
            .await?;
        match found.len() {
            0 => match self.pending_invite_code(session, external_id).await? {
                Some(invite_code) => Err(IdentityError::IncompleteRegistration { invite_code }),
                None => Err(IdentityError::NotFound),
            },
            1 => Ok(found.remove(0)),
            count => Err(IdentityError::duplicate(
                format!("Telegram ID {external_id}"),
                count,
            )),
        }
    }

    // Compatibility path for accounts created before self-registration: the
    // ID was written onto the invite instead of a person entry.
    async fn pending_invite_code(
        &self,
        session: &mut dyn DirectorySession,
        external_id: ExternalId,
    ) -> IdentityResult<Option<String>> {
        let mut found = session
            .search(
                &self.layout.invite_tree,
                Scope::Subtree,
                &schema::invite_by_external_id(external_id),
                schema::INVITE_ATTRIBUTES,
            )
            .await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found
                .remove(0)
                .first(schema::INVITE_CODE)
                .map(str::to_string)),
            count => Err(IdentityError::duplicate(
                format!("Telegram ID {external_id} (invites)"),
                count,
            )),
        }
    }

    async fn bind_by_handle(
        &self,
        session: &mut dyn DirectorySession,
        external_id: ExternalId,
        handle: &str,
    ) -> IdentityResult<Entry> {
        tracing::debug!(%external_id, %handle, "falling back to handle search");
        let found = session
            .search(
                &self.layout.people_tree,
                Scope::Subtree,
                &schema::unbound_person_by_handle(handle),
                NO_ATTRIBUTES,
            )
            .await?;
        let dn = match found.as_slice() {
            [] => return Err(IdentityError::NotFound),
            [entry] => entry.dn.clone(),
            many => {
                return Err(IdentityError::duplicate(
                    format!("Telegram nickname {handle}"),
                    many.len(),
                ));
            }
        };
        tracing::info!(%external_id, %dn, "binding external id to entry found by handle");
        session
            .modify(
                &dn,
                vec![Modification::replace(
                    schema::TELEGRAM_ID,
                    external_id.to_string(),
                )],
            )
            .await?;
        self.search_by_external_id(session, external_id).await
    }

    async fn finish(
        &self,
        session: &mut dyn DirectorySession,
        entry: Entry,
        external_id: ExternalId,
        handle: Option<&str>,
    ) -> IdentityResult<User> {
        if is_locked(&entry) {
            return Err(IdentityError::AccountLocked);
        }
        let is_admin = self.admin_groups.is_admin(entry.values(schema::MEMBER_OF));
        let stored_handle = entry.first(schema::TELEGRAM_NICKNAME);
        if stored_handle != handle {
            reconcile_handle(session, &entry.dn, stored_handle, handle).await?;
        }
        Ok(User {
            external_id,
            uid: text(&entry, schema::UID),
            cn: text(&entry, schema::CN),
            given_name: text(&entry, schema::GIVEN_NAME),
            surname: text(&entry, schema::SURNAME),
            is_admin,
            handle: handle.map(str::to_string),
            refreshed_at: Instant::now(),
            dn: entry.dn,
        })
    }
}

/// An entry is locked when it carries the lock attribute, whatever its value.
pub fn is_locked(entry: &Entry) -> bool {
    entry.has(schema::ACCOUNT_LOCK)
}

async fn reconcile_handle(
    session: &mut dyn DirectorySession,
    dn: &str,
    stored: Option<&str>,
    wanted: Option<&str>,
) -> IdentityResult<()> {
    tracing::info!(%dn, ?stored, ?wanted, "reconciling stored handle");
    let change = match wanted {
        Some(handle) => Modification::replace(schema::TELEGRAM_NICKNAME, handle),
        None => Modification::delete(schema::TELEGRAM_NICKNAME),
    };
    session.modify(dn, vec![change]).await?;
    Ok(())
}

fn text(entry: &Entry, attribute: &str) -> String {
    entry.first(attribute).unwrap_or_default().to_string()
}
