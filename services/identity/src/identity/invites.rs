//! Invite-code redemption for pre-registration.
//!
//! # Purpose
//! Binds a chat identity to a pending registration record identified by a
//! human-shareable code, so the registration form can be pre-filled.
//!
//! # Key invariants
//! - A code matching more than one record is never redeemed.
//! - Redemption does not check whether the record was already redeemed;
//!   redeeming again overwrites the ID and handle.
use crate::identity::error::{IdentityError, IdentityResult};
use crate::model::ExternalId;
use crate::schema;
use roster_directory::{DirectoryConnector, DirectorySession, Modification, NO_ATTRIBUTES, Scope};
use std::sync::Arc;

pub struct Invites {
    directory: Arc<dyn DirectoryConnector>,
    invite_tree: String,
}

impl Invites {
    pub fn new(directory: Arc<dyn DirectoryConnector>, invite_tree: impl Into<String>) -> Self {
        Self {
            directory,
            invite_tree: invite_tree.into(),
        }
    }

    /// Write `external_id` and `handle` onto the invite identified by `code`.
    ///
    /// A missing handle clears any handle already stored on the invite.
    pub async fn redeem(
        &self,
        code: &str,
        external_id: ExternalId,
        handle: Option<&str>,
    ) -> IdentityResult<()> {
        let mut session = self.directory.open().await?;
        let result = self
            .redeem_with(&mut *session, code, external_id, handle)
            .await;
        session.release().await;
        match &result {
            Ok(()) => {
                metrics::counter!("roster_invites_redeemed_total").increment(1);
                tracing::info!(%external_id, "invite redeemed");
            }
            Err(err) => tracing::info!(%external_id, kind = err.kind(), "invite redemption failed"),
        }
        result
    }

    async fn redeem_with(
        &self,
        session: &mut dyn DirectorySession,
        code: &str,
        external_id: ExternalId,
        handle: Option<&str>,
    ) -> IdentityResult<()> {
        let found = session
            .search(
                &self.invite_tree,
                Scope::Subtree,
                &schema::invite_by_code(code),
                NO_ATTRIBUTES,
            )
            .await?;
        let dn = match found.as_slice() {
            [] => return Err(IdentityError::NotFound),
            [invite] => invite.dn.as_str(),
            many => {
                return Err(IdentityError::duplicate(
                    format!("Invite code {code}"),
                    many.len(),
                ));
            }
        };
        let handle_change = match handle {
            Some(handle) => Modification::replace(schema::TELEGRAM_NICKNAME, handle),
            None => Modification::clear(schema::TELEGRAM_NICKNAME),
        };
        session
            .modify(
                dn,
                vec![
                    Modification::replace(schema::TELEGRAM_ID, external_id.to_string()),
                    handle_change,
                ],
            )
            .await?;
        Ok(())
    }
}

/// Registration link for an invite code: the configured prefix with the code appended.
pub fn invite_link(prefix: &str, code: &str) -> String {
    format!("{prefix}{code}")
}
