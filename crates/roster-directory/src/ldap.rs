//! LDAP directory backend built on `ldap3`.
//!
//! # Purpose
//! Opens one authenticated connection per session: connect on port 389,
//! upgrade with StartTLS, simple-bind with the service account, and unbind
//! when the session is closed.
//!
//! # Notes
//! - There is no pooling; the identity core opens one session per logical
//!   operation and releases it immediately.
//! - Values that are not valid UTF-8 are decoded lossily.
use crate::entry::Entry;
use crate::filter::Filter;
use crate::gateway::{
    DirectoryConnector, DirectoryError, DirectoryResult, DirectorySession, Modification, Scope,
    Session,
};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, SearchEntry};
use std::collections::HashSet;
use std::time::Duration;

/// LDAP result code for `noSuchObject`.
const NO_SUCH_OBJECT: u32 = 32;

#[derive(Debug, Clone)]
pub struct LdapSettings {
    pub server: String,
    pub bind_dn: String,
    pub password: String,
    pub starttls: bool,
    pub timeout: Duration,
}

impl LdapSettings {
    pub fn url(&self) -> String {
        format!("ldap://{}:389", self.server)
    }
}

#[derive(Debug, Clone)]
pub struct LdapDirectory {
    settings: LdapSettings,
}

impl LdapDirectory {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }
}

fn operation(err: ldap3::LdapError) -> DirectoryError {
    DirectoryError::Operation(err.to_string())
}

#[async_trait]
impl DirectoryConnector for LdapDirectory {
    async fn open(&self) -> DirectoryResult<Session> {
        let url = self.settings.url();
        tracing::debug!(%url, "connecting to directory");
        let conn_settings = LdapConnSettings::new()
            .set_starttls(self.settings.starttls)
            .set_conn_timeout(self.settings.timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &url)
            .await
            .map_err(|err| DirectoryError::Connect(err.to_string()))?;
        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                tracing::warn!(error = %err, "directory connection driver stopped");
            }
        });
        ldap.with_timeout(self.settings.timeout)
            .simple_bind(&self.settings.bind_dn, &self.settings.password)
            .await
            .and_then(|result| result.success())
            .map_err(|err| DirectoryError::Connect(err.to_string()))?;
        Ok(Session::new(Box::new(LdapSession {
            ldap,
            timeout: self.settings.timeout,
        })))
    }

    fn backend_name(&self) -> &'static str {
        "ldap"
    }
}

struct LdapSession {
    ldap: Ldap,
    timeout: Duration,
}

fn ldap_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn decode(result: ldap3::ResultEntry) -> Entry {
    let SearchEntry {
        dn,
        attrs,
        bin_attrs,
    } = SearchEntry::construct(result);
    let binary = bin_attrs.into_iter().map(|(name, values)| {
        let values: Vec<String> = values
            .iter()
            .map(|value| String::from_utf8_lossy(value).into_owned())
            .collect();
        (name, values)
    });
    Entry::from_attributes(dn, attrs.into_iter().chain(binary))
}

fn to_mod(change: Modification) -> Mod<String> {
    match change {
        Modification::Replace { attribute, values } => {
            Mod::Replace(attribute, values.into_iter().collect::<HashSet<_>>())
        }
        Modification::Delete { attribute } => Mod::Delete(attribute, HashSet::new()),
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        let filter = filter.to_string();
        tracing::debug!(%base, %filter, "directory search");
        let (entries, _) = self
            .ldap
            .with_timeout(self.timeout)
            .search(base, ldap_scope(scope), &filter, attributes.to_vec())
            .await
            .map_err(operation)?
            .success()
            .map_err(operation)?;
        Ok(entries.into_iter().map(decode).collect())
    }

    async fn read_one(
        &mut self,
        dn: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<Entry>> {
        let ldap3::SearchResult(entries, result) = self
            .ldap
            .with_timeout(self.timeout)
            .search(dn, ldap3::Scope::Base, "(objectClass=*)", attributes.to_vec())
            .await
            .map_err(operation)?;
        if result.rc == NO_SUCH_OBJECT {
            return Ok(None);
        }
        result.success().map_err(operation)?;
        Ok(entries.into_iter().next().map(decode))
    }

    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()> {
        tracing::debug!(%dn, changes = changes.len(), "directory modify");
        let mods: Vec<Mod<String>> = changes.into_iter().map(to_mod).collect();
        self.ldap
            .with_timeout(self.timeout)
            .modify(dn, mods)
            .await
            .map_err(operation)?
            .success()
            .map_err(operation)?;
        Ok(())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        self.ldap.unbind().await.map_err(operation)
    }
}
