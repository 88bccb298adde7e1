//! Connector and session traits for the directory boundary.
//!
//! # Purpose
//! A [`DirectoryConnector`] opens short-lived [`DirectorySession`]s. Each
//! logical operation (one resolution, one roster sync, one redemption) opens
//! exactly one [`Session`] and releases it before returning, on success or
//! failure. Cancellation is covered by the session's `Drop`.
//!
//! # Concurrency model
//! Sessions are owned by a single task and never shared. Connectors are
//! `Send + Sync` and cheap to share behind `Arc`.
use crate::entry::Entry;
use crate::filter::Filter;
use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

/// Attribute request that returns only DNs.
pub const NO_ATTRIBUTES: &[&str] = &["1.1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Replace every value. An empty list clears the attribute if present.
    Replace {
        attribute: String,
        values: Vec<String>,
    },
    /// Remove the attribute; fails if it is not present.
    Delete { attribute: String },
}

impl Modification {
    pub fn replace(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Modification::Replace {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn clear(attribute: impl Into<String>) -> Self {
        Modification::Replace {
            attribute: attribute.into(),
            values: Vec::new(),
        }
    }

    pub fn delete(attribute: impl Into<String>) -> Self {
        Modification::Delete {
            attribute: attribute.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory connect failed: {0}")]
    Connect(String),
    #[error("directory operation failed: {0}")]
    Operation(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Open and authenticate a new session.
    async fn open(&self) -> DirectoryResult<Session>;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait DirectorySession: Send {
    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<Entry>>;

    /// Read a single entry by DN. `Ok(None)` when the DN does not exist.
    async fn read_one(&mut self, dn: &str, attributes: &[&str])
    -> DirectoryResult<Option<Entry>>;

    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()>;

    async fn close(&mut self) -> DirectoryResult<()>;
}

/// An open session that is closed on every exit path.
///
/// [`Session::release`] closes it inline. A session dropped without release,
/// e.g. because the request future was cancelled mid-search, is closed on a
/// background task of the current runtime.
pub struct Session {
    inner: Box<dyn DirectorySession>,
    released: bool,
}

impl Session {
    pub fn new(inner: Box<dyn DirectorySession>) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    /// Close the session, logging instead of failing: the operation's own result wins.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(err) = self.inner.close().await {
            tracing::warn!(error = %err, "failed to close directory session");
        }
    }
}

impl Deref for Session {
    type Target = dyn DirectorySession;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.inner
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut session = std::mem::replace(&mut self.inner, Box::new(Detached));
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!("closing abandoned directory session");
                runtime.spawn(async move {
                    if let Err(err) = session.close().await {
                        tracing::warn!(error = %err, "failed to close abandoned directory session");
                    }
                });
            }
            Err(_) => tracing::warn!("directory session dropped outside a runtime; not closed"),
        }
    }
}

/// Placeholder left behind once a dropped session has been handed off for closing.
struct Detached;

fn detached() -> DirectoryError {
    DirectoryError::Operation("session already released".to_string())
}

#[async_trait]
impl DirectorySession for Detached {
    async fn search(
        &mut self,
        _base: &str,
        _scope: Scope,
        _filter: &Filter,
        _attributes: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        Err(detached())
    }

    async fn read_one(
        &mut self,
        _dn: &str,
        _attributes: &[&str],
    ) -> DirectoryResult<Option<Entry>> {
        Err(detached())
    }

    async fn modify(&mut self, _dn: &str, _changes: Vec<Modification>) -> DirectoryResult<()> {
        Err(detached())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        Ok(())
    }
}
