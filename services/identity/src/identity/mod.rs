//! Identity resolution and caching core.
//!
//! # Purpose
//! Groups the resolution protocol, the per-ID profile cache, the wholesale
//! roster cache, invite redemption, and admin derivation.
//!
//! # Concurrency model
//! Each cache keeps its state behind one `tokio::sync::Mutex` that is held
//! across the directory round trips of a lookup, so the check-then-mutate
//! sequences run one at a time per cache. Directory sessions are opened per
//! operation and always released before the call returns.
pub mod admin;
pub mod error;
pub mod invites;
pub mod people;
pub mod resolve;
pub mod users;

pub use admin::AdminGroups;
pub use error::{IdentityError, IdentityResult};
pub use invites::Invites;
pub use people::People;
pub use resolve::{DirectoryLayout, Resolver};
pub use users::Users;

/// Default lifetime of a cached profile or roster snapshot.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(3600);
