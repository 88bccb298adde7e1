//! Directory gateway primitives shared by the identity service and its tests.
//!
//! # Purpose
//! Defines the narrow boundary the identity core uses to talk to the
//! organizational directory: typed search filters, the entry model, and
//! scoped sessions with explicit open/close.
//!
//! # How it fits
//! The identity service only ever sees [`DirectoryConnector`] and
//! [`DirectorySession`]. Production wiring uses [`LdapDirectory`]; tests and
//! local runs use [`MemoryDirectory`].
//!
//! # Key invariants
//! - Caller-supplied values only reach the wire through [`Filter`] rendering,
//!   which escapes them.
//! - Attribute names are case-insensitive and stored lower-cased in [`Entry`].
//! - A session is opened per logical operation and released with [`Session::release`];
//!   a dropped session is closed in the background.
//!
//! # Examples
//! ```rust
//! use roster_directory::Filter;
//!
//! let filter = Filter::and([
//!     Filter::equals("objectClass", "weeeOpenPerson"),
//!     Filter::equals("telegramId", "555"),
//! ]);
//! assert_eq!(filter.to_string(), "(&(objectClass=weeeOpenPerson)(telegramId=555))");
//! ```

mod entry;
mod filter;
mod gateway;
mod ldap;
mod memory;

pub use entry::Entry;
pub use filter::Filter;
pub use gateway::{
    DirectoryConnector, DirectoryError, DirectoryResult, DirectorySession, Modification,
    NO_ATTRIBUTES, Scope, Session,
};
pub use ldap::{LdapDirectory, LdapSettings};
pub use memory::{DirectoryStats, MemoryDirectory};
