//! Identity service library crate.
//!
//! # Purpose
//! Resolves chat-platform identities (numeric ID plus optional handle) to
//! directory profiles, caches the results with TTL-driven revalidation, keeps
//! a wholesale roster for name-keyed lookups, and redeems invite codes.
//!
//! # Notes
//! `identity` holds the core; `api` and `app` expose it over HTTP to the
//! command layer; `config` and `observability` are process wiring.
pub mod api;
pub mod app;
pub mod config;
pub mod identity;
pub mod model;
pub mod observability;
pub mod schema;
