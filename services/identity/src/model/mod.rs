//! Identity model definitions.
//!
//! # Purpose
//! Defines the external identifier, the cached profile (`User`), and the
//! lightweight roster record (`Person`).
mod person;
mod user;

pub use person::Person;
pub use user::User;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric chat-platform account ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(i64);

impl ExternalId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse().map(Self)
    }
}
