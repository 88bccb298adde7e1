//! Admin role derivation from group membership.
use std::collections::HashSet;

/// Allow-list of group DNs whose members are admins. Loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminGroups(HashSet<String>);

impl AdminGroups {
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(groups.into_iter().map(Into::into).collect())
    }

    /// Parse the `|`-separated list used in configuration.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split('|')
                .map(str::trim)
                .filter(|group| !group.is_empty()),
        )
    }

    /// True iff any membership is in the allow-list.
    pub fn is_admin(&self, memberships: &[String]) -> bool {
        memberships.iter().any(|group| self.0.contains(group))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
