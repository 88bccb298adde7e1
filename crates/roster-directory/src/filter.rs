//! Typed search filters.
//!
//! # Purpose
//! Builds directory search filters as data instead of strings, so the same
//! filter can be rendered for the LDAP wire (RFC 4515) or evaluated directly
//! against in-memory entries.
//!
//! # Security boundary
//! Every value is escaped during rendering. Callers never concatenate user
//! input into filter text, which closes the filter-injection hole a handle
//! like `*)(uid=*` would otherwise open.
use crate::entry::Entry;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equals { attribute: String, value: String },
    Present(String),
    And(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present(attribute.into())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Evaluate the filter against an entry.
    ///
    /// Equality uses case-insensitive matching, the default for the
    /// directory-string attributes this service queries.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(value)),
            Filter::Present(attribute) => entry.has(attribute),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equals { attribute, value } => {
                write!(f, "({attribute}={})", ldap3::ldap_escape(value.as_str()))
            }
            Filter::Present(attribute) => write!(f, "({attribute}=*)"),
            Filter::And(filters) => {
                f.write_str("(&")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
        }
    }
}
