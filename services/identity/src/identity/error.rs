use roster_directory::DirectoryError;
use thiserror::Error;

/// Typed failures surfaced by every identity operation.
///
/// Callers turn these into user-facing messages; nothing here is fatal to
/// the process and nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no matching directory entry")]
    NotFound,
    #[error("{what} associated to {count} entries")]
    DuplicateEntry { what: String, count: usize },
    #[error("account is locked")]
    AccountLocked,
    #[error("registration not completed (invite code {invite_code})")]
    IncompleteRegistration { invite_code: String },
    #[error("directory unavailable: {0}")]
    GatewayUnavailable(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    pub fn duplicate(what: impl Into<String>, count: usize) -> Self {
        IdentityError::DuplicateEntry {
            what: what.into(),
            count,
        }
    }

    /// Whether a stale cached profile must be dropped after this failure.
    pub fn evicts_cached_entry(&self) -> bool {
        matches!(
            self,
            IdentityError::NotFound
                | IdentityError::AccountLocked
                | IdentityError::DuplicateEntry { .. }
        )
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::NotFound => "not_found",
            IdentityError::DuplicateEntry { .. } => "duplicate_entry",
            IdentityError::AccountLocked => "account_locked",
            IdentityError::IncompleteRegistration { .. } => "incomplete_registration",
            IdentityError::GatewayUnavailable(_) => "directory_unavailable",
        }
    }
}

impl From<DirectoryError> for IdentityError {
    fn from(err: DirectoryError) -> Self {
        IdentityError::GatewayUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_integrity_failures_evict() {
        assert!(IdentityError::NotFound.evicts_cached_entry());
        assert!(IdentityError::AccountLocked.evicts_cached_entry());
        assert!(IdentityError::duplicate("handle bob", 2).evicts_cached_entry());
        assert!(!IdentityError::GatewayUnavailable("down".into()).evicts_cached_entry());
        assert!(
            !IdentityError::IncompleteRegistration {
                invite_code: "INV-7".into()
            }
            .evicts_cached_entry()
        );
    }

    #[test]
    fn gateway_errors_convert() {
        let err: IdentityError = DirectoryError::Connect("refused".into()).into();
        assert!(matches!(err, IdentityError::GatewayUnavailable(_)));
        assert_eq!(err.kind(), "directory_unavailable");
    }

    #[test]
    fn duplicate_message_names_the_key() {
        let err = IdentityError::duplicate("Telegram ID 5", 2);
        assert_eq!(err.to_string(), "Telegram ID 5 associated to 2 entries");
    }
}
