//! Directory schema constants and the search filters built from them.
//!
//! # Purpose
//! Keeps attribute names and filter shapes in one place so the resolution
//! protocol, roster, and invite flows agree on them.
//!
//! # Key invariants
//! - The unbound-handle filter always excludes entries that already carry an
//!   external ID. Once an entry is bound it can only be found by ID again.
use crate::model::ExternalId;
use roster_directory::Filter;

pub const OBJECT_CLASS: &str = "objectClass";
pub const PERSON_CLASS: &str = "weeeOpenPerson";

pub const UID: &str = "uid";
pub const CN: &str = "cn";
pub const GIVEN_NAME: &str = "givenname";
pub const SURNAME: &str = "sn";
pub const MEMBER_OF: &str = "memberof";
pub const TELEGRAM_ID: &str = "telegramid";
pub const TELEGRAM_NICKNAME: &str = "telegramnickname";
pub const ACCOUNT_LOCK: &str = "nsaccountlock";
pub const INVITE_CODE: &str = "invitecode";

/// Projection used for full profile resolution and stale refreshes.
pub const USER_ATTRIBUTES: &[&str] = &[
    UID,
    CN,
    GIVEN_NAME,
    SURNAME,
    MEMBER_OF,
    TELEGRAM_NICKNAME,
    TELEGRAM_ID,
    ACCOUNT_LOCK,
];

/// Projection used for roster syncs.
pub const PERSON_ATTRIBUTES: &[&str] = &[UID, CN, MEMBER_OF, TELEGRAM_NICKNAME, TELEGRAM_ID];

pub const INVITE_ATTRIBUTES: &[&str] = &[INVITE_CODE, TELEGRAM_ID];

pub fn all_people() -> Filter {
    Filter::equals(OBJECT_CLASS, PERSON_CLASS)
}

pub fn person_by_external_id(external_id: ExternalId) -> Filter {
    Filter::and([all_people(), Filter::equals(TELEGRAM_ID, external_id.to_string())])
}

pub fn unbound_person_by_handle(handle: &str) -> Filter {
    Filter::and([
        all_people(),
        Filter::not(Filter::present(TELEGRAM_ID)),
        Filter::equals(TELEGRAM_NICKNAME, handle),
    ])
}

pub fn invite_by_external_id(external_id: ExternalId) -> Filter {
    Filter::and([
        Filter::present(INVITE_CODE),
        Filter::equals(TELEGRAM_ID, external_id.to_string()),
    ])
}

pub fn invite_by_code(code: &str) -> Filter {
    Filter::equals(INVITE_CODE, code)
}
