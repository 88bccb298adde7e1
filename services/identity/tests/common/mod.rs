#![allow(dead_code)]

use axum::body::Body;
use roster_directory::{Entry, MemoryDirectory};
use roster_identity::app::{AppState, build_router};
use roster_identity::identity::{AdminGroups, DirectoryLayout, Invites, People, Resolver, Users};
use std::sync::Arc;
use std::time::Duration;

pub const PEOPLE: &str = "ou=People,dc=example,dc=it";
pub const INVITES: &str = "ou=Invites,dc=example,dc=it";
pub const ADMINS: &str = "cn=Admins,ou=Groups,dc=example,dc=it";
pub const INVITE_LINK: &str = "https://example.com/register?invite=";
pub const TTL: Duration = Duration::from_secs(3600);

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn person(uid: &str) -> Entry {
    Entry::new(format!("uid={uid},{PEOPLE}"))
        .with("objectClass", ["weeeOpenPerson"])
        .with("uid", [uid])
        .with("cn", [format!("{uid} cn")])
}

pub fn invite(cn: &str, code: &str) -> Entry {
    Entry::new(format!("cn={cn},{INVITES}")).with("inviteCode", [code])
}

pub fn person_dn(uid: &str) -> String {
    format!("uid={uid},{PEOPLE}")
}

/// In-memory directory plus the identity components wired over it.
pub struct Fixture {
    pub directory: MemoryDirectory,
    pub state: AppState,
}

impl Fixture {
    pub fn new() -> Self {
        let directory = MemoryDirectory::new();
        let connector = Arc::new(directory.clone());
        let admin_groups = Arc::new(AdminGroups::new([ADMINS]));
        let resolver = Resolver::new(
            DirectoryLayout {
                people_tree: PEOPLE.to_string(),
                invite_tree: INVITES.to_string(),
            },
            admin_groups.clone(),
        );
        let state = AppState {
            users: Arc::new(Users::new(connector.clone(), resolver, TTL)),
            people: Arc::new(People::new(connector.clone(), PEOPLE, admin_groups, TTL)),
            invites: Arc::new(Invites::new(connector.clone(), INVITES)),
            invite_link: Some(INVITE_LINK.to_string()),
            directory: connector,
        };
        Self { directory, state }
    }

    pub fn users(&self) -> &Users {
        &self.state.users
    }

    pub fn people(&self) -> &People {
        &self.state.people
    }

    pub fn invites(&self) -> &Invites {
        &self.state.invites
    }

    pub fn app(&self) -> axum::routing::RouterIntoService<Body, ()> {
        build_router(self.state.clone()).into_service()
    }
}
