mod common;

use axum::http::StatusCode;
use common::{ADMINS, Fixture, INVITES, invite, person, read_json};
use http_helpers::{empty_request, json_request};
use tower::ServiceExt;

async fn seeded() -> Fixture {
    let fixture = Fixture::new();
    fixture
        .directory
        .insert(
            person("alice")
                .with("givenName", ["Alice"])
                .with("sn", ["Liddell"])
                .with("memberOf", [ADMINS])
                .with("telegramId", ["555"])
                .with("telegramNickname", ["alice"]),
        )
        .await;
    fixture
        .directory
        .insert(
            person("eve")
                .with("telegramId", ["13"])
                .with("nsAccountLock", ["true"]),
        )
        .await;
    fixture
        .directory
        .insert(invite("pending", "INV-7").with("telegramId", ["42"]))
        .await;
    fixture.directory.insert(invite("fresh", "NEW-1")).await;
    fixture
}

#[tokio::test]
async fn resolves_users_over_http() {
    let fixture = seeded().await;
    let app = fixture.app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/555?handle=alice"))
        .await
        .expect("user");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["external_id"], 555);
    assert_eq!(body["uid"], "alice");
    assert_eq!(body["display_name"], "Alice Liddell");
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["handle"], "alice");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/not-a-number"))
        .await
        .expect("bad id");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn identity_failures_map_to_statuses() {
    let fixture = seeded().await;
    let app = fixture.app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/13"))
        .await
        .expect("locked");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["code"], "account_locked");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/7?handle=ghost"))
        .await
        .expect("unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "not_found");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/42"))
        .await
        .expect("legacy");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["code"], "incomplete_registration");
    assert_eq!(body["invite_code"], "INV-7");
    assert_eq!(
        body["invite_link"],
        "https://example.com/register?invite=INV-7"
    );

    fixture.directory.set_unavailable(true);
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/users/555"))
        .await
        .expect("outage");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(read_json(response).await["code"], "directory_unavailable");
}

#[tokio::test]
async fn roster_lookups_over_http() {
    let fixture = seeded().await;
    let app = fixture.app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/people/ALICE"))
        .await
        .expect("person");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["uid"], "alice");
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["external_id"], 555);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/people/nobody"))
        .await
        .expect("unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "unknown_person");
}

#[tokio::test]
async fn redeems_invites_over_http() {
    let fixture = seeded().await;
    let app = fixture.app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/invites/redeem",
            serde_json::json!({ "code": "NEW-1", "external_id": 777, "handle": "newbie" }),
        ))
        .await
        .expect("redeem");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let entry = fixture
        .directory
        .get(&format!("cn=fresh,{INVITES}"))
        .await
        .expect("entry");
    assert_eq!(entry.first("telegramId"), Some("777"));
    assert_eq!(entry.first("telegramNickname"), Some("newbie"));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/invites/redeem",
            serde_json::json!({ "code": "MISSING", "external_id": 777 }),
        ))
        .await
        .expect("unknown code");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/invites/redeem",
            serde_json::json!({ "code": "  ", "external_id": 777 }),
        ))
        .await
        .expect("empty code");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_busting_reports_counts() {
    let fixture = seeded().await;
    let app = fixture.app();

    app.clone()
        .oneshot(empty_request("GET", "/v1/users/555"))
        .await
        .expect("warm users");
    app.clone()
        .oneshot(empty_request("GET", "/v1/people/alice"))
        .await
        .expect("warm roster");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/caches/users"))
        .await
        .expect("bust users");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["busted"], 1);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/caches/people"))
        .await
        .expect("bust people");
    assert_eq!(read_json(response).await["busted"], 2);
    assert!(fixture.users().is_empty().await);
}

#[tokio::test]
async fn health_and_openapi() {
    let fixture = seeded().await;
    let app = fixture.app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/system/health"))
        .await
        .expect("health");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    let stats = fixture.directory.stats();
    assert_eq!(stats.opens, stats.closes);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/openapi.json"))
        .await
        .expect("openapi");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["paths"]["/v1/users/{external_id}"].is_object());
    assert!(body["paths"]["/v1/invites/redeem"].is_object());

    fixture.directory.set_unavailable(true);
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/system/health"))
        .await
        .expect("health down");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
