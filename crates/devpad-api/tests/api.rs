//! Acceptance tests driving the full router over in-memory SQLite.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use devpad_api::{AppStateInner, router};
use devpad_db::Database;

const TEST_SECRET: &str = "test-secret";

fn test_app() -> Router {
    let db = Database::open_in_memory().expect("in-memory db");
    router(Arc::new(AppStateInner {
        db,
        jwt_secret: TEST_SECRET.into(),
    }))
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "Password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_note(app: &Router, token: &str, body: Value) -> i64 {
    let (status, body) = send(app, "POST", "/api/notes", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn list_notes(app: &Router, token: &str) -> Vec<Value> {
    let (status, body) = send(app, "GET", "/api/notes", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().unwrap().clone()
}

fn tag_set(note: &Value) -> HashSet<String> {
    note["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect()
}

/// Creation timestamps land in the same millisecond occasionally; a short
/// pause keeps the ordering assertions deterministic.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn ping_answers_without_auth() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/ping", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong from DevPad!");
}

#[tokio::test]
async fn register_and_login_issue_usable_tokens() {
    let app = test_app();

    let register_token = register(&app, "user@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "user@example.com", "password": "Password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["access_token"].as_str().unwrap().to_string();

    // Both tokens authenticate the same identity
    let note_id = create_note(&app, &register_token, json!({ "title": "via register" })).await;
    let notes = list_notes(&app, &login_token).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["id"].as_i64().unwrap(), note_id);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = test_app();
    register(&app, "dup@example.com").await;

    // Password equality is irrelevant to the conflict
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "dup@example.com", "password": "Different456" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["msg"], "User already exists");
}

#[tokio::test]
async fn register_requires_email_and_password() {
    let app = test_app();

    for body in [
        json!({}),
        json!({ "email": "a@example.com" }),
        json!({ "password": "Password123" }),
        json!({ "email": "", "password": "Password123" }),
        json!({ "email": "a@example.com", "password": "" }),
    ] {
        let (status, body) = send(&app, "POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], "Email and password required");
    }
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = test_app();
    register(&app, "user@example.com").await;

    for body in [
        json!({ "email": "user@example.com", "password": "WrongPassword" }),
        json!({ "email": "nobody@example.com", "password": "Password123" }),
    ] {
        let (status, body) = send(&app, "POST", "/api/auth/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "Bad credentials");
    }
}

#[tokio::test]
async fn note_routes_require_a_valid_token() {
    let app = test_app();

    let (status, _) = send(&app, "GET", "/api/notes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/notes", Some("garbage"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PUT", "/api/notes/1", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", "/api/notes/1", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_and_expired_tokens_are_rejected() {
    use devpad_types::api::Claims;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let app = test_app();
    let now = chrono::Utc::now().timestamp();

    // Signed with a different secret
    let claims = Claims {
        sub: 1,
        iat: now as usize,
        exp: (now + 3600) as usize,
    };
    let forged = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"other-secret"),
    )
    .unwrap();
    let (status, _) = send(&app, "GET", "/api/notes", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct secret, expired well past the validation leeway
    let claims = Claims {
        sub: 1,
        iat: (now - 10_000) as usize,
        exp: (now - 7200) as usize,
    };
    let expired = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    let (status, _) = send(&app, "GET", "/api/notes", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_note_applies_defaults() {
    let app = test_app();
    let token = register(&app, "user@example.com").await;

    create_note(&app, &token, json!({})).await;

    let notes = list_notes(&app, &token).await;
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note["title"], "Untitled");
    assert_eq!(note["content_md"], "");
    assert_eq!(note["language"], "plaintext");
    assert_eq!(note["favorite"], false);
    assert!(note["tags"].as_array().unwrap().is_empty());
    assert!(note["created_at"].is_string());
    assert!(note["updated_at"].is_string());
    assert!(note["last_viewed_at"].is_null());
}

#[tokio::test]
async fn list_orders_most_recently_updated_first() {
    let app = test_app();
    let token = register(&app, "user@example.com").await;

    let n1 = create_note(&app, &token, json!({ "title": "First" })).await;
    settle().await;
    let n2 = create_note(&app, &token, json!({ "title": "Second" })).await;
    settle().await;
    let n3 = create_note(&app, &token, json!({ "title": "Third" })).await;

    let ids: Vec<i64> = list_notes(&app, &token)
        .await
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![n3, n2, n1]);

    // Updating the oldest note moves it to the front
    settle().await;
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/notes/{n1}"),
        Some(&token),
        Some(json!({ "favorite": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Updated");

    let ids: Vec<i64> = list_notes(&app, &token)
        .await
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![n1, n3, n2]);
}

#[tokio::test]
async fn notes_are_isolated_per_user() {
    let app = test_app();
    let owner = register(&app, "owner@example.com").await;
    let other = register(&app, "other@example.com").await;

    let note = create_note(&app, &owner, json!({ "title": "Private" })).await;

    assert!(list_notes(&app, &other).await.is_empty());

    // Someone else's existing note is 403, never 404
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/notes/{note}"),
        Some(&other),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["msg"], "Forbidden");

    let (status, _) = send(&app, "DELETE", &format!("/api/notes/{note}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A genuinely absent id is 404 for everyone
    let (status, _) = send(
        &app,
        "PUT",
        "/api/notes/99999",
        Some(&other),
        Some(json!({ "title": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/notes/99999", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The failed attempts changed nothing
    let notes = list_notes(&app, &owner).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Private");
}

#[tokio::test]
async fn tags_round_trip_and_replace() {
    let app = test_app();
    let token = register(&app, "user@example.com").await;

    let note = create_note(&app, &token, json!({ "tags": ["a", "b"] })).await;
    settle().await;
    create_note(&app, &token, json!({ "tags": ["a"] })).await;

    let notes = list_notes(&app, &token).await;
    assert_eq!(tag_set(&notes[1]), HashSet::from(["a".into(), "b".into()]));
    assert_eq!(tag_set(&notes[0]), HashSet::from(["a".into()]));

    // A provided list fully replaces the set
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/notes/{note}"),
        Some(&token),
        Some(json!({ "tags": ["c"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Omitting the field leaves tags untouched
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/notes/{note}"),
        Some(&token),
        Some(json!({ "title": "still tagged c" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let notes = list_notes(&app, &token).await;
    let updated = notes
        .iter()
        .find(|n| n["id"].as_i64().unwrap() == note)
        .unwrap();
    assert_eq!(tag_set(updated), HashSet::from(["c".into()]));

    // An empty list clears
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/notes/{note}"),
        Some(&token),
        Some(json!({ "tags": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let notes = list_notes(&app, &token).await;
    let cleared = notes
        .iter()
        .find(|n| n["id"].as_i64().unwrap() == note)
        .unwrap();
    assert!(cleared["tags"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_removes_note_and_keeps_tags_usable() {
    let app = test_app();
    let token = register(&app, "user@example.com").await;

    let note = create_note(&app, &token, json!({ "tags": ["shared"] })).await;

    let (status, body) = send(&app, "DELETE", &format!("/api/notes/{note}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Deleted");

    assert!(list_notes(&app, &token).await.is_empty());

    // The tag name is still attachable afterwards
    create_note(&app, &token, json!({ "tags": ["shared"] })).await;
    let notes = list_notes(&app, &token).await;
    assert_eq!(tag_set(&notes[0]), HashSet::from(["shared".into()]));
}

#[tokio::test]
async fn partial_update_overwrites_only_provided_fields() {
    let app = test_app();
    let token = register(&app, "user@example.com").await;

    let note = create_note(
        &app,
        &token,
        json!({
            "title": "Original",
            "content_md": "# Body",
            "language": "markdown",
            "favorite": true,
            "tags": ["keep"]
        }),
    )
    .await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/notes/{note}"),
        Some(&token),
        Some(json!({ "title": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let notes = list_notes(&app, &token).await;
    let updated = &notes[0];
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["content_md"], "# Body");
    assert_eq!(updated["language"], "markdown");
    assert_eq!(updated["favorite"], true);
    assert_eq!(tag_set(updated), HashSet::from(["keep".into()]));
}
