/// Integration tests for the Company HQ API
///
/// These drive the full router end-to-end:
/// - registration, login, logout and session resolution
/// - ownership-scoped resource CRUD
/// - AI assistant quota and access toggling
/// - pipeline trigger and health

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_register_login_me() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "secret1",
                "passwordConfirm": "secret1"
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["username"], "alice");
    assert_eq!(response.body["role"], "admin");
    assert_eq!(response.body["aiEnabled"], true);
    assert!(response.body["expiresAt"].is_string());

    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("hq_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    let login = app
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({"email": "alice@example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap().to_string();

    let me = app.get("/v1/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");
    assert_eq!(me.body["email"], "alice@example.com");
    assert!(me.body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({"username": "alice", "email": "alice@example.com", "password": "secret1"})),
        )
        .await;
    let set_cookie = response.set_cookie().unwrap();
    let pair = set_cookie.split(';').next().unwrap().to_string();

    let request = Request::builder()
        .uri("/v1/auth/me")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let me = app.send(request).await;

    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = TestApp::new().await;

    for uri in ["/v1/auth/me", "/v1/users", "/v1/resources/tasks", "/v1/ai/quota"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(response.body["code"], "unauthenticated");
    }

    let bogus = app.get("/v1/auth/me", "not-a-real-token").await;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let wrong = app
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({"username": "alice", "password": "nope-nope"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let missing = app
        .request(Method::POST, "/v1/auth/login", None, Some(json!({"username": "alice"})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["code"], "validation_error");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let duplicate = app
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({"username": "alice", "email": "other@example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["code"], "duplicate_identifier");

    let weak = app
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({"username": "bob", "email": "bob@example.com", "password": "123"})),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert_eq!(weak.body["details"][0]["field"], "password");

    let malformed = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let response = app
        .request(Method::POST, "/v1/auth/logout", Some(&alice.token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logged out successfully");
    assert!(response.set_cookie().unwrap().contains("Max-Age=0"));

    let me = app.get("/v1/auth/me", &alice.token).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_crud_and_ownership() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;

    let created = app
        .post(
            "/v1/resources/tasks",
            &alice.token,
            json!({"title": "Ship release", "assignedTo": bob.id, "priority": "high"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["status"], "todo");
    assert_eq!(created.body["assigneeName"], "bob");
    let id = created.body["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/resources/tasks/{}", id);

    let listed = app.get("/v1/resources/tasks", &bob.token).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let hidden = app.get("/v1/resources/tasks", &carol.token).await;
    assert_eq!(hidden.body, json!([]));

    let by_assignee = app.patch(&uri, &bob.token, json!({"status": "done"})).await;
    assert_eq!(by_assignee.status, StatusCode::OK);
    assert_eq!(by_assignee.body["status"], "done");
    assert_eq!(by_assignee.body["title"], "Ship release");

    let by_stranger = app.patch(&uri, &carol.token, json!({"status": "todo"})).await;
    assert_eq!(by_stranger.status, StatusCode::FORBIDDEN);

    let delete_by_assignee = app.delete(&uri, &bob.token).await;
    assert_eq!(delete_by_assignee.status, StatusCode::FORBIDDEN);

    let deleted = app.delete(&uri, &alice.token).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Task deleted");

    let again = app.delete(&uri, &alice.token).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.body["error"], "Task not found");
}

#[tokio::test]
async fn test_resource_validation() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let untitled = app.post("/v1/resources/tasks", &alice.token, json!({})).await;
    assert_eq!(untitled.status, StatusCode::BAD_REQUEST);
    assert_eq!(untitled.body["details"][0]["field"], "title");

    let bad_status = app
        .post("/v1/resources/tasks", &alice.token, json!({"title": "x", "status": "someday"}))
        .await;
    assert_eq!(bad_status.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_status.body["code"], "validation_error");

    let backwards = app
        .post(
            "/v1/resources/events",
            &alice.token,
            json!({"title": "Standup", "start": "2026-03-02T10:00:00Z", "end": "2026-03-02T09:00:00Z"}),
        )
        .await;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shared_notes_and_events() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let note = app
        .post(
            "/v1/resources/notes",
            &alice.token,
            json!({"title": "Handbook", "content": "Be kind", "isShared": true}),
        )
        .await;
    assert_eq!(note.status, StatusCode::CREATED);
    let note_uri = format!("/v1/resources/notes/{}", note.body["id"].as_str().unwrap());

    let visible = app.get("/v1/resources/notes", &bob.token).await;
    assert_eq!(visible.body[0]["title"], "Handbook");

    let edit = app.patch(&note_uri, &bob.token, json!({"content": "Be mean"})).await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);

    let event = app
        .post("/v1/resources/events", &alice.token, json!({"title": "Offsite", "date": "2026-05-01"}))
        .await;
    assert_eq!(event.status, StatusCode::CREATED);
    assert_eq!(event.body["allDay"], true);
    assert_eq!(event.body["color"], "#3788d8");

    let bobs_events = app.get("/v1/resources/events", &bob.token).await;
    assert_eq!(bobs_events.body, json!([]));
}

#[tokio::test]
async fn test_unknown_kind_and_id() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let kind = app.get("/v1/resources/widgets", &alice.token).await;
    assert_eq!(kind.status, StatusCode::NOT_FOUND);

    let missing = app
        .patch(
            &format!("/v1/resources/notes/{}", uuid::Uuid::new_v4()),
            &alice.token,
            json!({"title": "x"}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "Note not found");
}

#[tokio::test]
async fn test_malformed_ids_are_json_not_found() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let delete = app.delete("/v1/resources/tasks/123", &alice.token).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(delete.body["error"], "Task not found");
    assert_eq!(delete.body["code"], "not_found");
    assert!(delete.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let update = app
        .patch("/v1/resources/events/not-a-uuid", &alice.token, json!({"title": "x"}))
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);
    assert_eq!(update.body["error"], "Event not found");

    let toggle = app.patch("/v1/users/abc/ai-toggle", &alice.token, json!({})).await;
    assert_eq!(toggle.status, StatusCode::NOT_FOUND);
    assert_eq!(toggle.body["error"], "User not found");

    let still_unknown_kind = app.delete("/v1/resources/widgets/123", &alice.token).await;
    assert_eq!(still_unknown_kind.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_and_ai_toggle() {
    let app = TestApp::new().await;
    let admin = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;

    let users = app.get("/v1/users", &bob.token).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body.as_array().unwrap().len(), 3);
    assert!(users.body[0].get("passwordHash").is_none());

    let toggle_bob = format!("/v1/users/{}/ai-toggle", bob.id);

    let by_other_member = app.patch(&toggle_bob, &carol.token, json!({})).await;
    assert_eq!(by_other_member.status, StatusCode::FORBIDDEN);

    let by_self = app.patch(&toggle_bob, &bob.token, json!({})).await;
    assert_eq!(by_self.status, StatusCode::OK);
    assert_eq!(by_self.body["aiEnabled"], false);

    let by_admin = app.patch(&toggle_bob, &admin.token, json!({})).await;
    assert_eq!(by_admin.body["aiEnabled"], true);

    let unknown = app
        .patch(&format!("/v1/users/{}/ai-toggle", uuid::Uuid::new_v4()), &admin.token, json!({}))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ai_query_and_quota() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let answer = app
        .post("/v1/ai/query", &alice.token, json!({"prompt": "Summarize the week", "taskType": "summary"}))
        .await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body["response"], "echo: Summarize the week");
    assert_eq!(answer.body["requestsRemaining"], 49);

    let quota = app.get("/v1/ai/quota", &alice.token).await;
    assert_eq!(quota.body, json!({"used": 1, "limit": 50, "remaining": 49}));

    let blank = app.post("/v1/ai/query", &alice.token, json!({"prompt": "   "})).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.generator_calls(), 1);
}

#[tokio::test]
async fn test_ai_disabled_and_unconfigured() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    app.patch(&format!("/v1/users/{}/ai-toggle", alice.id), &alice.token, json!({}))
        .await;
    let disabled = app.post("/v1/ai/query", &alice.token, json!({"prompt": "hi"})).await;
    assert_eq!(disabled.status, StatusCode::FORBIDDEN);
    assert_eq!(app.generator_calls(), 0);

    let bare = TestApp::without_ai().await;
    let bob = bare.register("bob").await;
    let unconfigured = bare.post("/v1/ai/query", &bob.token, json!({"prompt": "hi"})).await;
    assert_eq!(unconfigured.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_ai_route_formats_query() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let routed = app
        .post("/v1/ai/route", &alice.token, json!({"query": "How did sales do?"}))
        .await;
    assert_eq!(routed.status, StatusCode::OK);
    assert_eq!(routed.body["tool"], "full_pipeline");
    assert_eq!(routed.body["formattedPayload"]["query"], "How did sales do?");

    let blank = app.post("/v1/ai/route", &alice.token, json!({"query": ""})).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.generator_calls(), 0);
}

#[tokio::test]
async fn test_trigger_unknown_action_runs_pipeline() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/trigger", None, Some(json!({"action": "bogus"})))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pipeline_exit"], 0);
    assert_eq!(response.body["route"]["tool"], "full_pipeline");
    assert_eq!(response.body["route"]["route"]["fallback"], true);
}

#[tokio::test]
async fn test_trigger_tool_and_empty_body() {
    let app = TestApp::new().await;

    let missing_input = app
        .request(Method::POST, "/trigger", None, Some(json!({"action": "analyze"})))
        .await;
    assert_eq!(missing_input.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(missing_input.body["tool_exit"], 2);

    let empty = app.request(Method::GET, "/trigger", None, None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["pipeline_exit"], 0);
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "connected");
    assert_eq!(response.body["dataSource"], "none");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers.get("strict-transport-security").is_none());
}
