use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use inkpost::{app::build_app, config::AppConfig, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

// ─── Test helpers ───────────────────────────────────────────────────────

fn app() -> Router {
    build_app(AppState::in_memory(AppConfig::for_tests()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("Authorization", format!("Bearer {}", t));
    }
    let req = match body {
        Some(b) => req
            .header("Content-Type", "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Sends a body verbatim, with whatever content type (if any) is given.
async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    content_type: Option<&str>,
    body: &'static str,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("Authorization", format!("Bearer {}", t));
    }
    if let Some(ct) = content_type {
        req = req.header("Content-Type", ct);
    }
    let res = app
        .clone()
        .oneshot(req.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn assert_bad_request(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()), "{body}");
}

/// Signs up a user and returns (token, user id).
async fn signup(app: &Router, first: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "first_name": first,
            "last_name": "Doe",
            "email": email,
            "password": "Password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create(app: &Router, token: &str, title: &str, body: &str, tags: Value) -> Value {
    let (status, blog) = send(
        app,
        "POST",
        "/api/blogs",
        Some(token),
        Some(json!({ "title": title, "body": body, "tags": tags })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{blog}");
    blog
}

async fn publish(app: &Router, token: &str, id: &str) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/api/blogs/{id}"),
        Some(token),
        Some(json!({ "state": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

// ─── Auth ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn liveness() {
    let (status, body) = send(&app(), "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "up": true }));
}

#[tokio::test]
async fn signup_and_login_flow() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "first_name": "John",
            "last_name": "Doe",
            "email": "john@example.com",
            "password": "Password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], "john@example.com");
    assert_eq!(body["user"]["first_name"], "John");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "john@example.com", "password": "Password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], "john@example.com");
}

#[tokio::test]
async fn duplicate_signup_rejected() {
    let app = app();
    signup(&app, "Jane", "jane@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@example.com",
            "password": "pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_missing_field_is_bad_request() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "first_name": "A", "email": "a@b.co", "password": "p" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn signup_accepts_dotless_domain() {
    let app = app();
    signup(&app, "Jane", "jane@localhost").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "first_name": "No",
            "last_name": "At",
            "email": "no-at-sign",
            "password": "pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email");
}

#[tokio::test]
async fn unreadable_auth_bodies_are_bad_request() {
    let app = app();
    let signup_json = r#"{"first_name":"A","last_name":"B","email":"a@b.co","password":"p"}"#;

    let (status, body) =
        send_raw(&app, "POST", "/api/auth/signup", None, None, signup_json).await;
    assert_bad_request(status, &body);

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some("text/plain"),
        signup_json,
    )
    .await;
    assert_bad_request(status, &body);

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some("application/json"),
        r#"{"email":5,"password":"p"}"#,
    )
    .await;
    assert_bad_request(status, &body);

    let (status, body) =
        send_raw(&app, "POST", "/api/auth/login", None, Some("application/json"), "").await;
    assert_bad_request(status, &body);
}

#[tokio::test]
async fn login_does_not_leak_account_existence() {
    let app = app();
    signup(&app, "Jane", "jane@example.com").await;

    let (s1, wrong_pw) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com", "password": "wrong" })),
    )
    .await;
    let (s2, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@example.com", "password": "Password123" })),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["message"], unknown["message"]);

    let (s3, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com" })),
    )
    .await;
    assert_eq!(s3, StatusCode::BAD_REQUEST);
}

// ─── Blogs ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_requires_authentication() {
    let app = app();
    let body = Some(json!({ "title": "T", "body": "B" }));
    let (status, _) = send(&app, "POST", "/api/blogs", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/blogs", Some("not-a-token"), body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unreadable_blog_bodies_are_bad_request() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/blogs",
        Some(&token),
        Some("application/json"),
        "title=oops",
    )
    .await;
    assert_bad_request(status, &body);

    let (status, body) =
        send_raw(&app, "POST", "/api/blogs", Some(&token), None, "").await;
    assert_bad_request(status, &body);

    let blog = create(&app, &token, "Editable", "x", json!([])).await;
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());
    let (status, body) = send_raw(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some("application/json"),
        r#"{"title":42}"#,
    )
    .await;
    assert_bad_request(status, &body);
}

#[tokio::test]
async fn non_owner_is_forbidden_before_body_is_read() {
    let app = app();
    let (owner, _) = signup(&app, "Owner", "owner@example.com").await;
    let (other, _) = signup(&app, "Other", "other@example.com").await;
    let blog = create(&app, &owner, "Guarded", "x", json!([])).await;
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (status, body) = send_raw(
        &app,
        "PUT",
        &uri,
        Some(&other),
        Some("application/json"),
        r#"{"title":42}"#,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().is_some());

    let (status, _) = send_raw(&app, "PUT", &uri, Some(&other), None, "garbage").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_forces_draft_and_zero_reads() {
    let app = app();
    let (token, user_id) = signup(&app, "Author", "author1@example.com").await;
    let (status, blog) = send(
        &app,
        "POST",
        "/api/blogs",
        Some(&token),
        Some(json!({
            "title": "Sneaky",
            "body": words(201),
            "state": "published",
            "read_count": 500,
            "author": "00000000-0000-0000-0000-000000000000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(blog["state"], "draft");
    assert_eq!(blog["read_count"], 0);
    assert_eq!(blog["reading_time"], 2);
    assert_eq!(blog["author"]["id"], user_id.as_str());
    assert_eq!(blog["tags"], json!([]));
}

#[tokio::test]
async fn create_without_body_is_bad_request() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/blogs",
        Some(&token),
        Some(json!({ "title": "No body" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn titles_are_globally_unique() {
    let app = app();
    let (a, _) = signup(&app, "A", "a@example.com").await;
    let (b, _) = signup(&app, "B", "b@example.com").await;
    create(&app, &a, "Same Title", "x", json!([])).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/blogs",
        Some(&b),
        Some(json!({ "title": "Same Title", "body": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Blog title must be unique");
}

#[tokio::test]
async fn read_count_increments_per_fetch() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let blog = create(&app, &token, "Counted", "text", json!([])).await;
    let id = blog["id"].as_str().unwrap();
    publish(&app, &token, id).await;

    for n in 1..=4 {
        let (status, got) = send(&app, "GET", &format!("/api/blogs/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(got["read_count"], n);
    }
}

#[tokio::test]
async fn drafts_are_invisible_except_to_author() {
    let app = app();
    let (owner, _) = signup(&app, "Owner", "owner@example.com").await;
    let (other, _) = signup(&app, "Other", "other@example.com").await;
    let blog = create(&app, &owner, "Secret", "text", json!([])).await;
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, got) = send(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["read_count"], 1);
    assert_eq!(got["author"]["email"], "owner@example.com");

    // hidden drafts look exactly like missing records
    let (_, hidden) = send(&app, "GET", &uri, None, None).await;
    let (_, missing) = send(
        &app,
        "GET",
        "/api/blogs/00000000-0000-0000-0000-000000000000",
        None,
        None,
    )
    .await;
    assert_eq!(hidden, missing);
    let (status, _) = send(&app, "GET", "/api/blogs/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_without_state_never_returns_drafts() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    create(&app, &token, "Draft one", "text", json!([])).await;
    let published = create(&app, &token, "Public one", "text", json!([])).await;
    publish(&app, &token, published["id"].as_str().unwrap()).await;

    for t in [None, Some(token.as_str())] {
        let (status, page) = send(&app, "GET", "/api/blogs", t, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["title"], "Public one");
        assert_eq!(page["items"][0]["state"], "published");
    }
}

#[tokio::test]
async fn draft_listing_is_scoped_to_caller() {
    let app = app();
    let (owner, _) = signup(&app, "Owner", "owner@example.com").await;
    let (other, _) = signup(&app, "Other", "other@example.com").await;
    create(&app, &owner, "Owner draft", "text", json!([])).await;
    create(&app, &other, "Other draft", "text", json!([])).await;

    let (status, page) = send(&app, "GET", "/api/blogs?state=draft", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);
    assert_eq!(page["items"], json!([]));
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 20);

    let (_, page) = send(&app, "GET", "/api/blogs?state=draft", Some(&owner), None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Owner draft");

    // an author filter cannot reach into someone else's drafts
    let (_, page) = send(
        &app,
        "GET",
        "/api/blogs?state=draft&author=other",
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn non_owner_update_and_delete_are_forbidden() {
    let app = app();
    let (owner, _) = signup(&app, "Owner", "owner@example.com").await;
    let (other, _) = signup(&app, "Other", "other@example.com").await;
    let blog = create(&app, &owner, "Mine", "text", json!([])).await;
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (status, _) = send(&app, "PUT", &uri, Some(&other), Some(json!({ "title": "Theirs" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "PUT", &uri, None, Some(json!({ "title": "Anon" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        "PUT",
        "/api/blogs/00000000-0000-0000-0000-000000000000",
        Some(&owner),
        Some(json!({ "title": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn body_only_update_recomputes_reading_time() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let blog = create(&app, &token, "To Edit", "Some content", json!(["tech"])).await;
    assert_eq!(blog["reading_time"], 1);
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (status, updated) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "body": words(401) }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["reading_time"], 3);
    assert_eq!(updated["title"], "To Edit");
    assert_eq!(updated["tags"], json!(["tech"]));
    assert_eq!(updated["state"], "draft");

    let (status, updated) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "state": "archived" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["state"], "draft");
}

#[tokio::test]
async fn update_to_taken_title_conflicts() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    create(&app, &token, "First", "x", json!([])).await;
    let second = create(&app, &token, "Second", "x", json!([])).await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/blogs/{}", second["id"].as_str().unwrap()),
        Some(&token),
        Some(json!({ "title": "First" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn owner_can_delete() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let blog = create(&app, &token, "Short lived", "x", json!([])).await;
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted");

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_blogs_lists_every_state() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let (other, _) = signup(&app, "Other", "other@example.com").await;
    create(&app, &token, "Mine draft", "x", json!([])).await;
    let p = create(&app, &token, "Mine published", "x", json!([])).await;
    publish(&app, &token, p["id"].as_str().unwrap()).await;
    create(&app, &other, "Not mine", "x", json!([])).await;

    let (status, page) = send(&app, "GET", "/api/blogs/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);

    let (_, page) = send(&app, "GET", "/api/blogs/me?state=draft", Some(&token), None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Mine draft");

    let (status, _) = send(&app, "GET", "/api/blogs/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn search_filter_sort_and_paginate() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let (other, _) = signup(&app, "Grace", "grace@example.com").await;

    let titles = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];
    for (i, t) in titles.iter().enumerate() {
        let blog = create(
            &app,
            &token,
            t,
            &format!("body {} {}", t, words(50)),
            json!(["tag1", t.to_lowercase()]),
        )
        .await;
        let id = blog["id"].as_str().unwrap();
        publish(&app, &token, id).await;
        for _ in 0..i {
            send(&app, "GET", &format!("/api/blogs/{id}"), None, None).await;
        }
    }
    let g = create(&app, &other, "Graceful", "hello", json!("misc, tag1")).await;
    publish(&app, &other, g["id"].as_str().unwrap()).await;

    let (_, page) = send(&app, "GET", "/api/blogs", None, None).await;
    assert_eq!(page["total"], 6);

    let (_, page) = send(&app, "GET", "/api/blogs?search=alpha", None, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Alpha");

    // exact tag hit through the generic search
    let (_, page) = send(&app, "GET", "/api/blogs?search=misc", None, None).await;
    assert_eq!(page["total"], 1);

    let (_, page) = send(&app, "GET", "/api/blogs?tags=gamma,%20misc", None, None).await;
    assert_eq!(page["total"], 2);

    let (_, page) = send(&app, "GET", "/api/blogs?title=EPS", None, None).await;
    assert_eq!(page["total"], 1);

    let (_, page) = send(&app, "GET", "/api/blogs?author=grace", None, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["author"]["first_name"], "Grace");

    let (_, page) = send(&app, "GET", "/api/blogs?author=nobody-at-all", None, None).await;
    assert_eq!(page["total"], 0);

    let (_, page) = send(&app, "GET", "/api/blogs?order_by=read_count&order=desc", None, None).await;
    assert_eq!(page["items"][0]["title"], "Epsilon");
    let (_, page) = send(&app, "GET", "/api/blogs?order_by=read_count&order=asc", None, None).await;
    assert_eq!(page["items"][5]["title"], "Epsilon");

    let (_, page) = send(&app, "GET", "/api/blogs?page=2&limit=4", None, None).await;
    assert_eq!(page["total"], 6);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 4);

    let (status, page) = send(&app, "GET", "/api/blogs?page=abc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["page"].is_null());
    assert_eq!(page["items"].as_array().unwrap().len(), 6);

    let (status, page) = send(&app, "GET", "/api/blogs?page=1.5&limit=4", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1.5);
    assert_eq!(page["limit"], 4);
    assert_eq!(page["items"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn end_to_end_draft_to_published() {
    let app = app();
    let (token, _) = signup(&app, "Author", "author1@example.com").await;
    let blog = create(
        &app,
        &token,
        "My First Blog",
        &format!("This is content {}", words(300)),
        json!(["tech", "node"]),
    )
    .await;
    assert_eq!(blog["state"], "draft");
    let uri = format!("/api/blogs/{}", blog["id"].as_str().unwrap());

    let (_, got) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(got["read_count"], 1);
    assert_eq!(got["author"]["email"], "author1@example.com");

    let (status, updated) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "state": "published" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["state"], "published");

    let (_, page) = send(&app, "GET", "/api/blogs", None, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "My First Blog");

    let (status, got) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["read_count"], 2);
}
