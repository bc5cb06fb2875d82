use std::sync::Arc;

use awesome_blog::{
    blog::{self, AppState, Settings, User, auth::SessionKeys},
    db::ConnectionPool,
    orm::Database,
    web::MemoryTemplates,
};
use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWD: &str = "7c4a8d09ca3762af61e59520943dc26494f8941b";

async fn app() -> (axum::Router, Database) {
    let pool = ConnectionPool::in_memory()
        .await
        .expect("in-memory pool should open");
    let db = blog::register_models(pool).expect("models should register");
    db.create_tables().await.expect("tables should be created");

    let templates = MemoryTemplates::new()
        .with("blogs.html", "{{ page.item_count }} blogs|{{ __user__.name }}")
        .with("blog.html", "{{ blog.name }}|{{ blog.html_content }}|{{ comments | json }}")
        .with("signin.html", "<form>signin</form>");
    let settings = Settings {
        session: SessionKeys::new("test-secret", 3600),
        password_cost: 4,
        static_dir: "static".into(),
    };

    let state = AppState::new(db.clone(), Arc::new(templates), settings);
    let router = blog::build_router(state).expect("route table should be valid");
    (router, db)
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("response expected")
}

async fn body_text(response: Response) -> String {
    let body = response
        .into_body()
        .collect()
        .await
        .expect("response body should be readable")
        .to_bytes();
    String::from_utf8(body.to_vec()).expect("body should be utf-8")
}

async fn body_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    serde_json::from_slice(&body).expect("body should be valid JSON")
}

fn post_json(uri: &str, payload: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request should build")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request should build")
}

/// `name=value` part of a response's session cookie.
fn session_of(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("session cookie expected")
        .to_string()
}

async fn register(app: &axum::Router, email: &str, name: &str) -> (Value, String) {
    let response = send(
        app,
        post_json(
            "/api/users",
            json!({"email": email, "name": name, "passwd": PASSWD}),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_of(&response);
    (body_json(response).await, cookie)
}

async fn make_admin(db: &Database, id: &str) {
    let mut user = db
        .find::<User>(id)
        .await
        .expect("lookup should succeed")
        .expect("user should exist");
    user.admin = true;
    db.update(&user).await.expect("update should succeed");
}

#[tokio::test]
async fn register_masks_password_and_sets_session() {
    let (app, _db) = app().await;

    let (user, cookie) = register(&app, "reader@example.com", "Reader").await;
    assert_eq!(user["email"], "reader@example.com");
    assert_eq!(user["password_hash"], "******");
    assert_eq!(user["admin"], false);
    assert!(
        user["image_url"]
            .as_str()
            .is_some_and(|url| url.starts_with("http://www.gravatar.com/avatar/"))
    );
    assert!(cookie.starts_with("awesession="));

    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "0 blogs|Reader");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let (app, _db) = app().await;
    register(&app, "taken@example.com", "First").await;

    let cases = [
        (json!({"email": "taken@example.com", "name": "Again", "passwd": PASSWD}), "register:failed", "email"),
        (json!({"email": "not-an-email", "name": "X", "passwd": PASSWD}), "value:invalid", "email"),
        (json!({"email": "x@example.com", "name": "  ", "passwd": PASSWD}), "value:invalid", "name"),
        (json!({"email": "x@example.com", "name": "X", "passwd": "plain"}), "value:invalid", "passwd"),
    ];
    for (payload, error, data) in cases {
        let response = send(&app, post_json("/api/users", payload, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"], error);
        assert_eq!(body["data"], data);
    }
}

#[tokio::test]
async fn authenticate_checks_email_and_password() {
    let (app, _db) = app().await;
    register(&app, "author@example.com", "Author").await;

    let response = send(
        &app,
        post_json(
            "/api/authenticate",
            json!({"email": "nobody@example.com", "passwd": PASSWD}),
            None,
        ),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["message"], "Email not exist.");

    let response = send(
        &app,
        post_json(
            "/api/authenticate",
            json!({"email": "author@example.com", "passwd": "0".repeat(40)}),
            None,
        ),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["error"], "value:invalid");
    assert_eq!(body["data"], "passwd");

    let response = send(
        &app,
        post_json(
            "/api/authenticate",
            json!({"email": "author@example.com", "passwd": PASSWD}),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_of(&response);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Author");
    assert_eq!(body["password_hash"], "******");

    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(body_text(response).await, "0 blogs|Author");
}

#[tokio::test]
async fn malformed_requests_are_rejected_with_400() {
    let (app, _db) = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/authenticate")
        .body(Body::from("email=a"))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing Content-Type.");

    let response = send(&app, post_json("/api/authenticate", json!([1, 2]), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "JSON body must be object.");

    let response = send(
        &app,
        post_json("/api/authenticate", json!({"email": "a@b.com"}), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing argument: passwd");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/authenticate")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Unsupported Content-Type: text/plain");
}

#[tokio::test]
async fn blog_lifecycle_as_admin() {
    let (app, db) = app().await;
    let (user, cookie) = register(&app, "admin@example.com", "Admin").await;

    let blog_payload = json!({"name": "First post", "summary": "Hello", "content": "line one\nline <two>"});

    let response = send(&app, post_json("/api/blogs", blog_payload.clone(), Some(&cookie))).await;
    let body = body_json(response).await;
    assert_eq!(body["error"], "permission:forbidden");

    make_admin(&db, user["id"].as_str().expect("id should be a string")).await;

    let response = send(&app, post_json("/api/blogs", blog_payload, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let blog = body_json(response).await;
    let blog_id = blog["id"].as_str().expect("saved blog has an id").to_string();
    assert_eq!(blog["user_name"], "Admin");
    assert!(blog["created_at"].as_f64().is_some());

    let response = send(&app, get("/api/blogs", None)).await;
    let body = body_json(response).await;
    assert_eq!(body["page"]["item_count"], 1);
    assert_eq!(body["blogs"][0]["name"], "First post");

    let response = send(
        &app,
        post_json(
            &format!("/api/blogs/{blog_id}"),
            json!({"name": "Renamed", "summary": "Hello", "content": "updated"}),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "Renamed");

    let response = send(&app, get(&format!("/api/blogs/{blog_id}"), None)).await;
    assert_eq!(body_json(response).await["content"], "updated");

    let response = send(
        &app,
        post_json(&format!("/api/blogs/{blog_id}/delete"), json!({}), Some(&cookie)),
    )
    .await;
    assert_eq!(body_json(response).await, json!({"id": blog_id}));

    let response = send(&app, get(&format!("/api/blogs/{blog_id}"), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["error"], "value:notfound");
    assert_eq!(body["data"], "blog");
}

#[tokio::test]
async fn comments_need_a_signed_in_user() {
    let (app, db) = app().await;
    let (user, cookie) = register(&app, "admin@example.com", "Admin").await;
    make_admin(&db, user["id"].as_str().expect("id should be a string")).await;

    let response = send(
        &app,
        post_json(
            "/api/blogs",
            json!({"name": "Post", "summary": "S", "content": "first\n\nsecond & more"}),
            Some(&cookie),
        ),
    )
    .await;
    let blog_id = body_json(response).await["id"]
        .as_str()
        .expect("saved blog has an id")
        .to_string();
    let comments_uri = format!("/api/blogs/{blog_id}/comments");

    let response = send(&app, post_json(&comments_uri, json!({"content": "hi"}), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["error"], "permission:forbidden");
    assert_eq!(body["message"], "Please signin first.");

    let response = send(
        &app,
        post_json(&comments_uri, json!({"content": "Nice post"}), Some(&cookie)),
    )
    .await;
    let comment = body_json(response).await;
    assert_eq!(comment["blog_id"], blog_id.as_str());
    assert_eq!(comment["user_name"], "Admin");

    let response = send(&app, get(&format!("/blog/{blog_id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.starts_with("Post|&lt;p&gt;first&lt;/p&gt;&lt;p&gt;second &amp;amp; more&lt;/p&gt;|"));
    assert!(page.contains("Nice post"));

    let response = send(&app, get("/api/comments", None)).await;
    assert_eq!(body_json(response).await["page"]["item_count"], 1);

    let comment_id = comment["id"].as_str().expect("saved comment has an id");
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/comments/{comment_id}/delete"))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(body_json(response).await["id"], comment_id);

    let response = send(&app, get("/api/comments", None)).await;
    assert_eq!(body_json(response).await["page"]["item_count"], 0);
}

#[tokio::test]
async fn manage_pages_require_an_admin() {
    let (app, db) = app().await;

    let response = send(&app, get("/manage/", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/signin");

    let (user, cookie) = register(&app, "admin@example.com", "Admin").await;
    let response = send(&app, get("/manage/blogs", Some(&cookie))).await;
    assert_eq!(response.headers()[header::LOCATION], "/signin");

    make_admin(&db, user["id"].as_str().expect("id should be a string")).await;
    let response = send(&app, get("/manage/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/manage/comments");
}

#[tokio::test]
async fn signout_expires_the_session() {
    let (app, _db) = app().await;

    let request = Request::builder()
        .uri("/signout")
        .header(header::REFERER, "/blog/abc")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/blog/abc");
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .expect("cookie should be ascii");
    assert!(cookie.starts_with("awesession=-deleted-;"));
    assert!(cookie.contains("Max-Age=0"));

    let response = send(&app, get("/signout", None)).await;
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn forged_cookie_is_anonymous() {
    let (app, _db) = app().await;
    let (user, _cookie) = register(&app, "reader@example.com", "Reader").await;
    let forged = format!(
        "awesession={}-9999999999-{}",
        user["id"].as_str().expect("id should be a string"),
        "0".repeat(40)
    );

    let response = send(&app, get("/", Some(&forged))).await;
    assert_eq!(body_text(response).await, "0 blogs|");
}

#[tokio::test]
async fn missing_template_is_a_server_error() {
    let (app, _db) = app().await;
    let response = send(&app, get("/register", None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = send(&app, get("/signin", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<form>signin</form>");
}

#[tokio::test]
async fn delete_uses_the_path_id_over_the_body_id() {
    let (app, db) = app().await;
    let (user, cookie) = register(&app, "admin@example.com", "Admin").await;
    make_admin(&db, user["id"].as_str().expect("id should be a string")).await;

    let mut ids = Vec::new();
    for name in ["keep", "doomed"] {
        let response = send(
            &app,
            post_json(
                "/api/blogs",
                json!({"name": name, "summary": "s", "content": "c"}),
                Some(&cookie),
            ),
        )
        .await;
        let id = body_json(response).await["id"]
            .as_str()
            .expect("saved blog has an id")
            .to_string();
        ids.push(id);
    }
    let (keep, doomed) = (&ids[0], &ids[1]);

    let response = send(
        &app,
        post_json(
            &format!("/api/blogs/{doomed}/delete"),
            json!({"id": keep}),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(body_json(response).await, json!({"id": doomed}));

    let response = send(&app, get(&format!("/api/blogs/{keep}"), None)).await;
    assert_eq!(body_json(response).await["name"], "keep");
    let response = send(&app, get(&format!("/api/blogs/{doomed}"), None)).await;
    assert_eq!(body_json(response).await["error"], "value:notfound");
}
