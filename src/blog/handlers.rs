use super::auth::{gravatar_url, hash_password, set_cookie_header, user2cookie, verify_password};
use super::middleware::current_user;
use super::models::{Blog, Comment, User, next_id};
use super::state::AppState;
use crate::orm::{Database, FindAll, Limit, Model};
use crate::web::{
    ApiError, CallArgs, HandlerDef, HandlerError, HandlerResult, HandlerSource, Page,
    ParameterPlan, Reply, get_page_index,
};
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Value as JsonValue, json};
use tracing::info;

lazy_static! {
    static ref RE_EMAIL: Regex =
        Regex::new(r"^[a-z0-9\.\-\_]+\@[a-z0-9\-\_]+(\.[a-z0-9\-\_]+){1,4}$")
            .expect("email pattern is valid");
    static ref RE_SHA1: Regex = Regex::new(r"^[0-9a-f]{40}$").expect("sha1 pattern is valid");
}

/// Every page and API route of the blog.
pub struct BlogHandlers;

impl HandlerSource<AppState> for BlogHandlers {
    fn handlers(&self) -> Vec<HandlerDef<AppState>> {
        let paged = || ParameterPlan::new().keyword("page");
        let blog_form = || {
            ParameterPlan::new()
                .request()
                .required("name")
                .required("summary")
                .required("content")
        };

        vec![
            // pages
            HandlerDef::get("/", "index", index).plan(paged()),
            HandlerDef::get("/blog/{id}", "get_blog", get_blog),
            HandlerDef::get("/register", "register", register),
            HandlerDef::get("/signin", "signin", signin),
            HandlerDef::get("/signout", "signout", signout).plan(ParameterPlan::new().request()),
            HandlerDef::get("/manage/", "manage", manage),
            HandlerDef::get("/manage/comments", "manage_comments", manage_comments).plan(paged()),
            HandlerDef::get("/manage/blogs", "manage_blogs", manage_blogs).plan(paged()),
            HandlerDef::get("/manage/blogs/create", "manage_create_blog", manage_create_blog),
            HandlerDef::get("/manage/blogs/edit", "manage_edit_blog", manage_edit_blog)
                .plan(ParameterPlan::new().required("id")),
            HandlerDef::get("/manage/users", "manage_users", manage_users).plan(paged()),
            // users
            HandlerDef::get("/api/users", "api_get_users", api_get_users).plan(paged()),
            HandlerDef::post("/api/users", "api_register_user", api_register_user).plan(
                ParameterPlan::new()
                    .required("email")
                    .required("name")
                    .required("passwd"),
            ),
            HandlerDef::post("/api/authenticate", "authenticate", authenticate)
                .plan(ParameterPlan::new().required("email").required("passwd")),
            // blogs
            HandlerDef::get("/api/blogs", "api_blogs", api_blogs).plan(paged()),
            HandlerDef::post("/api/blogs", "api_create_blog", api_create_blog).plan(blog_form()),
            HandlerDef::get("/api/blogs/{id}", "api_get_blog", api_get_blog)
                .plan(ParameterPlan::new().required("id")),
            HandlerDef::post("/api/blogs/{id}", "api_update_blog", api_update_blog)
                .plan(blog_form()),
            HandlerDef::post("/api/blogs/{id}/delete", "api_delete_blog", api_delete_blog)
                .plan(ParameterPlan::new().request().required("id")),
            // comments
            HandlerDef::get("/api/comments", "api_comments", api_comments).plan(paged()),
            HandlerDef::post(
                "/api/blogs/{id}/comments",
                "api_create_comment",
                api_create_comment,
            )
            .plan(ParameterPlan::new().request().required("content")),
            HandlerDef::post(
                "/api/comments/{id}/delete",
                "api_delete_comment",
                api_delete_comment,
            )
            .plan(ParameterPlan::new().request()),
        ]
    }
}

/// Plain text to HTML paragraphs: one `<p>` per non-blank line, escaped.
pub fn text2html(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            format!(
                "<p>{}</p>",
                line.replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;")
            )
        })
        .collect()
}

fn check_admin(args: &CallArgs) -> Result<&User, ApiError> {
    match current_user(args) {
        Some(user) if user.admin => Ok(user),
        _ => Err(ApiError::permission_forbidden("")),
    }
}

fn page_index(args: &CallArgs) -> i64 {
    get_page_index(args.text("page").as_deref())
}

/// Required argument that must not be blank; returned trimmed.
fn non_blank(args: &CallArgs, name: &str) -> Result<String, HandlerError> {
    let value = args.require(name)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::value_invalid(name, format!("{name} cannot be empty.")).into());
    }
    Ok(value.to_string())
}

async fn count_all<M: Model>(db: &Database) -> Result<i64, HandlerError> {
    Ok(db
        .count::<M>("count(id)", None, &[])
        .await?
        .and_then(|num| num.as_i64())
        .unwrap_or(0))
}

/// One page of a table, newest first.
async fn newest_page<M: Model>(
    db: &Database,
    page_index: i64,
) -> Result<(Page, Vec<M>), HandlerError> {
    let num = count_all::<M>(db).await?;
    let page = Page::with_default_size(num, page_index);
    if num == 0 {
        return Ok((page, Vec::new()));
    }
    let items = db
        .find_all(
            FindAll::new()
                .order_by("created_at desc")
                .limit(Limit::Range(page.offset, page.limit)),
        )
        .await?;
    Ok((page, items))
}

async fn find_blog(db: &Database, id: &str) -> Result<Blog, HandlerError> {
    db.find::<Blog>(id)
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "").into())
}

fn with_html(value: JsonValue, content: &str) -> JsonValue {
    match value {
        JsonValue::Object(mut map) => {
            map.insert("html_content".into(), json!(text2html(content)));
            JsonValue::Object(map)
        }
        other => other,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue, HandlerError> {
    serde_json::to_value(value).map_err(|err| HandlerError::internal(err.to_string()))
}

/// JSON user reply carrying a fresh session cookie.
fn signed_in(state: &AppState, user: User) -> HandlerResult {
    let keys = &state.settings.session;
    let cookie = set_cookie_header(&user2cookie(&user, keys), keys.max_age)
        .ok_or_else(|| HandlerError::internal("session cookie is not a valid header value"))?;
    let response = ([(header::SET_COOKIE, cookie)], Json(user.masked())).into_response();
    Ok(Reply::Response(response))
}

async fn index(state: AppState, args: CallArgs) -> HandlerResult {
    let (page, blogs) = newest_page::<Blog>(&state.db, page_index(&args)).await?;
    Reply::json(&json!({
        "__template__": "blogs.html",
        "page": page,
        "blogs": blogs,
    }))
}

async fn get_blog(state: AppState, args: CallArgs) -> HandlerResult {
    let id = args.require("id")?;
    let blog = find_blog(&state.db, &id).await?;
    let comments: Vec<Comment> = state
        .db
        .find_all(
            FindAll::new()
                .filter("`blog_id`=?", vec![id.into()])
                .order_by("created_at desc"),
        )
        .await?;

    let comments = comments
        .iter()
        .map(|comment| Ok(with_html(to_json(comment)?, &comment.content)))
        .collect::<Result<Vec<_>, HandlerError>>()?;
    let blog = with_html(to_json(&blog)?, &blog.content);

    Reply::json(&json!({
        "__template__": "blog.html",
        "blog": blog,
        "comments": comments,
    }))
}

async fn register(_state: AppState, _args: CallArgs) -> HandlerResult {
    Reply::json(&json!({ "__template__": "register.html" }))
}

async fn signin(_state: AppState, _args: CallArgs) -> HandlerResult {
    Reply::json(&json!({ "__template__": "signin.html" }))
}

async fn signout(_state: AppState, args: CallArgs) -> HandlerResult {
    let location = args
        .request()?
        .header("referer")
        .filter(|referer| !referer.is_empty())
        .and_then(|referer| HeaderValue::from_str(referer).ok())
        .unwrap_or_else(|| HeaderValue::from_static("/"));
    let expired = set_cookie_header("-deleted-", 0)
        .ok_or_else(|| HandlerError::internal("invalid expired cookie"))?;

    info!("user signed out.");
    let response = (
        StatusCode::FOUND,
        [(header::LOCATION, location), (header::SET_COOKIE, expired)],
    )
        .into_response();
    Ok(Reply::Response(response))
}

async fn manage(_state: AppState, _args: CallArgs) -> HandlerResult {
    Ok(Reply::redirect("/manage/comments"))
}

async fn manage_comments(_state: AppState, args: CallArgs) -> HandlerResult {
    Reply::json(&json!({
        "__template__": "manage_comments.html",
        "page_index": page_index(&args),
    }))
}

async fn manage_blogs(_state: AppState, args: CallArgs) -> HandlerResult {
    Reply::json(&json!({
        "__template__": "manage_blogs.html",
        "page_index": page_index(&args),
    }))
}

async fn manage_create_blog(_state: AppState, _args: CallArgs) -> HandlerResult {
    Reply::json(&json!({
        "__template__": "manage_blog_edit.html",
        "id": "",
        "action": "/api/blogs",
    }))
}

async fn manage_edit_blog(_state: AppState, args: CallArgs) -> HandlerResult {
    let id = args.require("id")?;
    Reply::json(&json!({
        "__template__": "manage_blog_edit.html",
        "action": format!("/api/blogs/{id}"),
        "id": id,
    }))
}

async fn manage_users(_state: AppState, args: CallArgs) -> HandlerResult {
    Reply::json(&json!({
        "__template__": "manage_users.html",
        "page_index": page_index(&args),
    }))
}

async fn api_get_users(state: AppState, args: CallArgs) -> HandlerResult {
    let (page, users) = newest_page::<User>(&state.db, page_index(&args)).await?;
    let users: Vec<User> = users.into_iter().map(User::masked).collect();
    Reply::json(&json!({ "page": page, "users": users }))
}

async fn api_register_user(state: AppState, args: CallArgs) -> HandlerResult {
    let name = args.require("name")?;
    let email = args.require("email")?;
    let passwd = args.require("passwd")?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::value_invalid("name", "").into());
    }
    if !RE_EMAIL.is_match(&email) {
        return Err(ApiError::value_invalid("email", "").into());
    }
    if !RE_SHA1.is_match(&passwd) {
        return Err(ApiError::value_invalid("passwd", "").into());
    }

    let existing: Vec<User> = state
        .db
        .find_all(FindAll::new().filter("`email`=?", vec![email.as_str().into()]))
        .await?;
    if !existing.is_empty() {
        return Err(
            ApiError::generic("register:failed", "email", "Email is already in use.").into(),
        );
    }

    let uid = next_id();
    let cost = state.settings.password_cost;
    let password_hash = {
        let uid = uid.clone();
        tokio::task::spawn_blocking(move || hash_password(&uid, &passwd, cost))
            .await
            .map_err(|err| HandlerError::internal(err.to_string()))?
            .map_err(|err| HandlerError::internal(err.to_string()))?
    };

    let mut user = User {
        id: Some(uid),
        name: name.to_string(),
        image_url: gravatar_url(&email),
        email,
        password_hash,
        admin: false,
        created_at: None,
    };
    state.db.save(&mut user).await?;
    info!(email = %user.email, "user registered");

    signed_in(&state, user)
}

async fn authenticate(state: AppState, args: CallArgs) -> HandlerResult {
    let email = args.require("email")?;
    let passwd = args.require("passwd")?;
    if email.is_empty() {
        return Err(ApiError::value_invalid("email", "Invalid email.").into());
    }
    if passwd.is_empty() {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }

    let mut users: Vec<User> = state
        .db
        .find_all(FindAll::new().filter("`email`=?", vec![email.into()]))
        .await?;
    if users.is_empty() {
        return Err(ApiError::value_invalid("email", "Email not exist.").into());
    }
    let user = users.swap_remove(0);

    let uid = user.id.clone().unwrap_or_default();
    let password_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&uid, &passwd, &password_hash))
        .await
        .map_err(|err| HandlerError::internal(err.to_string()))?;
    if !valid {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }

    signed_in(&state, user)
}

async fn api_blogs(state: AppState, args: CallArgs) -> HandlerResult {
    let (page, blogs) = newest_page::<Blog>(&state.db, page_index(&args)).await?;
    Reply::json(&json!({ "page": page, "blogs": blogs }))
}

async fn api_get_blog(state: AppState, args: CallArgs) -> HandlerResult {
    let blog = find_blog(&state.db, &args.require("id")?).await?;
    Reply::json(&blog)
}

async fn api_create_blog(state: AppState, args: CallArgs) -> HandlerResult {
    let admin = check_admin(&args)?;
    let name = non_blank(&args, "name")?;
    let summary = non_blank(&args, "summary")?;
    let content = non_blank(&args, "content")?;

    let mut blog = Blog {
        id: None,
        user_id: admin.id.clone().unwrap_or_default(),
        user_name: admin.name.clone(),
        user_image: admin.image_url.clone(),
        name,
        summary,
        content,
        created_at: None,
    };
    state.db.save(&mut blog).await?;
    Reply::json(&blog)
}

async fn api_update_blog(state: AppState, args: CallArgs) -> HandlerResult {
    check_admin(&args)?;
    let mut blog = find_blog(&state.db, &args.require("id")?).await?;
    blog.name = non_blank(&args, "name")?;
    blog.summary = non_blank(&args, "summary")?;
    blog.content = non_blank(&args, "content")?;

    state.db.update(&blog).await?;
    Reply::json(&blog)
}

async fn api_delete_blog(state: AppState, args: CallArgs) -> HandlerResult {
    check_admin(&args)?;
    let id = args.require("id")?;
    let blog = find_blog(&state.db, &id).await?;
    state.db.remove(&blog).await?;
    Reply::json(&json!({ "id": id }))
}

async fn api_comments(state: AppState, args: CallArgs) -> HandlerResult {
    let (page, comments) = newest_page::<Comment>(&state.db, page_index(&args)).await?;
    Reply::json(&json!({ "page": page, "comments": comments }))
}

async fn api_create_comment(state: AppState, args: CallArgs) -> HandlerResult {
    let user = current_user(&args)
        .ok_or_else(|| ApiError::permission_forbidden("Please signin first."))?;
    let content = args.require("content")?;
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::value_invalid("content", "").into());
    }
    let blog = find_blog(&state.db, &args.require("id")?).await?;

    let mut comment = Comment {
        id: None,
        blog_id: blog.id.unwrap_or_default(),
        user_id: user.id.clone().unwrap_or_default(),
        user_name: user.name.clone(),
        user_image: user.image_url.clone(),
        content: content.to_string(),
        created_at: None,
    };
    state.db.save(&mut comment).await?;
    Reply::json(&comment)
}

async fn api_delete_comment(state: AppState, args: CallArgs) -> HandlerResult {
    check_admin(&args)?;
    let id = args.require("id")?;
    let comment = state
        .db
        .find::<Comment>(id.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found("comment", ""))?;
    state.db.remove(&comment).await?;
    Reply::json(&json!({ "id": id }))
}
