use super::auth::{cookie2user, session_cookie};
use super::models::User;
use super::state::AppState;
use crate::web::{CallArgs, TemplateGlobals};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;
use tracing::info;

/// Template key under which the signed-in user is exposed.
pub const USER_KEY: &str = "__user__";

/// The user the request's session cookie belongs to, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

/// Resolve the session cookie into a [`CurrentUser`] request extension.
pub async fn auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    info!("check user: {} {}", request.method(), request.uri().path());

    let cookie = session_cookie(request.headers()).map(str::to_string);
    let user = match cookie {
        Some(cookie) => cookie2user(&state.db, &cookie, &state.settings.session).await,
        None => None,
    };
    if let Some(user) = &user {
        info!("set current user: {}", user.email);
    }

    let mut globals = request
        .extensions()
        .get::<TemplateGlobals>()
        .cloned()
        .unwrap_or_default();
    globals.insert(
        USER_KEY,
        serde_json::to_value(&user).unwrap_or(JsonValue::Null),
    );
    request.extensions_mut().insert(globals);
    request.extensions_mut().insert(CurrentUser(user));

    next.run(request).await
}

/// Send anyone but an admin away from the management pages.
pub async fn admin_guard(request: Request, next: Next) -> Response {
    if request.uri().path().starts_with("/manage/") {
        let is_admin = request
            .extensions()
            .get::<CurrentUser>()
            .and_then(|current| current.0.as_ref())
            .is_some_and(|user| user.admin);
        if !is_admin {
            return (StatusCode::FOUND, [(header::LOCATION, "/signin")]).into_response();
        }
    }
    next.run(request).await
}

/// Signed-in user of a handler call whose plan accepts the request.
pub fn current_user(args: &CallArgs) -> Option<&User> {
    args.request()
        .ok()?
        .extension::<CurrentUser>()?
        .0
        .as_ref()
}
