//! Request adapter: binds request data to a handler's keyword arguments,
//! calls the handler and coerces what it returns into a response.

use super::args::{CallArgs, REQUEST_KEY, RequestContext};
use super::error::{HandlerError, bad_request};
use super::handler::HandlerDef;
use super::plan::ParameterPlan;
use super::registry::WebState;
use super::reply::{Reply, TemplateGlobals, coerce};
use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::{Method, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Malformed input, answered with `400` before the handler runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("Missing Content-Type.")]
    MissingContentType,

    #[error("JSON body must be object.")]
    JsonNotObject,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),

    #[error("Invalid form body: {0}")]
    InvalidForm(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),
}

impl IntoResponse for BindError {
    fn into_response(self) -> Response {
        debug!(reason = %self, "rejecting request");
        bad_request(self.to_string())
    }
}

pub(crate) async fn dispatch<S: WebState>(
    route: Arc<HandlerDef<S>>,
    state: S,
    request: Request,
) -> Response {
    let globals = request.extensions().get::<TemplateGlobals>().cloned();

    let args = match bind(route.parameter_plan(), request).await {
        Ok(args) => args,
        Err(err) => return err.into_response(),
    };

    let reply = match route.call(state.clone(), args).await {
        Ok(reply) => reply,
        Err(HandlerError::Api(err)) => {
            debug!(handler = route.name(), error = %err, "api error");
            Reply::Map(err.to_payload())
        }
        Err(err) => return err.into_response(),
    };

    match coerce(reply, state.templates(), globals.as_ref()) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Assemble the keyword arguments of one call.
pub async fn bind(plan: &ParameterPlan, request: Request) -> Result<CallArgs, BindError> {
    let (mut parts, body) = request.into_parts();
    let path_vars = path_variables(&mut parts).await;
    let context = plan
        .accepts_request()
        .then(|| RequestContext::from_parts(&parts));

    let keywords = if !plan.needs_keywords() {
        None
    } else if parts.method == Method::POST {
        Some(body_keywords(parts, body).await?)
    } else if parts.method == Method::GET {
        query_keywords(&parts.uri)
    } else {
        None
    };

    let mut values = match keywords {
        None => path_vars
            .into_iter()
            .map(|(key, value)| (key, JsonValue::String(value)))
            .collect::<JsonMap<_, _>>(),
        Some(mut keywords) => {
            if !plan.accepts_var_keyword() && !plan.named_keywords().is_empty() {
                keywords.retain(|key, _| plan.is_named(key));
            }
            for (key, value) in path_vars {
                if keywords.contains_key(&key) {
                    warn!(name = %key, "Duplicate arg name in named arg and kw args");
                }
                keywords.insert(key, JsonValue::String(value));
            }
            keywords
        }
    };

    if context.is_some() {
        values.remove(REQUEST_KEY);
    }

    if let Some(missing) = plan
        .required_keywords()
        .iter()
        .find(|name| !values.contains_key(name.as_str()))
    {
        return Err(BindError::MissingArgument(missing.clone()));
    }

    Ok(CallArgs::new(values, context))
}

async fn path_variables(parts: &mut Parts) -> HashMap<String, String> {
    match Path::<HashMap<String, String>>::from_request_parts(parts, &()).await {
        Ok(Path(vars)) => vars,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "no path variables");
            HashMap::new()
        }
    }
}

async fn body_keywords(parts: Parts, body: Body) -> Result<JsonMap<String, JsonValue>, BindError> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(BindError::MissingContentType)?
        .to_string();
    let lowered = content_type.to_ascii_lowercase();

    if lowered.starts_with("application/json") {
        let bytes = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|err| BindError::InvalidJson(err.to_string()))?;
        return match serde_json::from_slice::<JsonValue>(&bytes) {
            Ok(JsonValue::Object(map)) => Ok(map),
            Ok(_) => Err(BindError::JsonNotObject),
            Err(err) => Err(BindError::InvalidJson(err.to_string())),
        };
    }

    let request = Request::from_parts(parts, body);
    if lowered.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|rejection| BindError::InvalidForm(rejection.body_text()))?;
        return Ok(first_values(pairs));
    }

    if lowered.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| BindError::InvalidForm(rejection.body_text()))?;
        let mut pairs = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| BindError::InvalidForm(err.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|err| BindError::InvalidForm(err.body_text()))?;
            pairs.push((name, value));
        }
        return Ok(first_values(pairs));
    }

    Err(BindError::UnsupportedContentType(content_type))
}

fn query_keywords(uri: &Uri) -> Option<JsonMap<String, JsonValue>> {
    if uri.query().is_none_or(str::is_empty) {
        return None;
    }
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => Some(first_values(pairs)),
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "unparsable query string");
            None
        }
    }
}

fn first_values(pairs: Vec<(String, String)>) -> JsonMap<String, JsonValue> {
    let mut map = JsonMap::new();
    for (key, value) in pairs {
        map.entry(key).or_insert(JsonValue::String(value));
    }
    map
}
