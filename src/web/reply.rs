use super::error::HandlerError;
use super::template::TemplateRenderer;
use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Key of a mapping reply naming the template to render it with.
pub const TEMPLATE_KEY: &str = "__template__";

/// Prefix of a text reply that asks for a redirect to the rest of the text.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// What a handler hands back, before it becomes an HTTP response.
#[derive(Debug)]
pub enum Reply {
    /// A finished response, passed through untouched.
    Response(Response),
    Bytes(Bytes),
    /// HTML, or a redirect when prefixed with `redirect:`.
    Text(String),
    /// Rendered with a template when it carries `__template__`, JSON otherwise.
    Map(JsonMap<String, JsonValue>),
    /// A bare status code.
    Integer(i64),
    /// Status code with a message body.
    Pair(i64, String),
    /// Anything else, sent as plain text.
    Other(String),
}

impl Reply {
    /// Serialize a value into a reply; objects become [`Reply::Map`].
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        let value = serde_json::to_value(value)
            .map_err(|err| HandlerError::internal(format!("failed to serialize reply: {err}")))?;
        Ok(match value {
            JsonValue::Object(map) => Self::Map(map),
            other => Self::Other(other.to_string()),
        })
    }

    pub fn redirect(location: &str) -> Self {
        Self::Text(format!("{REDIRECT_PREFIX}{location}"))
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Values made available to every rendered template (e.g. the signed-in user).
///
/// Middleware puts this into the request extensions; keys already present in
/// the handler's mapping win.
#[derive(Debug, Clone, Default)]
pub struct TemplateGlobals(pub JsonMap<String, JsonValue>);

impl TemplateGlobals {
    pub fn insert(&mut self, key: &str, value: JsonValue) {
        self.0.insert(key.to_string(), value);
    }
}

/// Turn a reply into a response; the first matching rule wins.
pub fn coerce(
    reply: Reply,
    templates: &dyn TemplateRenderer,
    globals: Option<&TemplateGlobals>,
) -> Result<Response, HandlerError> {
    let response = match reply {
        Reply::Response(response) => response,
        Reply::Bytes(bytes) => with_content_type(Body::from(bytes), "application/octet-stream"),
        Reply::Text(text) => match text.strip_prefix(REDIRECT_PREFIX) {
            Some(location) => redirect(location),
            None => with_content_type(Body::from(text), "text/html;charset=utf-8"),
        },
        Reply::Map(mut map) => match map.remove(TEMPLATE_KEY) {
            Some(JsonValue::String(name)) => {
                if let Some(globals) = globals {
                    for (key, value) in &globals.0 {
                        map.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                let html = templates.render(&name, &JsonValue::Object(map))?;
                with_content_type(Body::from(html), "text/html;charset=utf-8")
            }
            Some(other) => {
                return Err(HandlerError::internal(format!(
                    "template name must be a string, got {other}"
                )));
            }
            None => {
                let body = serde_json::to_vec(&JsonValue::Object(map)).map_err(|err| {
                    HandlerError::internal(format!("failed to encode JSON reply: {err}"))
                })?;
                with_content_type(Body::from(body), "application/json;charset=utf-8")
            }
        },
        Reply::Integer(code) => match status(code) {
            Some(status) => status.into_response(),
            None => plain_text(code.to_string()),
        },
        Reply::Pair(code, message) => match status(code) {
            Some(status) => (status, plain_text(message)).into_response(),
            None => plain_text(format!("({code}, {message})")),
        },
        Reply::Other(text) => plain_text(text),
    };
    Ok(response)
}

fn status(code: i64) -> Option<StatusCode> {
    if (100..600).contains(&code) {
        StatusCode::from_u16(code as u16).ok()
    } else {
        None
    }
}

fn with_content_type(body: Body, content_type: &'static str) -> Response {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type),
    );
    response
}

fn plain_text(text: String) -> Response {
    with_content_type(Body::from(text), "text/plain;charset=utf-8")
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
