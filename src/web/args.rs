use super::error::HandlerError;
use axum::http::{Extensions, HeaderMap, Method, Uri, request::Parts};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Reserved keyword under which the request context is passed to handlers.
pub const REQUEST_KEY: &str = "request";

/// Request data a handler may look at besides its keyword arguments.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub extensions: Extensions,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            extensions: parts.extensions.clone(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

/// Arguments assembled by the adapter for one handler call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: JsonMap<String, JsonValue>,
    request: Option<RequestContext>,
}

impl CallArgs {
    pub fn new(values: JsonMap<String, JsonValue>, request: Option<RequestContext>) -> Self {
        Self { values, request }
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        if name == REQUEST_KEY {
            return None;
        }
        self.values.get(name)
    }

    /// Whether `name` was bound; the reserved request key counts when a context was injected.
    pub fn contains(&self, name: &str) -> bool {
        if name == REQUEST_KEY {
            return self.request.is_some();
        }
        self.values.contains_key(name)
    }

    /// Argument as text; numbers and booleans are rendered, `null` is absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Like [`CallArgs::text`], but a missing argument is a client error.
    pub fn require(&self, name: &str) -> Result<String, HandlerError> {
        self.text(name)
            .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
    }

    pub fn request(&self) -> Result<&RequestContext, HandlerError> {
        self.request
            .as_ref()
            .ok_or_else(|| HandlerError::internal("handler plan does not accept the request"))
    }

    pub fn values(&self) -> &JsonMap<String, JsonValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
