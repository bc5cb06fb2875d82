use crate::core::DbError;
use super::template::TemplateError;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use thiserror::Error;
use tracing::error;

/// Application-level failure reported to the client as a JSON payload.
///
/// These never change the transport status: the adapter turns them into
/// `{error, data, message}` and sends that with `200 OK`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("value:invalid ({field}) {message}")]
    ValueInvalid { field: String, message: String },

    #[error("value:notfound ({field}) {message}")]
    NotFound { field: String, message: String },

    #[error("permission:forbidden {message}")]
    PermissionForbidden { message: String },

    #[error("{error} ({data}) {message}")]
    Generic {
        error: String,
        data: String,
        message: String,
    },
}

impl ApiError {
    pub fn value_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValueInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn permission_forbidden(message: impl Into<String>) -> Self {
        Self::PermissionForbidden {
            message: message.into(),
        }
    }

    pub fn generic(
        error: impl Into<String>,
        data: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Generic {
            error: error.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::ValueInvalid { .. } => "value:invalid",
            Self::NotFound { .. } => "value:notfound",
            Self::PermissionForbidden { .. } => "permission:forbidden",
            Self::Generic { error, .. } => error,
        }
    }

    pub fn data(&self) -> &str {
        match self {
            Self::ValueInvalid { field, .. } | Self::NotFound { field, .. } => field,
            Self::PermissionForbidden { .. } => "permission",
            Self::Generic { data, .. } => data,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValueInvalid { message, .. }
            | Self::NotFound { message, .. }
            | Self::PermissionForbidden { message }
            | Self::Generic { message, .. } => message,
        }
    }

    pub fn to_payload(&self) -> JsonMap<String, JsonValue> {
        let mut payload = JsonMap::new();
        payload.insert("error".into(), json!(self.kind()));
        payload.insert("data".into(), json!(self.data()));
        payload.insert("message".into(), json!(self.message()));
        payload
    }
}

/// Everything a handler may fail with.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Api(err) => (
                StatusCode::OK,
                axum::Json(JsonValue::Object(err.to_payload())),
            )
                .into_response(),
            Self::MissingArgument(name) => bad_request(format!("Missing argument: {name}")),
            other => {
                error!(error = %other, "handler failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    "Internal Server Error",
                )
                    .into_response()
            }
        }
    }
}

/// Route table misconfiguration, detected while registering handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("HTTP method not defined for handler '{0}'")]
    MissingMethod(String),

    #[error("path not defined for handler '{0}'")]
    MissingPath(String),

    #[error("handler '{handler}' uses unsupported HTTP method {method}")]
    UnsupportedMethod { handler: String, method: String },

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },
}

pub(crate) fn bad_request(reason: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        reason.into(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        let payload = ApiError::value_invalid("email", "Email not exist.").to_payload();
        assert_eq!(
            JsonValue::Object(payload),
            json!({"error": "value:invalid", "data": "email", "message": "Email not exist."})
        );

        let payload = ApiError::permission_forbidden("").to_payload();
        assert_eq!(payload["error"], "permission:forbidden");
        assert_eq!(payload["data"], "permission");

        let payload =
            ApiError::generic("register:failed", "email", "Email is already in use.").to_payload();
        assert_eq!(payload["error"], "register:failed");
        assert_eq!(payload["data"], "email");
    }

    #[test]
    fn test_api_error_keeps_success_status() {
        let response = HandlerError::from(ApiError::not_found("blog", "")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_internal_failures_hide_details() {
        let response = HandlerError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = HandlerError::MissingArgument("id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
