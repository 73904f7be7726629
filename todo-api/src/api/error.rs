use std::collections::BTreeMap;

use hyper::{Method, Response, StatusCode, header};
use serde_json::json;

use super::{Body, make_response};

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("id must be numeric")]
    NotNumericId,
    #[error("bad request format")]
    BadRequestFormat,
    #[error("title must be at least 1 character")]
    EmptyTitle,
    #[error("content must be at least 1 character")]
    EmptyContent,
    #[error("JSON parse error - {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to read request body: {0}")]
    ReadBody(#[source] hyper::Error),
    #[error("invalid fields: {0:?}")]
    Invalid(FieldErrors),
    #[error("Not found.")]
    NotFound,
    #[error("Method \"{method}\" not allowed.")]
    MethodNotAllowed { method: Method, allow: Vec<Method> },
    #[error("A server error occurred.")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotNumericId
            | ApiError::BadRequestFormat
            | ApiError::EmptyTitle
            | ApiError::EmptyContent
            | ApiError::Parse(_)
            | ApiError::ReadBody(_)
            | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();

        match self {
            // field errors are reported as the bare field map
            ApiError::Invalid(errors) => make_response!(status, json!(errors)),
            ApiError::MethodNotAllowed { ref allow, .. } => {
                let allow = allow.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                let mut res = make_response!(status, error_body(status, &self.detail()));
                if let Ok(value) = header::HeaderValue::from_str(&allow) {
                    res.headers_mut().insert(header::ALLOW, value);
                }
                res
            }
            _ => make_response!(status, error_body(status, &self.detail())),
        }
    }
}

fn error_body(status: StatusCode, detail: &str) -> serde_json::Value {
    json!({
        "detail": detail,
        "status_code": status.as_u16(),
    })
}

/// Logs a failed request and renders it. Server errors are logged at error level, client errors at debug.
pub fn error_handler(method: &Method, path: &str, err: ApiError) -> Response<Body> {
    if err.status().is_server_error() {
        tracing::error!(%path, %method, error = ?err, "http error");
    } else {
        tracing::debug!(%path, %method, error = %err, "http error");
    }

    err.into_response()
}
