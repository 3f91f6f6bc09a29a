use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SunsteadError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Upstream error from {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SunsteadError {
    /// True for errors worth retrying against an idempotent upstream.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SunsteadError::Http(_)
                | SunsteadError::Upstream { .. }
                | SunsteadError::ApiRateLimit { .. }
                | SunsteadError::LlmRateLimit { .. }
        )
    }
}

impl IntoResponse for SunsteadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SunsteadError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            SunsteadError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SunsteadError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            SunsteadError::UrlParse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            SunsteadError::ApiAuth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            SunsteadError::ApiRateLimit { .. } | SunsteadError::LlmRateLimit { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            SunsteadError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            SunsteadError::Upstream { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            SunsteadError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            SunsteadError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            SunsteadError::Embedding(msg)
            | SunsteadError::Cache(msg)
            | SunsteadError::Sync(msg)
            | SunsteadError::Llm(msg)
            | SunsteadError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            SunsteadError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        // Correlation id lets operators find the matching log line; 5xx
        // classes never carry internal detail on the wire.
        let correlation_id = nanoid::nanoid!(12);
        if status.is_server_error() {
            tracing::error!(correlation_id = %correlation_id, error = %self, "Request failed");
            let body = Json(json!({
                "error": "An internal error occurred",
                "code": status.as_u16(),
                "correlation_id": correlation_id,
            }));
            return (status, body).into_response();
        }

        let body = Json(json!({
            "error": message,
            "code": status.as_u16(),
            "correlation_id": correlation_id,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, SunsteadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let resp = SunsteadError::Validation("bad body".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_maps_to_unauthorized() {
        let resp = SunsteadError::ApiAuth("missing key".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_maps_to_bad_gateway() {
        let resp = SunsteadError::Upstream {
            service: "inverter".into(),
            message: "connection refused".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rate_limits_map_to_too_many_requests() {
        let resp = SunsteadError::ApiRateLimit {
            retry_after: Some(30),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_errors_are_generic() {
        let resp = SunsteadError::Internal("secret detail".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn retryable_classification() {
        assert!(SunsteadError::ApiRateLimit { retry_after: None }.is_retryable());
        assert!(SunsteadError::Upstream {
            service: "drive".into(),
            message: "503".into()
        }
        .is_retryable());
        assert!(!SunsteadError::Validation("x".into()).is_retryable());
        assert!(!SunsteadError::NotFound("x".into()).is_retryable());
    }
}
