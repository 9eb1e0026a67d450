use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, Error>;

/// one path extraction strategy and what it came up with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: &'static str,
    pub result: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("invalid query")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Could not determine video path")]
    MalformedRequest(Vec<StrategyAttempt>),

    // upstream answered, just not with something we can relay
    #[error("Upstream responded with {status}")]
    UpstreamRejected { status: StatusCode, resource: String },

    // never carries the upstream url, only what reqwest says went wrong
    #[error("Upstream request failed: {0}")]
    UpstreamUnavailable(String),

    #[error("internal server error")]
    InternalServerError,

    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) | Self::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UpstreamRejected { status, .. } => *status,
            Self::UpstreamUnavailable(_)
            | Self::InternalServerError
            | Self::InternalServerErrorWithContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("responding with {}: {}", status, self);
        }

        let body = match &self {
            Self::ValidationError(errors) => json!({
                "error": self.to_string(),
                "details": errors,
            }),
            Self::MalformedRequest(attempts) => json!({
                "error": self.to_string(),
                "strategies": attempts,
            }),
            Self::UpstreamRejected { status, resource } => json!({
                "error": self.to_string(),
                "status": status.as_u16(),
                "resource": resource,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_rejection_keeps_status() {
        let response = Error::UpstreamRejected {
            status: StatusCode::NOT_FOUND,
            resource: "/movies/x.mp4".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn malformed_request_is_bad_request() {
        let response = Error::MalformedRequest(vec![StrategyAttempt {
            strategy: "query_parameter",
            result: "no value".to_string(),
        }])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn network_failure_is_500() {
        let response = Error::UpstreamUnavailable("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
