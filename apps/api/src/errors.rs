use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::contract::ContractError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every stage failure is converted into one of these at the boundary of the stage call.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by the model provider")]
    RateLimited,

    #[error("Model provider rejected the credentials")]
    AuthFailure,

    #[error("Upstream format error: {0}")]
    UpstreamFormat(String),

    #[error("Incomplete document: {0}")]
    IncompleteDocument(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::AuthFailure => StatusCode::UNAUTHORIZED,
            AppError::UpstreamFormat(_)
            | AppError::IncompleteDocument(_)
            | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::AuthFailure => "AUTH_FAILURE",
            AppError::UpstreamFormat(_) => "UPSTREAM_FORMAT_ERROR",
            AppError::IncompleteDocument(_) => "INCOMPLETE_DOCUMENT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "UNKNOWN_ERROR",
        }
    }

    /// The message shown to the user. Caller-fixable errors echo their detail;
    /// upstream and internal failures get a fixed, actionable sentence.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Configuration(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::RateLimited => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            AppError::AuthFailure => {
                "Invalid API key. Please check OPENAI_API_KEY in your environment.".to_string()
            }
            AppError::UpstreamFormat(_) => {
                "AI returned an unexpected format. Please try again.".to_string()
            }
            AppError::IncompleteDocument(_) => {
                "AI generated an incomplete resume. Please try again.".to_string()
            }
            AppError::Upstream(_) => {
                "The AI service could not be reached. Please try again.".to_string()
            }
            AppError::Internal(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured => AppError::Configuration(
                "OpenAI API key not configured. Please set OPENAI_API_KEY.".to_string(),
            ),
            LlmError::EmptyContent => {
                AppError::UpstreamFormat("No response received from AI".to_string())
            }
            LlmError::Unauthorized { .. } => AppError::AuthFailure,
            LlmError::RateLimited => AppError::RateLimited,
            LlmError::Http(e) => AppError::Upstream(e.to_string()),
            LlmError::Api { status, message } => {
                AppError::Upstream(format!("status {status}: {message}"))
            }
        }
    }
}

impl From<ContractError> for AppError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::UnexpectedFormat(detail) => AppError::UpstreamFormat(detail),
            ContractError::IncompleteDocument(missing) => {
                AppError::IncompleteDocument(format!("missing {}", missing.join(", ")))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(detail) => tracing::error!("Upstream error: {detail}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::UpstreamFormat(detail) | AppError::IncompleteDocument(detail) => {
                tracing::warn!("Model reply rejected: {detail}")
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.user_message(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_distinct_classes() {
        assert!(matches!(
            AppError::from(LlmError::NotConfigured),
            AppError::Configuration(_)
        ));
        assert!(matches!(
            AppError::from(LlmError::RateLimited),
            AppError::RateLimited
        ));
        assert!(matches!(
            AppError::from(LlmError::Unauthorized { status: 401 }),
            AppError::AuthFailure
        ));
        assert!(matches!(
            AppError::from(LlmError::EmptyContent),
            AppError::UpstreamFormat(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::AuthFailure.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Configuration("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::IncompleteDocument("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_incomplete_document_lists_missing_sections() {
        let err = AppError::from(ContractError::IncompleteDocument(vec![
            "profile",
            "skills",
        ]));
        assert_eq!(err.to_string(), "Incomplete document: missing profile, skills");
        assert_eq!(err.code(), "INCOMPLETE_DOCUMENT");
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = AppError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "RATE_LIMITED");
        assert!(body["error"].as_str().unwrap().contains("Rate limit"));
    }
}
