use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use tribune_core::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(core) => match core {
                CoreError::PendingNotFound(_)
                | CoreError::MessageNotFound(_)
                | CoreError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, core.to_string()),
                CoreError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, core.to_string()),
                CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, core.to_string()),
                CoreError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal storage error".to_string(),
                ),
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribune_shared::{MessageStatus, PendingMessageId};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(CoreError::PendingNotFound(PendingMessageId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::Validation("blank".to_string()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(
                CoreError::InvalidTransition {
                    from: MessageStatus::Read,
                    to: MessageStatus::Sent,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::BadRequest("nope".to_string())),
            StatusCode::BAD_REQUEST
        );
    }
}
