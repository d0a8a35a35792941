use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use persona_chat_core::{ModelError, ModelProviderError};
use persona_chat_core::api::{ErrorBody, MESSAGE_REQUIRED};
use thiserror::Error;

/// Failures of the chat endpoint that happen before any text is sent.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is missing, empty or not a string")]
    MessageRequired,

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(ModelError),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ChatError::MessageRequired => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: MESSAGE_REQUIRED.to_owned(),
                    detail: None,
                },
            ),
            ChatError::InvalidBody(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request body.".to_owned(),
                    detail: Some(err.to_string()),
                },
            ),
            ChatError::Provider(err) => {
                error!(kind = ?err.kind(), "/api/chat error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Server error".to_owned(),
                        detail: Some(err.to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// The provider broke off after the response head was sent.
#[derive(Debug, Error)]
#[error("generation broke off: {0}")]
pub(crate) struct StreamInterrupted(pub String);
