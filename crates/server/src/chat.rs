use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use persona_chat_core::api::{ChatRequest, PERSONA_HEADER};
use persona_chat_core::{AssembledRequest, assemble_request};
use serde_json::Value;

use crate::AppState;
use crate::error::{ChatError, StreamInterrupted};

/// `POST /api/chat`: relays the generated text as a chunked plain-text body.
pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ChatError> {
    let chat = parse_request(&body)?;
    let AssembledRequest { persona, request } =
        assemble_request(&chat, &state.prompt_options);
    info!(
        persona = persona.key(),
        model = request.model.as_deref().unwrap_or_default(),
        turns = request.messages.len(),
        "chat request"
    );

    let mut fragments = state
        .model_client
        .open_stream(request)
        .await
        .map_err(ChatError::Provider)?;

    // Wait for the first fragment before committing to a status code, so
    // that a provider failing right away still gets a 500.
    let first = match fragments.next().await {
        Some(Ok(fragment)) => Some(fragment),
        Some(Err(err)) => return Err(ChatError::Provider(err)),
        None => None,
    };

    let body = stream::iter(first.map(Ok)).chain(fragments).map(|item| {
        item.map(Bytes::from).map_err(|err| {
            warn!("stream ended early: {err}");
            StreamInterrupted(err.to_string())
        })
    });

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        ),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            HeaderName::from_static(PERSONA_HEADER),
            HeaderValue::from_static(persona.key()),
        ),
    ];
    Ok((headers, Body::from_stream(body)).into_response())
}

/// Validates the body. The message is checked on the raw JSON first, so
/// that a missing or non-string message always gets the same answer.
fn parse_request(body: &[u8]) -> Result<ChatRequest, ChatError> {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return Err(ChatError::MessageRequired);
    };
    let has_message = value
        .get("message")
        .and_then(Value::as_str)
        .is_some_and(|m| !m.is_empty());
    if !has_message {
        return Err(ChatError::MessageRequired);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let bodies: [&[u8]; 6] = [
            b"",
            b"not json",
            b"{}",
            b"{\"message\": \"\"}",
            b"{\"message\": 42}",
            b"{\"message\": null}",
        ];
        for body in bodies {
            assert!(matches!(
                parse_request(body),
                Err(ChatError::MessageRequired)
            ));
        }

        assert!(matches!(
            parse_request(b"{\"message\": \"Hi\", \"history\": 3}"),
            Err(ChatError::InvalidBody(_))
        ));

        let chat = parse_request(
            b"{\"message\": \"Hi\", \"persona\": \"swe\", \"thinkingBudget\": 8}",
        )
        .unwrap();
        assert_eq!(chat.message, "Hi");
        assert_eq!(chat.persona.as_deref(), Some("swe"));
        assert_eq!(chat.thinking_budget, Some(8));
    }
}
