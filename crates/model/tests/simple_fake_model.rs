use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use persona_chat_model::{
    ErrorKind, GenerationOptions, ModelFinishReason, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoProviderError(ErrorKind);

impl Display for EchoProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoProviderError {}

impl ModelProviderError for EchoProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct EchoResponse {
    words: VecDeque<String>,
    sleep: Option<Pin<Box<Sleep>>>,
    completed: bool,
}

impl EchoResponse {
    fn new(persona: &str, input: &str) -> Self {
        let words = format!("[{persona}] You said {input}")
            .split(' ')
            .map(ToString::to_string)
            .collect();
        Self {
            words,
            sleep: None,
            completed: false,
        }
    }
}

impl ModelResponse for EchoResponse {
    type Error = EchoProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if let Some(mut word) = this.words.pop_front() {
                if !this.words.is_empty() {
                    word.push(' ');
                }
                return Poll::Ready(Ok(Some(
                    ModelResponseEvent::MessageDelta(word),
                )));
            }
            if !this.completed {
                this.completed = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

/// Echoes the last user turn, tagged with the system instruction.
struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoProviderError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.messages.last() {
            Some(ModelMessage::User(text)) => Ok(EchoResponse::new(
                req.system_instruction.as_deref().unwrap_or("none"),
                text,
            )),
            _ => Err(EchoProviderError(ErrorKind::InvalidRequest)),
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    fn request(messages: Vec<ModelMessage>) -> ModelRequest {
        ModelRequest {
            model: None,
            system_instruction: Some("general".to_owned()),
            messages,
            options: GenerationOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_streaming_completion() {
        let provider = EchoProvider;
        let req = request(vec![
            ModelMessage::User("Hi".to_owned()),
            ModelMessage::Assistant("Hello!".to_owned()),
            ModelMessage::User("Good morning".to_owned()),
        ]);
        let mut resp = provider.send_request(&req).await.unwrap();

        let mut text = String::new();
        let mut finish_reason = None;
        loop {
            let event =
                poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx)).await;
            match event {
                Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                    text.push_str(&delta);
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    finish_reason = Some(reason);
                }
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }

        assert_eq!(text, "[general] You said Good morning");
        assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_error() {
        let provider = EchoProvider;
        let req = request(vec![ModelMessage::Assistant("Hi".to_owned())]);
        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_default_options() {
        let options = GenerationOptions::default();
        assert_eq!(options.max_output_tokens, 2048);
        assert_eq!(options.thinking_budget, 0);
    }
}
