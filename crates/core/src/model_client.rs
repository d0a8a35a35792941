use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use futures_util::stream;
use persona_chat_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

/// A type-erased provider error.
pub type ModelError = Box<dyn ModelProviderError>;

/// A stream of non-empty text fragments in generation order.
///
/// The stream ends after the last fragment. An `Err` item means the
/// generation broke off, and nothing follows it.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

type OpenStreamResult = Result<TextStream, ModelError>;
type BoxedOpenStreamFuture =
    Pin<Box<dyn Future<Output = OpenStreamResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedOpenStreamFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Creates a client driving `provider`.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(resp) => Ok(text_stream::<P>(resp)),
                        Err(err) => {
                            error!("got an error: {err:?}");
                            Err(Box::new(err) as ModelError)
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Opens a generation and returns its text fragments.
    ///
    /// The returned future fails when the provider rejects the request
    /// before producing anything.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned stream stops pulling from the provider.
    #[inline]
    pub async fn open_stream(&self, req: ModelRequest) -> OpenStreamResult {
        (self.handler_fn)(req).await
    }
}

fn text_stream<P: ModelProvider + 'static>(resp: P::Response) -> TextStream {
    let stream = stream::unfold(Some(Box::pin(resp)), |state| async move {
        let mut resp = state?;
        loop {
            let event_or_err =
                poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
            match event_or_err {
                Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    trace!("got a delta of {} bytes", delta.len());
                    return Some((Ok(delta), Some(resp)));
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    trace!("generation completed: {reason:?}");
                }
                Ok(None) => {
                    trace!("finished a request");
                    return None;
                }
                Err(err) => {
                    error!("got an error: {err:?}");
                    return Some((Err(Box::new(err) as ModelError), None));
                }
            }
        }
    });
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use persona_chat_model::{ErrorKind, GenerationOptions, ModelMessage};
    use persona_chat_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            model: None,
            system_instruction: None,
            messages: vec![ModelMessage::User("Hi".to_owned())],
            options: GenerationOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_open_stream() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_fragments([
                "How ", "", "are ", "you?",
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let stream = model_client.open_stream(request()).await.unwrap();
            let fragments: Vec<String> = stream
                .map(|item| item.unwrap())
                .collect()
                .await;
            // Empty deltas are never surfaced.
            assert_eq!(fragments, vec!["How ", "are ", "you?"]);
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Partial".to_owned()),
            PresetEvent::Failure("connection reset".to_owned()),
        ]));
        let model_client = ModelClient::new(model_provider);

        let mut stream = model_client.open_stream(request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "Partial");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        assert!(stream.next().await.is_none());

        // The script is exhausted now.
        let err = model_client.open_stream(request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }
}
