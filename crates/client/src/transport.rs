//! Talking to the chat proxy.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use persona_chat_core::api::{CHAT_PATH, ChatRequest, PERSONA_HEADER};
use reqwest::{Client, Url};
use thiserror::Error;

/// Errors of a [`ChatTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server URL {0:?}")]
    InvalidUrl(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

/// The raw response body, chunk by chunk.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A successful response of the proxy.
pub struct ChatReply {
    /// The persona the proxy resolved, from the response header.
    pub persona: Option<String>,
    pub body: ByteStream,
}

/// Opens streaming chat requests.
pub trait ChatTransport {
    /// Sends `request` and returns once the response head arrived.
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send;
}

/// A [`ChatTransport`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Creates a transport for the proxy at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(CHAT_PATH))
            .map_err(|_| TransportError::InvalidUrl(base_url.to_owned()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(base_url.to_owned()));
        }
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ChatTransport for HttpTransport {
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send {
        let fut = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send();
        async move {
            let resp = fut.await?;
            let status = resp.status();
            if !status.is_success() {
                debug!("proxy answered {status}");
                return Err(TransportError::Status(status.as_u16()));
            }
            let persona = resp
                .headers()
                .get(PERSONA_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = resp.bytes_stream().map_err(TransportError::from).boxed();
            Ok(ChatReply { persona, body })
        }
    }
}
