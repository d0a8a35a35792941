use thiserror::Error;

use crate::decode::Utf8Decoder;
use crate::markdown::render_markdown;
use crate::transport::TransportError;
use crate::view::{AnswerFrame, ChatView};

/// Why a streamed answer was not committed.
#[derive(Debug, Error)]
pub enum StreamFailure {
    /// The proxy answered with a non-success status.
    #[error("proxy answered with status {0}")]
    Status(u16),

    /// The connection failed or broke off.
    #[error("stream interrupted: {0}")]
    Network(String),

    /// The stream was cancelled by the user.
    #[error("generation stopped")]
    Cancelled,
}

impl StreamFailure {
    /// The text shown in place of the answer.
    pub fn user_message(&self) -> String {
        match self {
            StreamFailure::Status(status) => {
                format!("Error: {status} — check server logs.")
            }
            StreamFailure::Network(_) => {
                "Network error — check server console.".to_owned()
            }
            StreamFailure::Cancelled => "Generation stopped.".to_owned(),
        }
    }
}

impl From<TransportError> for StreamFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status(status) => StreamFailure::Status(status),
            err => StreamFailure::Network(err.to_string()),
        }
    }
}

/// Progress of the answer bubble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Nothing received yet.
    Thinking,
    /// Text is arriving.
    Typing,
    /// Done, successfully or not.
    Settled,
}

/// Turns the proxy's byte stream into answer frames.
#[derive(Debug)]
pub struct StreamRenderer {
    decoder: Utf8Decoder,
    buffer: String,
    indicator: Indicator,
}

impl StreamRenderer {
    /// Starts an answer bubble in the thinking state.
    pub fn start<V: ChatView>(view: &mut V) -> Self {
        view.show_thinking();
        Self {
            decoder: Utf8Decoder::default(),
            buffer: String::new(),
            indicator: Indicator::Thinking,
        }
    }

    #[inline]
    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// The decoded text so far.
    #[inline]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Decodes `chunk` and re-renders the whole answer.
    pub fn push_chunk<V: ChatView>(&mut self, chunk: &[u8], view: &mut V) {
        let delta = self.decoder.decode(chunk);
        if delta.is_empty() {
            return;
        }
        if self.indicator == Indicator::Thinking {
            trace!("first text arrived");
        }
        self.indicator = Indicator::Typing;
        self.buffer.push_str(&delta);
        self.render(&delta, true, view);
    }

    /// Settles the answer and returns its full text.
    pub fn finish<V: ChatView>(mut self, view: &mut V) -> String {
        let delta = self.decoder.finish();
        self.buffer.push_str(&delta);
        self.indicator = Indicator::Settled;
        self.render(&delta, false, view);
        view.highlight_code();
        self.buffer
    }

    /// Settles the answer with the error text of `failure`.
    pub fn fail<V: ChatView>(self, failure: &StreamFailure, view: &mut V) {
        view.show_error(&failure.user_message());
    }

    fn render<V: ChatView>(&self, delta: &str, typing: bool, view: &mut V) {
        let html = render_markdown(&self.buffer);
        view.show_answer(&AnswerFrame {
            markdown: &self.buffer,
            html: &html,
            delta,
            typing,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingView, ViewEvent};

    #[test]
    fn test_thinking_then_typing() {
        let mut view = RecordingView::default();
        let mut renderer = StreamRenderer::start(&mut view);
        assert_eq!(renderer.indicator(), Indicator::Thinking);

        // Half of "é" is not text yet.
        renderer.push_chunk(b"Caf\xc3", &mut view);
        assert_eq!(renderer.text(), "Caf");
        renderer.push_chunk(b"\xa9 **au lait**", &mut view);
        assert_eq!(renderer.indicator(), Indicator::Typing);

        let answer = renderer.finish(&mut view);
        assert_eq!(answer, "Café **au lait**");
        assert_eq!(
            view.events,
            vec![
                ViewEvent::Thinking,
                ViewEvent::Answer {
                    html: "<p>Caf</p>\n".to_owned(),
                    typing: true,
                },
                ViewEvent::Answer {
                    html: "<p>Café <strong>au lait</strong></p>\n".to_owned(),
                    typing: true,
                },
                ViewEvent::Answer {
                    html: "<p>Café <strong>au lait</strong></p>\n".to_owned(),
                    typing: false,
                },
                ViewEvent::Highlight,
            ]
        );
    }

    #[test]
    fn test_empty_chunk_keeps_thinking() {
        let mut view = RecordingView::default();
        let mut renderer = StreamRenderer::start(&mut view);
        renderer.push_chunk(b"", &mut view);
        assert_eq!(renderer.indicator(), Indicator::Thinking);
        assert_eq!(view.events, vec![ViewEvent::Thinking]);
    }

    #[test]
    fn test_failure_from_transport() {
        assert!(matches!(
            StreamFailure::from(TransportError::Status(502)),
            StreamFailure::Status(502)
        ));
        let failure =
            StreamFailure::from(TransportError::Network("connection reset".to_owned()));
        assert!(
            matches!(&failure, StreamFailure::Network(m) if m == "network error: connection reset")
        );
    }

    #[test]
    fn test_failures() {
        for (failure, text) in [
            (StreamFailure::Status(500), "Error: 500 — check server logs."),
            (
                StreamFailure::Network("reset".to_owned()),
                "Network error — check server console.",
            ),
            (StreamFailure::Cancelled, "Generation stopped."),
        ] {
            let mut view = RecordingView::default();
            let mut renderer = StreamRenderer::start(&mut view);
            renderer.push_chunk(b"partial", &mut view);
            renderer.fail(&failure, &mut view);
            assert_eq!(view.events.last(), Some(&ViewEvent::Error(text.to_owned())));
        }
    }
}
