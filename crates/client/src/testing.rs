//! Test doubles for the view and the transport.

use std::collections::VecDeque;
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use persona_chat_core::api::ChatRequest;

use crate::conversation::Message;
use crate::threads::ThreadEntry;
use crate::transport::{ChatReply, ChatTransport, TransportError};
use crate::view::{AnswerFrame, ChatView};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ViewEvent {
    Conversation(usize),
    Greeting,
    Threads(usize),
    User(String),
    Thinking,
    Answer { html: String, typing: bool },
    Error(String),
    Highlight,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingView {
    pub events: Vec<ViewEvent>,
    pub prompts: Vec<String>,
    pub confirm_answer: bool,
}

impl ChatView for RecordingView {
    fn show_conversation(&mut self, messages: &[Message]) {
        self.events.push(ViewEvent::Conversation(messages.len()));
    }

    fn show_greeting(&mut self, _text: &str) {
        self.events.push(ViewEvent::Greeting);
    }

    fn show_threads(&mut self, threads: &[ThreadEntry]) {
        self.events.push(ViewEvent::Threads(threads.len()));
    }

    fn show_user_message(&mut self, text: &str) {
        self.events.push(ViewEvent::User(text.to_owned()));
    }

    fn show_thinking(&mut self) {
        self.events.push(ViewEvent::Thinking);
    }

    fn show_answer(&mut self, frame: &AnswerFrame<'_>) {
        self.events.push(ViewEvent::Answer {
            html: frame.html.to_owned(),
            typing: frame.typing,
        });
    }

    fn show_error(&mut self, text: &str) {
        self.events.push(ViewEvent::Error(text.to_owned()));
    }

    fn highlight_code(&mut self) {
        self.events.push(ViewEvent::Highlight);
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_owned());
        self.confirm_answer
    }
}

pub(crate) enum ScriptedReply {
    /// A successful body made of these chunks.
    Chunks(Vec<Bytes>),
    /// A non-success status.
    Status(u16),
    /// These chunks, then a broken connection.
    Broken(Vec<String>),
}

impl ScriptedReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(
            chunks
                .into_iter()
                .map(|c| Bytes::from(c.into()))
                .collect(),
        )
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<ChatRequest>,
}

/// Answers requests from a queue of replies and records them. Clones
/// share the queue.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn push(&self, reply: ScriptedReply) {
        self.lock().replies.push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ChatTransport for ScriptedTransport {
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send {
        let mut script = self.lock();
        script.requests.push(request.clone());
        let result = match script.replies.pop_front() {
            None => Err(TransportError::Network("no scripted reply".to_owned())),
            Some(ScriptedReply::Status(status)) => {
                Err(TransportError::Status(status))
            }
            Some(ScriptedReply::Chunks(chunks)) => Ok(ChatReply {
                persona: request.persona.clone(),
                body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
            }),
            Some(ScriptedReply::Broken(chunks)) => {
                let items = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from(c)))
                    .chain([Err(TransportError::Network(
                        "connection reset".to_owned(),
                    ))]);
                Ok(ChatReply {
                    persona: request.persona.clone(),
                    body: stream::iter(items).boxed(),
                })
            }
        };
        ready(result)
    }
}
