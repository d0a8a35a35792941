use futures_util::StreamExt;
use persona_chat_core::Persona;
use persona_chat_core::api::{ChatRequest, DEFAULT_MODEL, HistoryTurn};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::conversation::{GREETING, Message};
use crate::render::{StreamFailure, StreamRenderer};
use crate::session::{ClientSession, PendingTurn};
use crate::storage::KeyValueStore;
use crate::threads::{ThreadEntry, ThreadManager};
use crate::transport::ChatTransport;
use crate::view::ChatView;

/// Per-client request settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOptions {
    pub model: String,
    pub thinking_budget: i32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            thinking_budget: 0,
        }
    }
}

/// What became of a send or edit.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Nothing happened: blank input, a stream already running, or no
    /// editable turn.
    Ignored,
    /// The answer was committed.
    Answered(String),
    /// The stream failed, nothing was committed.
    Failed(StreamFailure),
}

/// The client session: the current conversation, its threads, the
/// transport to the proxy and the view, wired together.
pub struct ChatController<S, T, V> {
    threads: ThreadManager<S>,
    session: ClientSession,
    transport: T,
    view: V,
    options: ChatOptions,
}

impl<S, T, V> ChatController<S, T, V>
where
    S: KeyValueStore,
    T: ChatTransport,
    V: ChatView,
{
    /// Shows the current thread of `threads`.
    pub fn new(
        threads: ThreadManager<S>,
        transport: T,
        view: V,
        options: ChatOptions,
    ) -> Self {
        let session = ClientSession::new(threads.current().history.clone());
        let mut controller = Self {
            threads,
            session,
            transport,
            view,
            options,
        };
        controller.show_current();
        controller
    }

    #[inline]
    pub fn messages(&self) -> &[Message] {
        self.session.messages()
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming()
    }

    #[inline]
    pub fn can_edit_last_user(&self) -> bool {
        self.session.can_edit_last_user()
    }

    #[inline]
    pub fn current_thread_id(&self) -> &str {
        self.threads.current_id()
    }

    #[inline]
    pub fn threads(&self) -> Vec<ThreadEntry> {
        self.threads.list()
    }

    #[inline]
    pub fn persona(&self) -> Persona {
        self.threads.persona()
    }

    /// Selects the persona for the following turns and remembers it.
    pub fn set_persona(&mut self, persona: Persona) {
        debug!("persona set to {persona}");
        self.threads.set_persona(persona);
    }

    #[inline]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[inline]
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Gives back the thread manager, e.g. to reload its store.
    #[inline]
    pub fn into_threads(self) -> ThreadManager<S> {
        self.threads
    }

    /// Sends `text` and streams the answer until done or `cancel` fires.
    pub async fn send(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let Some(turn) = self.session.send(text) else {
            return TurnOutcome::Ignored;
        };
        self.view.show_user_message(&turn.message);
        self.run_turn(turn, cancel).await
    }

    /// Replaces the last user message and streams a new answer.
    pub async fn edit_last_user(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let Some(turn) = self.session.edit_last_user(text) else {
            return TurnOutcome::Ignored;
        };
        self.view.show_conversation(self.session.messages());
        self.run_turn(turn, cancel).await
    }

    /// Empties the current thread.
    pub fn clear(&mut self) -> bool {
        if !self.session.clear() {
            return false;
        }
        self.threads.save_current(self.session.messages());
        self.show_current();
        true
    }

    /// Starts a new thread.
    pub fn new_thread(&mut self) -> bool {
        if self.session.is_streaming() {
            return false;
        }
        self.threads.new_thread();
        self.mirror_current();
        true
    }

    /// Opens the thread `id`.
    pub fn switch_thread(&mut self, id: &str) -> bool {
        if self.session.is_streaming() || self.threads.switch_thread(id).is_none() {
            return false;
        }
        self.mirror_current();
        true
    }

    /// The question [`Self::delete_thread`] asks for `id`, if it exists.
    pub fn delete_prompt(&self, id: &str) -> Option<String> {
        self.threads.delete_prompt(id)
    }

    /// Deletes the thread `id` after asking the view for confirmation.
    pub fn delete_thread(&mut self, id: &str) -> bool {
        if self.session.is_streaming() {
            return false;
        }
        let current = self.threads.current_id().to_owned();
        let view = &mut self.view;
        if !self.threads.delete_thread(id, |prompt| view.confirm(prompt)) {
            return false;
        }
        if self.threads.current_id() != current {
            self.mirror_current();
        } else {
            self.view.show_threads(&self.threads.list());
        }
        true
    }

    async fn run_turn(
        &mut self,
        turn: PendingTurn,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let persona = self.threads.persona();
        let request = ChatRequest {
            message: turn.message,
            history: turn.history.iter().map(HistoryTurn::from).collect(),
            model: Some(self.options.model.clone()),
            thinking_budget: Some(self.options.thinking_budget),
            persona: Some(persona.key().to_owned()),
        };
        debug!(
            persona = persona.key(),
            turns = request.history.len(),
            "opening stream"
        );

        let mut renderer = StreamRenderer::start(&mut self.view);
        let result = pump(
            &self.transport,
            &request,
            &mut renderer,
            &mut self.view,
            cancel,
        )
        .await;

        let outcome = match result {
            Ok(()) => {
                let answer = renderer.finish(&mut self.view);
                self.session.complete(answer.clone());
                TurnOutcome::Answered(answer)
            }
            Err(failure) => {
                match &failure {
                    StreamFailure::Cancelled => debug!("stream cancelled"),
                    failure => warn!("stream failed: {failure}"),
                }
                renderer.fail(&failure, &mut self.view);
                self.session.abort();
                TurnOutcome::Failed(failure)
            }
        };
        self.threads.save_current(self.session.messages());
        self.view.show_threads(&self.threads.list());
        outcome
    }

    fn mirror_current(&mut self) {
        self.session = ClientSession::new(self.threads.current().history.clone());
        self.show_current();
    }

    fn show_current(&mut self) {
        self.view.show_conversation(self.session.messages());
        if self.session.messages().is_empty() {
            self.view.show_greeting(GREETING);
        }
        self.view.show_threads(&self.threads.list());
    }
}

async fn pump<T: ChatTransport, V: ChatView>(
    transport: &T,
    request: &ChatRequest,
    renderer: &mut StreamRenderer,
    view: &mut V,
    cancel: &CancellationToken,
) -> Result<(), StreamFailure> {
    let reply = select! {
        biased;
        _ = cancel.cancelled() => return Err(StreamFailure::Cancelled),
        reply = transport.open(request) => reply?,
    };
    if let Some(persona) = &reply.persona {
        trace!("proxy answers as {persona}");
    }

    let mut body = reply.body;
    loop {
        let chunk = select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamFailure::Cancelled),
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => renderer.push_chunk(&bytes, view),
            Some(Err(err)) => return Err(err.into()),
            None => return Ok(()),
        }
    }
}
