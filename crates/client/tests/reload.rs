use std::future::ready;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use persona_chat_client::core::Persona;
use persona_chat_client::core::api::ChatRequest;
use persona_chat_client::storage::FileStore;
use persona_chat_client::{
    AnswerFrame, ChatController, ChatOptions, ChatReply, ChatTransport,
    ChatView, ConversationStore, Message, ThreadEntry, ThreadManager,
    TransportError, TurnOutcome,
};
use tokio_util::sync::CancellationToken;

/// Answers every request with the same chunks.
struct EchoTransport(Vec<&'static str>);

impl ChatTransport for EchoTransport {
    fn open(
        &self,
        _request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send {
        let chunks: Vec<Result<Bytes, TransportError>> = self
            .0
            .iter()
            .copied()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        ready(Ok(ChatReply {
            persona: None,
            body: stream::iter(chunks).boxed(),
        }))
    }
}

#[derive(Default)]
struct NullView {
    answer: String,
}

impl ChatView for NullView {
    fn show_conversation(&mut self, _messages: &[Message]) {}
    fn show_greeting(&mut self, _text: &str) {}
    fn show_threads(&mut self, _threads: &[ThreadEntry]) {}
    fn show_user_message(&mut self, _text: &str) {}
    fn show_thinking(&mut self) {}
    fn show_answer(&mut self, frame: &AnswerFrame<'_>) {
        self.answer = frame.markdown.to_owned();
    }
    fn show_error(&mut self, _text: &str) {}
    fn highlight_code(&mut self) {}
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

fn open(
    path: &std::path::Path,
) -> ChatController<FileStore, EchoTransport, NullView> {
    let store = ConversationStore::new(FileStore::open(path).unwrap());
    ChatController::new(
        ThreadManager::bootstrap(store),
        EchoTransport(vec!["Hi ", "there", "!"]),
        NullView::default(),
        ChatOptions::default(),
    )
}

#[tokio::test]
async fn test_thread_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut controller = open(&path);
    controller.new_thread();
    controller.set_persona(Persona::Frontend);
    let outcome = controller.send("Hello", &CancellationToken::new()).await;
    assert!(matches!(outcome, TurnOutcome::Answered(ref a) if a == "Hi there!"));
    assert_eq!(controller.view().answer, "Hi there!");

    let id = controller.current_thread_id().to_owned();
    let threads = controller.threads();
    drop(controller);

    let controller = open(&path);
    assert_eq!(controller.current_thread_id(), id);
    assert_eq!(controller.threads(), threads);
    assert_eq!(
        controller.messages(),
        [Message::user("Hello"), Message::assistant("Hi there!")]
    );
    assert_eq!(controller.persona(), Persona::Frontend);
}

#[tokio::test]
async fn test_corrupt_store_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "\u{0}garbage").unwrap();

    let controller = open(&path);
    assert_eq!(controller.threads().len(), 1);
    assert!(controller.messages().is_empty());
    assert_eq!(controller.persona(), Persona::General);
}
