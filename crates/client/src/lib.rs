//! The chat client: threads persisted in a key-value store, the
//! conversation state machine, and the streaming renderer, driven by a
//! single [`ChatController`].
//!
//! Storage, transport and view are traits, so the same client logic runs
//! behind a terminal front-end or any other UI.

#[macro_use]
extern crate tracing;

mod controller;
mod conversation;
mod decode;
mod input;
mod markdown;
mod render;
mod session;
pub mod storage;
mod store;
#[cfg(test)]
mod testing;
mod threads;
mod transport;
mod view;

pub use controller::{ChatController, ChatOptions, TurnOutcome};
pub use conversation::{
    GREETING, Message, NEW_CHAT_TITLE, Role, ThreadRecord, title_from,
};
pub use decode::Utf8Decoder;
pub use input::{Input, next_line};
pub use markdown::render_markdown;
pub use render::{Indicator, StreamFailure, StreamRenderer};
pub use session::{ClientSession, PendingTurn, Phase};
pub use store::{ConversationStore, ThreadMap};
pub use threads::{Clock, ThreadEntry, ThreadManager};
pub use transport::{
    ByteStream, ChatReply, ChatTransport, HttpTransport, TransportError,
};
pub use view::{AnswerFrame, ChatView};

/// Re-exports of [`persona_chat_core`] crate.
pub mod core {
    pub use persona_chat_core::*;
}
