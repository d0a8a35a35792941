use persona_chat_core::api::HistoryTurn;
use serde::{Deserialize, Serialize};

/// Title of a thread without any user message.
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Shown in an empty conversation. Never stored in the history.
pub const GREETING: &str = "Hello! Ask me anything.";

const TITLE_MAX_CHARS: usize = 40;

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Generated by the model.
    Assistant,
}

impl Role {
    /// The role name used on the wire.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One committed message of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// The text, Markdown for assistant messages.
    pub content: String,
}

impl Message {
    /// Creates a user message.
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for HistoryTurn {
    fn from(message: &Message) -> Self {
        HistoryTurn::new(message.role.as_str(), message.content.clone())
    }
}

/// A persisted conversation thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    /// `t_` followed by a unique suffix.
    pub id: String,
    /// See [`title_from`].
    pub title: String,
    /// Messages in order.
    pub history: Vec<Message>,
    /// Last modification time, in epoch milliseconds.
    pub updated_at: i64,
}

impl ThreadRecord {
    /// Creates an empty thread.
    pub fn new(id: impl Into<String>, now: i64) -> Self {
        Self {
            id: id.into(),
            title: NEW_CHAT_TITLE.to_owned(),
            history: vec![],
            updated_at: now,
        }
    }
}

/// Derives a thread title: the first user message cut to 40 characters,
/// or [`NEW_CHAT_TITLE`].
pub fn title_from(history: &[Message]) -> String {
    history
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(TITLE_MAX_CHARS).collect())
        .unwrap_or_else(|| NEW_CHAT_TITLE.to_owned())
}
