use crate::conversation::{Message, Role};

/// Whether a reply is being generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Streaming,
}

/// A turn to send to the proxy, produced by a transition into
/// [`Phase::Streaming`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTurn {
    /// The user message to answer.
    pub message: String,
    /// The messages before it.
    pub history: Vec<Message>,
}

/// The message list of the active thread and its send/edit/clear
/// transitions.
///
/// At most one reply is in flight. Every transition that would start or
/// disturb a second one is ignored while [`Phase::Streaming`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientSession {
    messages: Vec<Message>,
    phase: Phase,
}

impl ClientSession {
    /// Creates an idle session over `messages`.
    #[inline]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            phase: Phase::Idle,
        }
    }

    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.phase == Phase::Streaming
    }

    /// Appends a user message and starts streaming its answer.
    pub fn send(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if self.is_streaming() || text.is_empty() {
            return None;
        }
        let history = self.messages.clone();
        self.messages.push(Message::user(text));
        self.phase = Phase::Streaming;
        Some(PendingTurn {
            message: text.to_owned(),
            history,
        })
    }

    /// Whether the conversation ends with a user message and its answer.
    pub fn can_edit_last_user(&self) -> bool {
        matches!(
            self.messages.as_slice(),
            [.., user, assistant]
                if user.role == Role::User && assistant.role == Role::Assistant
        )
    }

    /// Replaces the last user message, drops its answer and streams a new
    /// one.
    pub fn edit_last_user(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if self.is_streaming() || text.is_empty() || !self.can_edit_last_user() {
            return None;
        }
        self.messages.pop();
        let last = self.messages.len() - 1;
        self.messages[last].content = text.to_owned();
        self.phase = Phase::Streaming;
        Some(PendingTurn {
            message: text.to_owned(),
            history: self.messages[..last].to_vec(),
        })
    }

    /// Empties the conversation. Returns whether anything happened.
    pub fn clear(&mut self) -> bool {
        if self.is_streaming() {
            return false;
        }
        self.messages.clear();
        true
    }

    /// Commits the streamed answer and goes back to idle.
    pub fn complete(&mut self, answer: String) {
        if self.is_streaming() {
            self.messages.push(Message::assistant(answer));
            self.phase = Phase::Idle;
        }
    }

    /// Ends streaming without committing anything. The user message stays,
    /// still awaiting an answer.
    #[inline]
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered() -> ClientSession {
        ClientSession::new(vec![
            Message::user("What is Rust?"),
            Message::assistant("A language."),
        ])
    }

    #[test]
    fn test_send() {
        let mut session = answered();
        let turn = session.send("  Tell me more  ").unwrap();
        assert_eq!(turn.message, "Tell me more");
        assert_eq!(turn.history, answered().messages);
        assert!(session.is_streaming());
        assert_eq!(session.messages().len(), 3);

        session.complete("Sure.".to_owned());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.messages()[3], Message::assistant("Sure."));
    }

    #[test]
    fn test_blank_send_is_ignored() {
        let mut session = ClientSession::default();
        assert_eq!(session.send(""), None);
        assert_eq!(session.send(" \n\t"), None);
        assert!(session.messages().is_empty());
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_transitions_while_streaming_are_ignored() {
        let mut session = answered();
        session.send("Next").unwrap();
        let before = session.clone();

        assert_eq!(session.send("Another"), None);
        assert_eq!(session.edit_last_user("Edited"), None);
        assert!(!session.clear());
        assert_eq!(session, before);
    }

    #[test]
    fn test_edit_last_user() {
        let mut session = ClientSession::new(vec![
            Message::user("First"),
            Message::assistant("One"),
            Message::user("Second"),
            Message::assistant("Two"),
        ]);
        assert!(session.can_edit_last_user());

        let turn = session.edit_last_user(" Second, revised ").unwrap();
        assert_eq!(turn.message, "Second, revised");
        assert_eq!(
            turn.history,
            vec![Message::user("First"), Message::assistant("One")]
        );
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], Message::user("Second, revised"));

        session.complete("Two, revised".to_owned());
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.messages()[3].content, "Two, revised");
    }

    #[test]
    fn test_edit_needs_answered_tail() {
        let mut pending = ClientSession::new(vec![Message::user("Unanswered")]);
        assert!(!pending.can_edit_last_user());
        assert_eq!(pending.edit_last_user("x"), None);

        let mut session = answered();
        assert_eq!(session.edit_last_user("   "), None);
        assert_eq!(session, answered());

        assert!(!ClientSession::default().can_edit_last_user());
    }

    #[test]
    fn test_abort_keeps_user_message() {
        let mut session = ClientSession::default();
        session.send("Hello").unwrap();
        session.abort();
        assert_eq!(session.messages(), [Message::user("Hello")]);
        assert!(!session.is_streaming());
        assert!(!session.can_edit_last_user());
    }

    #[test]
    fn test_clear() {
        let mut session = answered();
        assert!(session.clear());
        assert!(session.messages().is_empty());
    }
}
