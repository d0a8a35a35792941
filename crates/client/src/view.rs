use crate::conversation::Message;
use crate::threads::ThreadEntry;

/// A snapshot of the answer being streamed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnswerFrame<'a> {
    /// Everything received so far.
    pub markdown: &'a str,
    /// `markdown`, rendered and sanitized.
    pub html: &'a str,
    /// The text added since the previous frame.
    pub delta: &'a str,
    /// More text is expected; show the caret.
    pub typing: bool,
}

/// The presentation layer driven by [`ChatController`].
///
/// [`ChatController`]: crate::ChatController
pub trait ChatView {
    /// Replaces the conversation pane with `messages`.
    fn show_conversation(&mut self, messages: &[Message]);

    /// Shows a canned assistant bubble that is not part of the history.
    fn show_greeting(&mut self, text: &str);

    fn show_threads(&mut self, threads: &[ThreadEntry]);

    /// Appends a user bubble.
    fn show_user_message(&mut self, text: &str);

    /// Starts a new answer bubble with a thinking indicator.
    fn show_thinking(&mut self);

    /// Re-renders the answer bubble.
    fn show_answer(&mut self, frame: &AnswerFrame<'_>);

    /// Replaces the answer bubble with an error text.
    fn show_error(&mut self, text: &str);

    /// Asks for syntax highlighting of code blocks in the settled answer.
    fn highlight_code(&mut self);

    /// Asks the user a yes/no question.
    fn confirm(&mut self, prompt: &str) -> bool;
}
