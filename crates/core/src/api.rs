//! Wire types of the chat proxy endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Path of the streaming chat endpoint.
pub const CHAT_PATH: &str = "/api/chat";

/// Response header carrying the resolved persona key.
pub const PERSONA_HEADER: &str = "x-persona";

/// Model the client asks for unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Error text of a request without a usable message.
pub const MESSAGE_REQUIRED: &str = "Message is required.";

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The new user turn.
    pub message: String,
    /// Prior turns, oldest first. `null` reads as no turns.
    #[serde(default, deserialize_with = "history_or_empty")]
    pub history: Vec<HistoryTurn>,
    /// The model id. The server's default model when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Thinking budget, `0` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<i32>,
    /// Persona key, `general` when absent or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// One prior turn of a [`ChatRequest`].
///
/// Any JSON value reads as a turn: a field that is missing or not a
/// string is `None`. Such turns still occupy a slot in the history
/// window and are skipped when the provider request is assembled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    /// `user` or `assistant`.
    pub role: Option<String>,
    /// The text of the turn.
    pub content: Option<String>,
}

impl<'de> Deserialize<'de> for HistoryTurn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let field = |name: &str| {
            value.get(name).and_then(Value::as_str).map(str::to_owned)
        };
        Ok(Self {
            role: field("role"),
            content: field("content"),
        })
    }
}

fn history_or_empty<'de, D>(deserializer: D) -> Result<Vec<HistoryTurn>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<HistoryTurn>>::deserialize(deserializer)?.unwrap_or_default())
}

impl HistoryTurn {
    /// Creates a turn with both fields set.
    #[inline]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
        }
    }
}

/// JSON body of an error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// A short, stable description.
    pub error: String,
    /// Details for diagnosis, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ChatRequest =
            serde_json::from_value(json!({ "message": "Hi" })).unwrap();
        assert_eq!(req.message, "Hi");
        assert!(req.history.is_empty());
        assert_eq!(req.model, None);
        assert_eq!(req.thinking_budget, None);
        assert_eq!(req.persona, None);
    }

    #[test]
    fn test_request_wire_names() {
        let req = ChatRequest {
            message: "Hi".to_owned(),
            history: vec![HistoryTurn::new("user", "Hello")],
            model: Some("gemini-2.5-flash".to_owned()),
            thinking_budget: Some(0),
            persona: Some("swe".to_owned()),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "message": "Hi",
                "history": [{ "role": "user", "content": "Hello" }],
                "model": "gemini-2.5-flash",
                "thinkingBudget": 0,
                "persona": "swe"
            })
        );
    }

    #[test]
    fn test_lenient_history_turns() {
        let req: ChatRequest = serde_json::from_value(json!({
            "message": "Hi",
            "history": [{ "role": "user" }, { "content": "orphan" }]
        }))
        .unwrap();
        assert_eq!(req.history[0].content, None);
        assert_eq!(req.history[1].role, None);
    }

    #[test]
    fn test_malformed_history_entries() {
        let req: ChatRequest = serde_json::from_value(json!({
            "message": "Hi",
            "history": [
                null,
                "text",
                { "role": "user", "content": 42 },
                { "role": ["user"], "content": "no role" },
                { "role": "assistant", "content": "kept" }
            ]
        }))
        .unwrap();
        assert_eq!(
            req.history,
            vec![
                HistoryTurn::default(),
                HistoryTurn::default(),
                HistoryTurn {
                    role: Some("user".to_owned()),
                    content: None,
                },
                HistoryTurn {
                    role: None,
                    content: Some("no role".to_owned()),
                },
                HistoryTurn::new("assistant", "kept"),
            ]
        );

        let req: ChatRequest =
            serde_json::from_value(json!({ "message": "Hi", "history": null }))
                .unwrap();
        assert!(req.history.is_empty());

        for history in [json!("nope"), json!(3), json!({ "role": "user" })] {
            let body = json!({ "message": "Hi", "history": history });
            assert!(serde_json::from_value::<ChatRequest>(body).is_err());
        }
    }
}
