use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// Breaks the stream with an error after the preceding events.
    #[serde(rename = "failure")]
    Failure(String),
}

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request is rejected with this message before any
    /// event is produced.
    pub rejection: Option<String>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            rejection: None,
        }
    }

    /// Creates a `PresetResponse` streaming the given text fragments.
    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_events(
            fragments
                .into_iter()
                .map(|f| PresetEvent::MessageDelta(f.into()))
                .collect::<Vec<_>>(),
        )
    }

    /// Creates a `PresetResponse` that is rejected before streaming.
    #[inline]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            events: vec![],
            rejection: Some(message.into()),
        }
    }
}
