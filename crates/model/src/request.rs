use serde::{Deserialize, Serialize};

/// Maximum output size requested from the provider, in tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model identifier. Providers fall back to their configured
    /// default when this is `None`.
    pub model: Option<String>,
    /// The system instruction shaping the assistant.
    pub system_instruction: Option<String>,
    /// The conversation turns, oldest first. The last one is the turn
    /// the model should answer.
    pub messages: Vec<ModelMessage>,
    /// Sampling parameters.
    pub options: GenerationOptions,
}

/// A complete conversation turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// A previous answer of the model.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text of this turn.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Assistant(text) => text,
        }
    }
}

/// Sampling parameters for one generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound of generated tokens.
    pub max_output_tokens: u32,
    /// An opaque hint controlling internal deliberation effort. `0`
    /// disables thinking on providers that support it.
    pub thinking_budget: i32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            thinking_budget: 0,
        }
    }
}
