use persona_chat_model::{GenerationOptions, ModelMessage, ModelRequest};

use crate::api::ChatRequest;
use crate::persona::Persona;

/// Number of most recent history turns forwarded to the provider.
pub const MAX_HISTORY_TURNS: usize = 16;

/// Knobs for building the system prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Asks the model to tag its answer with the persona key.
    pub debug_persona: bool,
}

/// A provider request together with the persona it was built for.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledRequest {
    /// The resolved persona.
    pub persona: Persona,
    /// The request to send to the provider.
    pub request: ModelRequest,
}

/// Builds the provider request for a validated chat turn.
///
/// Only the last [`MAX_HISTORY_TURNS`] history entries are considered, and
/// entries without a role or content are dropped after that cut. The
/// current message always comes last as a user turn.
pub fn assemble_request(
    chat: &ChatRequest,
    options: &PromptOptions,
) -> AssembledRequest {
    let persona = Persona::resolve(chat.persona.as_deref());

    let skip = chat.history.len().saturating_sub(MAX_HISTORY_TURNS);
    let mut messages: Vec<ModelMessage> = chat.history[skip..]
        .iter()
        .filter_map(|turn| {
            let role = turn.role.as_deref().filter(|r| !r.is_empty())?;
            let content = turn.content.clone().filter(|c| !c.is_empty())?;
            Some(if role == "user" {
                ModelMessage::User(content)
            } else {
                ModelMessage::Assistant(content)
            })
        })
        .collect();
    messages.push(ModelMessage::User(chat.message.clone()));

    let mut system_instruction = persona.system_prompt().to_owned();
    if options.debug_persona {
        system_instruction.push_str(&format!(
            "\n\n[DEBUG] At the VERY beginning of your response, output exactly \
             <<<persona:{}>>> and then continue normally.",
            persona.key()
        ));
    }

    // Without a model the provider's configured default is used.
    let model = chat.model.clone().filter(|m| !m.is_empty());

    trace!(
        persona = persona.key(),
        model = model.as_deref().unwrap_or("<provider default>"),
        turns = messages.len(),
        "assembled provider request"
    );

    AssembledRequest {
        persona,
        request: ModelRequest {
            model,
            system_instruction: Some(system_instruction),
            messages,
            options: GenerationOptions {
                temperature: persona.defaults().temperature,
                thinking_budget: chat.thinking_budget.unwrap_or(0),
                ..Default::default()
            },
        },
    }
}
