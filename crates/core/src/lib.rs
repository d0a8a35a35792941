//! Shared logic of the chat proxy: the persona registry, the wire types
//! of `POST /api/chat`, and assembly of provider requests from a chat turn.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod api;
mod assemble;
mod model_client;
pub mod persona;

pub use assemble::{AssembledRequest, MAX_HISTORY_TURNS, PromptOptions, assemble_request};
pub use model_client::{ModelClient, ModelError, TextStream};
pub use persona::{Persona, PersonaDefaults};
pub use persona_chat_model::{ErrorKind, ModelProviderError};
