use std::collections::BTreeMap;

use persona_chat_core::Persona;
use serde_json::Value;

use crate::conversation::ThreadRecord;
use crate::storage::{KeyValueStore, StorageError};

const THREADS_KEY: &str = "threads";
const CURRENT_THREAD_KEY: &str = "currentThreadId";
const PERSONA_KEY: &str = "persona";

/// Threads keyed by id.
pub type ThreadMap = BTreeMap<String, ThreadRecord>;

/// Typed access to the client's persisted state.
///
/// Unreadable values are treated as absent and reported as warnings.
#[derive(Debug)]
pub struct ConversationStore<S> {
    storage: S,
}

impl<S: KeyValueStore> ConversationStore<S> {
    #[inline]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Loads the stored threads, dropping the records that can't be read.
    pub fn load_threads(&self) -> ThreadMap {
        let Some(raw) = self.storage.get(THREADS_KEY) else {
            return ThreadMap::new();
        };
        let records: BTreeMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!("stored threads are corrupt, starting over: {err}");
                return ThreadMap::new();
            }
        };
        records
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(record) => Some((id, record)),
                Err(err) => {
                    warn!("dropping unreadable thread {id}: {err}");
                    None
                }
            })
            .collect()
    }

    pub fn save_threads(&mut self, threads: &ThreadMap) -> Result<(), StorageError> {
        let raw = serde_json::to_string(threads)?;
        self.storage.set(THREADS_KEY, raw)
    }

    pub fn current_thread_id(&self) -> Option<String> {
        self.storage
            .get(CURRENT_THREAD_KEY)
            .filter(|id| !id.is_empty())
    }

    pub fn set_current_thread_id(&mut self, id: &str) -> Result<(), StorageError> {
        self.storage.set(CURRENT_THREAD_KEY, id.to_owned())
    }

    /// The remembered persona, [`Persona::General`] if none.
    pub fn persona(&self) -> Persona {
        match self.storage.get(PERSONA_KEY) {
            Some(key) => Persona::from_key(&key).unwrap_or_else(|| {
                warn!("unknown stored persona {key:?}");
                Persona::default()
            }),
            None => Persona::default(),
        }
    }

    pub fn set_persona(&mut self, persona: Persona) -> Result<(), StorageError> {
        self.storage.set(PERSONA_KEY, persona.key().to_owned())
    }

    /// Gives back the underlying storage.
    #[inline]
    pub fn into_storage(self) -> S {
        self.storage
    }
}
