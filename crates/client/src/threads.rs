use chrono::{Local, TimeZone, Utc};
use persona_chat_core::Persona;
use uuid::Uuid;

use crate::conversation::{Message, ThreadRecord, title_from};
use crate::storage::{KeyValueStore, StorageError};
use crate::store::{ConversationStore, ThreadMap};

/// Source of "now", in epoch milliseconds.
pub type Clock = Box<dyn FnMut() -> i64 + Send>;

/// A row of the thread list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadEntry {
    pub id: String,
    pub title: String,
    pub updated_at: i64,
    /// `updated_at` in local time, for display.
    pub updated_label: String,
    pub current: bool,
}

/// Owns the set of threads and which one is current, and keeps the
/// [`ConversationStore`] in sync with them.
pub struct ThreadManager<S> {
    store: ConversationStore<S>,
    threads: ThreadMap,
    current_id: String,
    clock: Clock,
}

impl<S: KeyValueStore> ThreadManager<S> {
    /// Loads the persisted threads using the system clock.
    #[inline]
    pub fn bootstrap(store: ConversationStore<S>) -> Self {
        Self::bootstrap_with_clock(
            store,
            Box::new(|| Utc::now().timestamp_millis()),
        )
    }

    /// Loads the persisted threads and reopens the current one. A fresh
    /// thread is created if there is no current thread or it is gone.
    pub fn bootstrap_with_clock(store: ConversationStore<S>, clock: Clock) -> Self {
        let threads = store.load_threads();
        let current_id = store
            .current_thread_id()
            .filter(|id| threads.contains_key(id));

        let mut manager = Self {
            store,
            threads,
            current_id: String::new(),
            clock,
        };
        match current_id {
            Some(id) => {
                debug!("reopening thread {id}");
                manager.current_id = id;
            }
            None => {
                manager.new_thread();
            }
        }
        manager
    }

    /// Threads ordered by last update, most recent first.
    pub fn list(&self) -> Vec<ThreadEntry> {
        let mut records: Vec<&ThreadRecord> = self.threads.values().collect();
        records.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id))
        });
        records
            .into_iter()
            .map(|record| ThreadEntry {
                id: record.id.clone(),
                title: record.title.clone(),
                updated_at: record.updated_at,
                updated_label: local_label(record.updated_at),
                current: record.id == self.current_id,
            })
            .collect()
    }

    /// The current thread.
    pub fn current(&self) -> &ThreadRecord {
        // The current id always names an entry: every path that removes the
        // current thread picks or creates another one first.
        &self.threads[&self.current_id]
    }

    #[inline]
    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&ThreadRecord> {
        self.threads.get(id)
    }

    /// Creates an empty thread and makes it current.
    pub fn new_thread(&mut self) -> &ThreadRecord {
        let id = format!("t_{}", Uuid::new_v4().simple());
        let now = (self.clock)();
        debug!("creating thread {id}");
        self.threads.insert(id.clone(), ThreadRecord::new(id.clone(), now));
        self.current_id = id;
        self.persist();
        self.current()
    }

    /// Makes `id` current. Returns `None` if there is no such thread.
    pub fn switch_thread(&mut self, id: &str) -> Option<&ThreadRecord> {
        if !self.threads.contains_key(id) {
            return None;
        }
        self.current_id = id.to_owned();
        self.persist_current_id();
        Some(self.current())
    }

    /// The question asked before deleting `id`.
    pub fn delete_prompt(&self, id: &str) -> Option<String> {
        self.threads.get(id).map(|record| {
            format!(
                "Delete chat \"{}\"? This cannot be undone.",
                record.title
            )
        })
    }

    /// Deletes `id` if `confirm` agrees to [`Self::delete_prompt`].
    ///
    /// When the current thread goes, the most recently updated remaining
    /// thread becomes current, or a new one is created. Returns whether the
    /// thread was deleted.
    pub fn delete_thread<F>(&mut self, id: &str, confirm: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        let Some(prompt) = self.delete_prompt(id) else {
            return false;
        };
        if !confirm(&prompt) {
            return false;
        }

        self.threads.remove(id);
        debug!("deleted thread {id}");
        if self.current_id == id {
            let fallback = self
                .threads
                .values()
                .max_by(|a, b| {
                    a.updated_at.cmp(&b.updated_at).then_with(|| b.id.cmp(&a.id))
                })
                .map(|record| record.id.clone());
            match fallback {
                Some(next) => self.current_id = next,
                None => {
                    self.new_thread();
                    return true;
                }
            }
        }
        self.persist();
        true
    }

    /// Stores `history` into the current thread and refreshes its title and
    /// timestamp.
    pub fn save_current(&mut self, history: &[Message]) {
        let now = (self.clock)();
        if let Some(record) = self.threads.get_mut(&self.current_id) {
            record.history = history.to_vec();
            record.title = title_from(history);
            record.updated_at = now;
        }
        self.persist();
    }

    #[inline]
    pub fn persona(&self) -> Persona {
        self.store.persona()
    }

    pub fn set_persona(&mut self, persona: Persona) {
        if let Err(err) = self.store.set_persona(persona) {
            warn!("failed to remember persona: {err}");
        }
    }

    /// Gives back the store, e.g. to reload it.
    #[inline]
    pub fn into_store(self) -> ConversationStore<S> {
        self.store
    }

    fn persist(&mut self) {
        if let Err(err) = self.try_persist() {
            warn!("failed to save threads: {err}");
        }
    }

    fn try_persist(&mut self) -> Result<(), StorageError> {
        self.store.save_threads(&self.threads)?;
        self.store.set_current_thread_id(&self.current_id)
    }

    fn persist_current_id(&mut self) {
        if let Err(err) = self.store.set_current_thread_id(&self.current_id) {
            warn!("failed to save the current thread: {err}");
        }
    }
}

fn local_label(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%b %-d, %H:%M").to_string())
        .unwrap_or_default()
}
