//! In-process conversation sessions
//!
//! A session is one browser tab's or terminal's running history. Sessions
//! live only in memory; persistent recall goes through the memory store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;
use uuid::Uuid;

/// One user message and the reply it got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    history: Vec<Exchange>,
    last_response: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            history: Vec::new(),
            last_response: None,
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn push(&mut self, user: &str, assistant: &str) {
        self.history.push(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        self.last_response = Some(assistant.to_string());
    }

    /// Forget the running history; persisted memory is untouched
    pub fn clear(&mut self) {
        self.history.clear();
        self.last_response = None;
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle; holding the lock serializes turns within one session
pub type SessionHandle = Arc<AsyncMutex<ChatSession>>;

/// Sessions kept before the least recently used one is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug)]
struct Slot {
    handle: SessionHandle,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Slots {
    map: HashMap<Uuid, Slot>,
    clock: u64,
}

/// Sessions keyed by id, bounded to `capacity` entries
#[derive(Debug)]
pub struct SessionRegistry {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            capacity: capacity.max(1),
        }
    }

    /// Existing session for `id`, or a new one (under `id` when given).
    /// Opening a new session past capacity evicts the least recently used.
    pub fn open(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut slots = self.lock();
        slots.clock += 1;
        let now = slots.clock;

        if let Some(slot) = slots.map.get_mut(&id) {
            slot.last_used = now;
            return (id, slot.handle.clone());
        }

        while slots.map.len() >= self.capacity {
            let oldest = slots
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| *key);
            match oldest {
                Some(evicted) => {
                    slots.map.remove(&evicted);
                    debug!(session_id = %evicted, "Evicted idle session");
                }
                None => break,
            }
        }

        let handle = Arc::new(AsyncMutex::new(ChatSession::with_id(id)));
        slots.map.insert(
            id,
            Slot {
                handle: handle.clone(),
                last_used: now,
            },
        );
        debug!(session_id = %id, "Created session");
        (id, handle)
    }

    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.lock().map.get(&id).map(|slot| slot.handle.clone())
    }

    /// Copy of the session's history; empty for unknown ids
    pub async fn history(&self, id: Uuid) -> Vec<Exchange> {
        match self.get(id) {
            Some(handle) => handle.lock().await.history().to_vec(),
            None => Vec::new(),
        }
    }

    /// Clear a session's history; false when the id is unknown
    pub async fn clear(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(handle) => {
                handle.lock().await.clear();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().map.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_push_and_clear() {
        let mut session = ChatSession::new();
        assert!(session.is_empty());
        session.push("hola", "hey");
        session.push("¿qué tal?", "bien");
        assert_eq!(session.len(), 2);
        assert_eq!(session.last_response(), Some("bien"));
        assert_eq!(session.history()[0].user, "hola");

        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.last_response(), None);
    }

    #[tokio::test]
    async fn test_registry_open_reuses_sessions() {
        let registry = SessionRegistry::new();
        let (id, handle) = registry.open(None);
        handle.lock().await.push("hola", "hey");

        let (same_id, same) = registry.open(Some(id));
        assert_eq!(same_id, id);
        assert_eq!(same.lock().await.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_open_with_unknown_id_creates_it() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        let (opened, handle) = registry.open(Some(id));
        assert_eq!(opened, id);
        assert_eq!(handle.lock().await.id, id);
    }

    #[tokio::test]
    async fn test_registry_history_and_clear() {
        let registry = SessionRegistry::new();
        let (id, handle) = registry.open(None);
        handle.lock().await.push("hola", "hey");

        assert_eq!(registry.history(id).await.len(), 1);
        assert!(registry.clear(id).await);
        assert!(registry.history(id).await.is_empty());

        let unknown = Uuid::new_v4();
        assert!(registry.history(unknown).await.is_empty());
        assert!(!registry.clear(unknown).await);
    }

    #[test]
    fn test_registry_remove() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.open(None);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_removed_session_has_no_history() {
        let registry = SessionRegistry::new();
        let (id, handle) = registry.open(None);
        tokio_test::block_on(async { handle.lock().await.push("hola", "hey") });
        assert_eq!(tokio_test::block_on(registry.history(id)).len(), 1);

        registry.remove(id);
        assert!(tokio_test::block_on(registry.history(id)).is_empty());
    }

    #[test]
    fn test_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::with_capacity(2);
        let (first, _) = registry.open(None);
        let (second, _) = registry.open(None);

        // Touching the first makes the second the oldest
        registry.open(Some(first));
        let (third, _) = registry.open(None);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(first).is_some());
        assert!(registry.get(second).is_none());
        assert!(registry.get(third).is_some());
    }

    #[test]
    fn test_anonymous_sessions_stay_bounded() {
        let registry = SessionRegistry::with_capacity(8);
        for _ in 0..50 {
            registry.open(None);
        }
        assert_eq!(registry.len(), registry.capacity());
    }
}
