use log::debug;
use std::collections::{ HashMap, VecDeque };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::chat::ConversationTurn;

pub const DEFAULT_CAPACITY: usize = 6;

/// Key used for every request when state is shared by all clients.
pub const SHARED_SESSION_KEY: &str = "shared";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SessionScope {
    /// One conversation and one rate-limit slot for the whole process.
    #[default]
    Shared,
    /// State keyed by the client-supplied session id.
    Session,
}

impl SessionScope {
    pub fn key(self, session_id: &str) -> String {
        match self {
            SessionScope::Shared => SHARED_SESSION_KEY.to_string(),
            SessionScope::Session => session_id.to_string(),
        }
    }
}

/// Bounded FIFO of conversation turns. Oldest turns are evicted first.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Session buffers idle for longer than this are dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
/// Upper bound on live session buffers; the least recently used goes first.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct SessionEntry {
    buffer: Arc<Mutex<ConversationBuffer>>,
    last_used: Instant,
}

/// In-memory conversations, one locked buffer per session key.
///
/// Callers hold the returned buffer's lock for the whole text path, which
/// serializes requests that share a key. Idle sessions expire and the map
/// never holds more than `max_sessions` entries.
#[derive(Debug)]
pub struct ConversationStore {
    scope: SessionScope,
    capacity: usize,
    max_sessions: usize,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl ConversationStore {
    pub fn new(scope: SessionScope, capacity: usize) -> Self {
        Self::with_limits(scope, capacity, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE)
    }

    pub fn with_limits(
        scope: SessionScope,
        capacity: usize,
        max_sessions: usize,
        idle_ttl: Duration
    ) -> Self {
        Self {
            scope,
            capacity,
            max_sessions: max_sessions.max(1),
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    pub async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationBuffer>> {
        let key = self.scope.key(session_id);
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let idle_ttl = self.idle_ttl;
        sessions.retain(|key, entry| {
            let live = now.duration_since(entry.last_used) <= idle_ttl;
            if !live {
                debug!("Expiring idle conversation '{}'", key);
            }
            live
        });

        if !sessions.contains_key(&key) {
            while sessions.len() >= self.max_sessions {
                let Some(oldest) = sessions
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(key, _)| key.clone()) else {
                    break;
                };
                debug!("Evicting least recently used conversation '{}'", oldest);
                sessions.remove(&oldest);
            }
        }

        let capacity = self.capacity;
        let entry = sessions.entry(key).or_insert_with_key(|key| {
            debug!("Opening conversation buffer for session '{}'", key);
            SessionEntry {
                buffer: Arc::new(Mutex::new(ConversationBuffer::new(capacity))),
                last_used: now,
            }
        });
        entry.last_used = now;
        Arc::clone(&entry.buffer)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
