//! Conversational memory shared across stateless HTTP requests.
//!
//! Each session owns a bounded, append-only list of turns behind its own
//! async mutex. Holding that mutex from history snapshot through recording
//! serialises turns within a session; distinct sessions never contend.
//! The registry itself is bounded: once `max_sessions` is reached, opening a
//! new session evicts the least recently used one.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// One prior exchange: the prompt sent to the generator and its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub input: String,
    pub response: String,
    pub recorded_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Ordered turns of one session, oldest evicted first once `max_turns` is reached.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl Conversation {
    /// `max_turns == 0` keeps every turn.
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    pub fn record(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        if self.max_turns > 0 {
            while self.turns.len() > self.max_turns {
                self.turns.pop_front();
            }
        }
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

struct Session {
    conversation: Arc<Mutex<Conversation>>,
    last_used: AtomicU64,
}

/// Registry of conversations keyed by session id.
#[derive(Clone)]
pub struct SessionMemory {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    clock: Arc<AtomicU64>,
    max_turns: usize,
    max_sessions: usize,
}

impl SessionMemory {
    /// `max_sessions == 0` never evicts a session.
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
            max_turns,
            max_sessions,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Trims the caller-supplied id, falling back to [`DEFAULT_SESSION`].
    pub fn normalize_id(session_id: Option<&str>) -> String {
        session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION)
            .to_string()
    }

    async fn conversation(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                session.last_used.store(self.tick(), Ordering::Relaxed);
                return session.conversation.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(session_id) {
            session.last_used.store(self.tick(), Ordering::Relaxed);
            return session.conversation.clone();
        }

        if self.max_sessions > 0 {
            while sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, session)| session.last_used.load(Ordering::Relaxed))
                    .map(|(id, _)| id.clone());
                let Some(oldest) = oldest else { break };
                sessions.remove(&oldest);
                tracing::debug!("Evicted idle session {}", oldest);
            }
        }

        let conversation = Arc::new(Mutex::new(Conversation::new(self.max_turns)));
        sessions.insert(
            session_id.to_string(),
            Session {
                conversation: conversation.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        conversation
    }

    fn existing(sessions: &HashMap<String, Session>, session_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        sessions
            .get(session_id)
            .map(|session| session.conversation.clone())
    }

    /// Exclusive access to a session's conversation until the guard drops.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<Conversation> {
        self.conversation(session_id).await.lock_owned().await
    }

    pub async fn record(&self, session_id: &str, turn: Turn) {
        self.lock(session_id).await.record(turn);
    }

    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        let conversation = Self::existing(&*self.sessions.read().await, session_id);
        match conversation {
            Some(conversation) => conversation.lock().await.turns(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self, session_id: &str) -> usize {
        let conversation = Self::existing(&*self.sessions.read().await, session_id);
        match conversation {
            Some(conversation) => conversation.lock().await.len(),
            None => 0,
        }
    }

    /// Forgets a session entirely. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_evicts_oldest_beyond_cap() {
        let mut conversation = Conversation::new(2);
        conversation.record(Turn::new("q1", "a1"));
        conversation.record(Turn::new("q2", "a2"));
        conversation.record(Turn::new("q3", "a3"));

        let inputs: Vec<String> = conversation.turns().into_iter().map(|t| t.input).collect();
        assert_eq!(inputs, vec!["q2", "q3"]);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let mut conversation = Conversation::new(0);
        for i in 0..50 {
            conversation.record(Turn::new(format!("q{i}"), "a"));
        }
        assert_eq!(conversation.len(), 50);
    }

    #[test]
    fn normalize_id_defaults_blank_ids() {
        assert_eq!(SessionMemory::normalize_id(None), DEFAULT_SESSION);
        assert_eq!(SessionMemory::normalize_id(Some("  ")), DEFAULT_SESSION);
        assert_eq!(SessionMemory::normalize_id(Some(" abc ")), "abc");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let memory = SessionMemory::new(10, 0);
        memory.record("alice", Turn::new("hi", "hello")).await;
        memory.record("bob", Turn::new("yo", "hey")).await;
        memory.record("alice", Turn::new("again", "sure")).await;

        assert_eq!(memory.len("alice").await, 2);
        assert_eq!(memory.history("bob").await[0].input, "yo");
        assert!(memory.history("carol").await.is_empty());
        assert_eq!(memory.session_count().await, 2);

        assert!(memory.clear("alice").await);
        assert!(!memory.clear("alice").await);
        assert_eq!(memory.len("alice").await, 0);
    }

    #[tokio::test]
    async fn least_recently_used_session_is_evicted_at_capacity() {
        let memory = SessionMemory::new(10, 2);
        memory.record("alice", Turn::new("hi", "hello")).await;
        memory.record("bob", Turn::new("yo", "hey")).await;
        memory.record("alice", Turn::new("again", "sure")).await;

        memory.record("carol", Turn::new("hey", "hi")).await;

        assert_eq!(memory.session_count().await, 2);
        assert_eq!(memory.len("alice").await, 2);
        assert_eq!(memory.len("bob").await, 0);
        assert_eq!(memory.len("carol").await, 1);
    }

    #[tokio::test]
    async fn many_distinct_ids_stay_within_session_cap() {
        let memory = SessionMemory::new(4, 8);
        for i in 0..100 {
            memory
                .record(&format!("client-{i}"), Turn::new("q", "a"))
                .await;
        }

        assert_eq!(memory.session_count().await, 8);
        assert_eq!(memory.len("client-99").await, 1);
        assert_eq!(memory.len("client-0").await, 0);
    }

    #[tokio::test]
    async fn zero_session_cap_keeps_every_session() {
        let memory = SessionMemory::new(4, 0);
        for i in 0..50 {
            memory.record(&format!("client-{i}"), Turn::new("q", "a")).await;
        }
        assert_eq!(memory.session_count().await, 50);
    }

    #[tokio::test]
    async fn concurrent_records_in_one_session_are_all_kept() {
        let memory = SessionMemory::new(0, 0);
        let mut handles = Vec::new();
        for i in 0..32 {
            let memory = memory.clone();
            handles.push(tokio::spawn(async move {
                memory
                    .record(DEFAULT_SESSION, Turn::new(format!("q{i}"), format!("a{i}")))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(memory.len(DEFAULT_SESSION).await, 32);
    }
}
