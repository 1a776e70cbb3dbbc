use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use autostream_core::SessionRecord;

/// Registry counters surfaced by `GET /api/stats` and `/health`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreStats {
    pub total_sessions: usize,
    pub max_sessions: usize,
    pub oldest_session: Option<String>,
}

struct Entry {
    record: SessionRecord,
    last_access: Instant,
    touched: u64,
}

struct Inner {
    sessions: HashMap<String, Entry>,
    /// Recency queue with lazy deletion: every touch pushes a `(tick, id)`
    /// pair; a pair is live only while it matches the entry's latest tick.
    /// Front-to-back order is least- to most-recently used.
    recency: VecDeque<(u64, String)>,
    tick: u64,
}

/// Bounded LRU session store with idle expiry and a message-history cap.
///
/// Amortized O(1) get/update/evict: touches append to the recency queue and
/// eviction pops stale pairs until it finds a live one; the queue is
/// compacted once it outgrows the live set.
pub struct SessionStore {
    inner: Mutex<Inner>,
    max_sessions: usize,
    session_timeout: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize, session_timeout: Duration, max_turns: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                recency: VecDeque::new(),
                tick: 0,
            }),
            max_sessions: max_sessions.max(1),
            session_timeout,
            max_turns: max_turns.max(1),
        }
    }

    /// Return the stored record, or atomically insert and return a fresh
    /// default one. An idle record past the timeout is treated as absent:
    /// deleted first, then recreated. Insertion at capacity evicts the
    /// least-recently-used record unconditionally.
    pub fn get_or_create(&self, session_id: &str) -> SessionRecord {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        if let Some(entry) = inner.sessions.get(session_id) {
            if now.duration_since(entry.last_access) <= self.session_timeout {
                return touch_and_clone(&mut inner, session_id, now);
            }
            debug!(event_name = "memory.session.expired", session_id, "expired session discarded");
            inner.sessions.remove(session_id);
        }

        if inner.sessions.len() >= self.max_sessions {
            evict_lru(&mut inner);
        }

        let record = SessionRecord::new(session_id);
        let tick = next_tick(&mut inner);
        inner.sessions.insert(
            session_id.to_string(),
            Entry { record: record.clone(), last_access: now, touched: tick },
        );
        inner.recency.push_back((tick, session_id.to_string()));
        compact_if_needed(&mut inner);
        record
    }

    /// Lookup-only read: `None` for unknown or expired ids. Refreshes
    /// recency on a hit.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        let entry = inner.sessions.get(session_id)?;
        if now.duration_since(entry.last_access) > self.session_timeout {
            inner.sessions.remove(session_id);
            return None;
        }

        Some(touch_and_clone(&mut inner, session_id, now))
    }

    /// Persist the turn's outcome: replace the stored record, refresh
    /// last-access, mark most-recently-used, and truncate the message history
    /// to the most recent `2 × max_turns` entries. An unknown id degenerates
    /// to an insert, never an error.
    pub fn update(&self, session_id: &str, mut record: SessionRecord) {
        let keep = self.max_turns * 2;
        if record.messages.len() > keep {
            record.messages.drain(..record.messages.len() - keep);
        }

        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        let tick = next_tick(&mut inner);

        match inner.sessions.get_mut(session_id) {
            Some(entry) => {
                entry.record = record;
                entry.last_access = now;
                entry.touched = tick;
            }
            None => {
                if inner.sessions.len() >= self.max_sessions {
                    evict_lru(&mut inner);
                }
                inner.sessions.insert(
                    session_id.to_string(),
                    Entry { record, last_access: now, touched: tick },
                );
            }
        }
        inner.recency.push_back((tick, session_id.to_string()));
        compact_if_needed(&mut inner);
    }

    /// Idempotent removal.
    pub fn delete(&self, session_id: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.sessions.remove(session_id);
    }

    pub fn stats(&self) -> StoreStats {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let oldest_session = peek_oldest(&mut inner);
        StoreStats {
            total_sessions: inner.sessions.len(),
            max_sessions: self.max_sessions,
            oldest_session,
        }
    }
}

fn next_tick(inner: &mut Inner) -> u64 {
    inner.tick += 1;
    inner.tick
}

fn touch_and_clone(inner: &mut Inner, session_id: &str, now: Instant) -> SessionRecord {
    let tick = next_tick(inner);
    let record = match inner.sessions.get_mut(session_id) {
        Some(entry) => {
            entry.last_access = now;
            entry.touched = tick;
            entry.record.clone()
        }
        // Callers check presence first; an id that vanished anyway
        // degenerates to a fresh record rather than a panic.
        None => SessionRecord::new(session_id),
    };
    inner.recency.push_back((tick, session_id.to_string()));
    compact_if_needed(inner);
    record
}

fn evict_lru(inner: &mut Inner) {
    while let Some((tick, session_id)) = inner.recency.pop_front() {
        let live = inner
            .sessions
            .get(&session_id)
            .is_some_and(|entry| entry.touched == tick);
        if live {
            inner.sessions.remove(&session_id);
            debug!(
                event_name = "memory.session.evicted",
                session_id, "capacity reached, least-recently-used session evicted"
            );
            return;
        }
    }
}

fn peek_oldest(inner: &mut Inner) -> Option<String> {
    loop {
        let (tick, session_id) = inner.recency.front()?.clone();
        let live = inner
            .sessions
            .get(&session_id)
            .is_some_and(|entry| entry.touched == tick);
        if live {
            return Some(session_id);
        }
        inner.recency.pop_front();
    }
}

fn compact_if_needed(inner: &mut Inner) {
    if inner.recency.len() <= inner.sessions.len() * 2 + 8 {
        return;
    }
    let sessions = &inner.sessions;
    inner
        .recency
        .retain(|(tick, id)| sessions.get(id).is_some_and(|entry| entry.touched == *tick));
}
