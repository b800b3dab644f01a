//! In-memory table of client sessions, keyed by an opaque token.
//!
//! The table is bounded: opening a session past `max_entries` drops the
//! least recently used ones.

use dashmap::DashMap;
use std::time::Instant;
use uuid::Uuid;

use super::state::SessionState;
use crate::config::defaults;

struct StoredSession {
    state: SessionState,
    last_access: Instant,
}

pub struct SessionStore {
    entries: DashMap<String, StoredSession>,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Open a fresh anonymous session and return its token.
    pub fn open(&self) -> String {
        self.evict_stale(1);
        let token = Uuid::new_v4().to_string();
        self.entries.insert(
            token.clone(),
            StoredSession {
                state: SessionState::new(),
                last_access: Instant::now(),
            },
        );
        token
    }

    /// Run `f` against the session's state. `None` when the token is unknown.
    pub fn with_session<F, R>(&self, token: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        self.entries.get_mut(token).map(|mut entry| {
            entry.last_access = Instant::now();
            f(&mut entry.state)
        })
    }

    #[cfg(test)]
    pub fn get(&self, token: &str) -> Option<SessionState> {
        self.entries.get(token).map(|e| e.state.clone())
    }

    pub fn close(&self, token: &str) -> bool {
        self.entries.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop least recently used sessions until `incoming` more fit.
    fn evict_stale(&self, incoming: usize) {
        let limit = self.max_entries.saturating_sub(incoming);
        if self.entries.len() <= limit {
            return;
        }
        let mut entries: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.last_access))
            .collect();
        entries.sort_by_key(|&(_, t)| t);
        let to_evict = entries.len().saturating_sub(limit);
        for (token, _) in entries.into_iter().take(to_evict) {
            self.entries.remove(&token);
        }
        log::debug!("[SESSION] Evicted {} idle sessions", to_evict);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(defaults::MAX_SESSIONS)
    }
}
