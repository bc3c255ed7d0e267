//! In-process session memory.
//!
//! A [`SessionStore`] maps session keys to bounded conversation histories.
//! The map itself sits behind a short-lived `parking_lot` lock; each session
//! has its own async mutex so an exchange can hold it across the generator
//! call without blocking other keys.
//!
//! Recency is tracked with a store-order stamp: a fresh stamp on creation and
//! on every committed exchange. Reads never refresh it.
//!
//! An entry whose handle is held outside the map is busy and is never
//! evicted, so two exchanges on one key always share one lock.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Persona,
}

/// One utterance in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn persona(text: impl Into<String>) -> Self {
        Self {
            role: Role::Persona,
            text: text.into(),
        }
    }
}

/// Ordered turns for one session key.
///
/// Turns come in user/persona pairs; the length is even between exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Complete user/persona pairs held.
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }

    /// Drop the oldest turns until at most `max_turns` remain.
    /// Returns how many were dropped.
    pub fn retain_latest(&mut self, max_turns: usize) -> usize {
        let excess = self.turns.len().saturating_sub(max_turns);
        if excess > 0 {
            self.turns.drain(..excess);
        }
        excess
    }

    /// Forget everything. Returns how many turns were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.turns.len();
        self.turns.clear();
        dropped
    }

    /// The last `max_turns` turns, oldest first.
    pub fn recent(&self, max_turns: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(max_turns);
        &self.turns[start..]
    }

    /// Append a user turn and the persona's reply as one unit.
    pub fn push_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::persona(reply));
        self.updated_at = Utc::now();
    }
}

/// Shared handle to one session. Lock it for the duration of an exchange.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

#[derive(Debug)]
struct Entry {
    session: SessionHandle,
    stamp: u64,
}

impl Entry {
    /// Held outside the map: an exchange is running or queued on it.
    /// Handles only leave the map under its lock, so this cannot flip from
    /// idle to busy while the lock is held.
    fn is_busy(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, Entry>,
    next_stamp: u64,
}

impl StoreInner {
    fn stamp(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }
}

/// Process-lifetime map from session key to [`Session`].
///
/// Cloning is cheap and every clone sees the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `key`, creating an empty session if the key is unseen.
    pub fn get_or_create(&self, key: &str) -> SessionHandle {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get(key) {
            return Arc::clone(&entry.session);
        }
        let stamp = inner.stamp();
        let session: SessionHandle = Arc::new(tokio::sync::Mutex::new(Session::new(key)));
        inner.entries.insert(
            key.to_string(),
            Entry {
                session: Arc::clone(&session),
                stamp,
            },
        );
        log::debug!("Created session '{}'", key);
        session
    }

    /// Handle for `key` if it exists. Does not create or refresh anything.
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Record that `session` under `key` was just updated.
    ///
    /// Gives the entry a fresh stamp. Busy entries are never evicted, so the
    /// handle normally still backs `key`; a vacant key gets it put back.
    pub fn mark_updated(&self, key: &str, session: &SessionHandle) {
        let mut inner = self.inner.lock();
        let stamp = inner.stamp();
        match inner.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if Arc::ptr_eq(&occupied.get().session, session) {
                    occupied.get_mut().stamp = stamp;
                } else {
                    log::warn!("Session '{}' was replaced mid-exchange; keeping the live entry", key);
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    session: Arc::clone(session),
                    stamp,
                });
            }
        }
    }

    /// Forget one session. Waits for an exchange in flight to commit, wipes
    /// the turns, then drops the entry unless another caller is queued on
    /// it. Returns whether the key existed.
    pub async fn forget(&self, key: &str) -> bool {
        let Some(handle) = self.get(key) else {
            return false;
        };
        let dropped = handle.lock().await.clear();

        let mut inner = self.inner.lock();
        // Two owners left: the map and `handle`.
        let idle = inner.entries.get(key).map_or(false, |entry| {
            Arc::ptr_eq(&entry.session, &handle) && Arc::strong_count(&entry.session) == 2
        });
        if idle {
            inner.entries.remove(key);
        }
        log::debug!("Forgot session '{}' ({} turns)", key, dropped);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Keys from newest to oldest by store order.
    #[cfg(test)]
    pub fn keys_by_recency(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keyed: Vec<(&String, u64)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (key, entry.stamp))
            .collect();
        keyed.sort_by(|a, b| b.1.cmp(&a.1));
        keyed.into_iter().map(|(key, _)| key.clone()).collect()
    }

    /// If more than `max_sessions` are held, keep only the `retain` newest by
    /// store order. Busy sessions are kept regardless. Returns how many
    /// sessions were evicted.
    pub fn trim(&self, max_sessions: usize, retain: usize) -> usize {
        let mut inner = self.inner.lock();
        if inner.entries.len() <= max_sessions || inner.entries.len() <= retain {
            return 0;
        }

        let mut stamps: Vec<u64> = inner.entries.values().map(|entry| entry.stamp).collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        // Stamps are unique, so the cutoff keeps exactly `retain` idle entries.
        let cutoff = match retain {
            0 => None,
            n => stamps.get(n - 1).copied(),
        };

        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| entry.is_busy() || cutoff.map_or(false, |c| entry.stamp >= c));
        before - inner.entries.len()
    }
}
