//! # Sessions
//!
//! In-memory key/value store scoped to one browsing session, keyed by the
//! session id the client carries in the `X-Session-Id` header.
//!
//! Holds the per-session view markers (`naskah_viewed_<id>`) and the admin
//! login flag. Entries expire after a configurable idle TTL; a background
//! task sweeps expired sessions so the map stays bounded. Nothing here is
//! persisted: a restart forgets every session, which only means a client may
//! count one extra view per open manuscript.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::time::interval;
use tracing::debug;

pub struct Sessions {
    ttl: Duration,
    inner: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    values: HashMap<String, String>,
    expires_at: Instant,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, session_id: &str, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(session_id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                entry.expires_at = Instant::now() + self.ttl;
                entry.values.get(key).cloned()
            }
            Some(_) => {
                inner.remove(session_id);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, session_id: &str, key: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .entry(session_id.to_string())
            .or_insert_with(|| Entry {
                values: HashMap::new(),
                expires_at: Instant::now(),
            });

        // An expired session that was not swept yet starts over empty.
        if entry.expires_at <= Instant::now() {
            entry.values.clear();
        }

        entry.expires_at = Instant::now() + self.ttl;
        entry.values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, session_id: &str, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.get_mut(session_id) {
            entry.values.remove(key);
        }
    }

    pub fn keys(&self, session_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        match inner.get(session_id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                entry.values.keys().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn end_session(&self, session_id: &str) {
        self.inner.lock().unwrap().remove(session_id);
    }

    /// Drops every expired session, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.len();
        let now = Instant::now();
        inner.retain(|_, entry| entry.expires_at > now);
        before - inner.len()
    }
}

pub fn spawn_sweeper(sessions: Arc<Sessions>, every: Duration) {
    tokio::spawn(async move {
        let mut tick = interval(every);
        loop {
            tick.tick().await;
            let dropped = sessions.sweep();
            if dropped > 0 {
                debug!("Dropped {dropped} expired sessions");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn sessions() -> Sessions {
        Sessions::new(Duration::from_secs(60))
    }

    #[test]
    fn set_get_remove() {
        let store = sessions();
        assert_eq!(store.get("s1", "k"), None);

        store.set("s1", "k", "v");
        assert_eq!(store.get("s1", "k"), Some("v".to_string()));
        assert_eq!(store.get("s2", "k"), None);

        store.remove("s1", "k");
        assert_eq!(store.get("s1", "k"), None);
    }

    #[test]
    fn keys_lists_live_session_only() {
        let store = sessions();
        store.set("s1", "a", "1");
        store.set("s1", "b", "2");

        let mut keys = store.keys("s1");
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert!(store.keys("missing").is_empty());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let store = Sessions::new(Duration::from_millis(5));
        store.set("s1", "k", "v");
        sleep(Duration::from_millis(20));

        assert_eq!(store.get("s1", "k"), None);
        assert!(store.keys("s1").is_empty());
    }

    #[test]
    fn sweep_drops_only_expired() {
        let store = Sessions::new(Duration::from_millis(5));
        store.set("old", "k", "v");
        sleep(Duration::from_millis(20));

        store.set("fresh", "k", "v");
        // "fresh" was set after "old" expired; only "old" should go.
        let mut inner = store.inner.lock().unwrap();
        inner.get_mut("fresh").unwrap().expires_at = Instant::now() + Duration::from_secs(60);
        drop(inner);

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.get("fresh", "k"), Some("v".to_string()));
    }
}
