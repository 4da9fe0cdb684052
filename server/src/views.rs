//! # View tracking
//!
//! Turns "user opened naskah X" events into a deduplicated popularity
//! counter, plus the read-side helpers built on it.
//!
//! Deduplication is per browsing session: the first view of a naskah in a
//! session increments `totalViews` in the store and drops a marker into the
//! session cache; later views of the same naskah in that session never reach
//! the store. Tracking is best-effort throughout. A store failure is logged
//! and the page is served anyway, and a read failure displays as zero views
//! rather than an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pusaka_catalog::Manuscript;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tracing::warn;

use crate::{database, session::Sessions};

/// Session-cache key prefix for "already counted this session" markers.
pub const SESSION_KEY_PREFIX: &str = "naskah_viewed_";

#[derive(Error, Debug)]
pub enum ViewStoreError {
    #[error("naskah record not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] redis::RedisError),
}

/// Counter storage as the tracker sees it. `increment` must be atomic and
/// must report a missing record as [`ViewStoreError::NotFound`];
/// `initialize` is an unconditional field upsert.
#[allow(async_fn_in_trait)]
pub trait ViewStore {
    async fn increment(&self, id: &str, now: DateTime<Utc>) -> Result<u64, ViewStoreError>;
    async fn initialize(&self, id: &str, now: DateTime<Utc>) -> Result<(), ViewStoreError>;
    async fn fetch(&self, id: &str) -> Result<Option<u64>, ViewStoreError>;
}

#[derive(Clone)]
pub struct RedisViews {
    conn: ConnectionManager,
}

impl RedisViews {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl ViewStore for RedisViews {
    async fn increment(&self, id: &str, now: DateTime<Utc>) -> Result<u64, ViewStoreError> {
        let count = database::increment_views(&self.conn, id, now).await?;
        if count < 0 {
            return Err(ViewStoreError::NotFound);
        }
        Ok(count as u64)
    }

    async fn initialize(&self, id: &str, now: DateTime<Utc>) -> Result<(), ViewStoreError> {
        database::initialize_views(&self.conn, id, now)
            .await
            .map_err(Into::into)
    }

    async fn fetch(&self, id: &str) -> Result<Option<u64>, ViewStoreError> {
        database::fetch_views(&self.conn, id)
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Recorded,
    AlreadyViewed,
}

pub struct ViewTracker<S> {
    store: S,
    sessions: Arc<Sessions>,
}

fn session_key(manuscript_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{manuscript_id}")
}

impl<S: ViewStore> ViewTracker<S> {
    pub fn new(store: S, sessions: Arc<Sessions>) -> Self {
        Self { store, sessions }
    }

    /// Counts one view of `manuscript_id` for `session_id`, at most once per
    /// session. On any store failure the session marker stays unset, so the
    /// next page load in the same session retries.
    pub async fn record_view(
        &self,
        session_id: &str,
        manuscript_id: &str,
    ) -> Result<ViewOutcome, ViewStoreError> {
        let key = session_key(manuscript_id);
        if self.sessions.get(session_id, &key).is_some() {
            return Ok(ViewOutcome::AlreadyViewed);
        }

        let now = Utc::now();
        match self.store.increment(manuscript_id, now).await {
            Ok(_) => {}
            Err(ViewStoreError::NotFound) => {
                // The counter was never written for this record. This upsert
                // is not atomic: two sessions racing through the first view
                // can both set 1 and one view is lost, last write wins.
                self.store.initialize(manuscript_id, now).await?;
            }
            Err(err) => return Err(err),
        }

        self.sessions.set(session_id, &key, &now.to_rfc3339());
        Ok(ViewOutcome::Recorded)
    }

    /// Current counter value; missing records and store failures both read
    /// as zero so a count can always be rendered.
    pub async fn views(&self, manuscript_id: &str) -> u64 {
        match self.store.fetch(manuscript_id).await {
            Ok(views) => views.unwrap_or(0),
            Err(err) => {
                warn!("Failed to fetch views for naskah {manuscript_id}: {err}");
                0
            }
        }
    }

    pub fn has_viewed_in_session(&self, session_id: &str, manuscript_id: &str) -> bool {
        self.sessions
            .get(session_id, &session_key(manuscript_id))
            .is_some()
    }

    /// Clears one view marker, or all of them when no id is given. Other
    /// session keys are untouched.
    pub fn clear_view_session(&self, session_id: &str, manuscript_id: Option<&str>) {
        match manuscript_id {
            Some(id) => self.sessions.remove(session_id, &session_key(id)),
            None => {
                for key in self.sessions.keys(session_id) {
                    if key.starts_with(SESSION_KEY_PREFIX) {
                        self.sessions.remove(session_id, &key);
                    }
                }
            }
        }
    }
}

/// Compact display form of a view count: exact below 1000, then one-decimal
/// K/M/B with a trailing `.0` stripped. Absent counts render as "0".
pub fn format_views(views: Option<u64>) -> String {
    let views = views.unwrap_or(0);

    if views == 0 {
        return "0".to_string();
    }

    if views < 1_000 {
        views.to_string()
    } else if views < 1_000_000 {
        format!("{}K", short_scale(views, 1_000.0))
    } else if views < 1_000_000_000 {
        format!("{}M", short_scale(views, 1_000_000.0))
    } else {
        format!("{}B", short_scale(views, 1_000_000_000.0))
    }
}

fn short_scale(views: u64, unit: f64) -> String {
    let scaled = format!("{:.1}", views as f64 / unit);
    match scaled.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => scaled,
    }
}

/// The `limit` most-viewed manuscripts, most viewed first. Records without a
/// counter rank as zero. The sort is stable, so equal counts keep their
/// input order, and the input itself is left as-is.
pub fn rank_popular(manuscripts: &[Manuscript], limit: usize) -> Vec<Manuscript> {
    let mut ranked: Vec<Manuscript> = manuscripts.to_vec();
    ranked.sort_by(|a, b| {
        b.total_views
            .unwrap_or(0)
            .cmp(&a.total_views.unwrap_or(0))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        sync::Mutex,
        time::Duration,
    };

    struct FakeStore {
        counters: Mutex<HashMap<String, u64>>,
        increment_calls: AtomicUsize,
        initialize_calls: AtomicUsize,
        counter_exists: bool,
        broken: bool,
    }

    impl FakeStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                counters: Mutex::new(HashMap::new()),
                increment_calls: AtomicUsize::new(0),
                initialize_calls: AtomicUsize::new(0),
                counter_exists: true,
                broken: false,
            })
        }

        fn without_counter() -> Arc<Self> {
            Arc::new(Self {
                counters: Mutex::new(HashMap::new()),
                increment_calls: AtomicUsize::new(0),
                initialize_calls: AtomicUsize::new(0),
                counter_exists: false,
                broken: false,
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                counters: Mutex::new(HashMap::new()),
                increment_calls: AtomicUsize::new(0),
                initialize_calls: AtomicUsize::new(0),
                counter_exists: true,
                broken: true,
            })
        }

        fn outage() -> ViewStoreError {
            ViewStoreError::Store(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            )))
        }
    }

    impl ViewStore for Arc<FakeStore> {
        async fn increment(&self, id: &str, _now: DateTime<Utc>) -> Result<u64, ViewStoreError> {
            self.increment_calls.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(FakeStore::outage());
            }
            if !self.counter_exists {
                return Err(ViewStoreError::NotFound);
            }
            let mut counters = self.counters.lock().unwrap();
            let count = counters.entry(id.to_string()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn initialize(&self, id: &str, _now: DateTime<Utc>) -> Result<(), ViewStoreError> {
            self.initialize_calls.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(FakeStore::outage());
            }
            self.counters.lock().unwrap().insert(id.to_string(), 1);
            Ok(())
        }

        async fn fetch(&self, id: &str) -> Result<Option<u64>, ViewStoreError> {
            if self.broken {
                return Err(FakeStore::outage());
            }
            Ok(self.counters.lock().unwrap().get(id).copied())
        }
    }

    fn tracker(store: Arc<FakeStore>) -> ViewTracker<Arc<FakeStore>> {
        ViewTracker::new(store, Arc::new(Sessions::new(Duration::from_secs(60))))
    }

    fn naskah(id: &str, views: Option<u64>) -> Manuscript {
        Manuscript {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            category: None,
            author: None,
            total_pages: 1,
            pdf_url: None,
            pages: Vec::new(),
            thumbnail: None,
            uploaded_at: None,
            total_views: views,
            last_viewed: None,
        }
    }

    #[tokio::test]
    async fn second_view_in_session_is_a_noop() {
        let store = FakeStore::new();
        let tracker = tracker(store.clone());

        assert!(!tracker.has_viewed_in_session("s1", "n1"));
        assert_eq!(
            tracker.record_view("s1", "n1").await.unwrap(),
            ViewOutcome::Recorded
        );
        assert!(tracker.has_viewed_in_session("s1", "n1"));

        assert_eq!(
            tracker.record_view("s1", "n1").await.unwrap(),
            ViewOutcome::AlreadyViewed
        );
        assert_eq!(store.increment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.views("n1").await, 1);
    }

    #[tokio::test]
    async fn distinct_sessions_each_count() {
        let store = FakeStore::new();
        let tracker = tracker(store.clone());

        tracker.record_view("s1", "n1").await.unwrap();
        tracker.record_view("s2", "n1").await.unwrap();

        assert_eq!(tracker.views("n1").await, 2);
    }

    #[tokio::test]
    async fn missing_counter_falls_back_to_initialize() {
        let store = FakeStore::without_counter();
        let tracker = tracker(store.clone());

        assert_eq!(
            tracker.record_view("s1", "n1").await.unwrap(),
            ViewOutcome::Recorded
        );
        assert_eq!(store.increment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.initialize_calls.load(Ordering::SeqCst), 1);
        assert!(tracker.has_viewed_in_session("s1", "n1"));
        assert_eq!(tracker.views("n1").await, 1);
    }

    #[tokio::test]
    async fn store_failure_leaves_marker_unset_for_retry() {
        let store = FakeStore::broken();
        let tracker = tracker(store.clone());

        assert!(tracker.record_view("s1", "n1").await.is_err());
        assert!(!tracker.has_viewed_in_session("s1", "n1"));

        // Next navigation reaches the store again.
        assert!(tracker.record_view("s1", "n1").await.is_err());
        assert_eq!(store.increment_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_failure_displays_as_zero() {
        let tracker = tracker(FakeStore::broken());
        assert_eq!(tracker.views("n1").await, 0);
    }

    #[tokio::test]
    async fn never_viewed_displays_as_zero() {
        let tracker = tracker(FakeStore::new());
        assert_eq!(tracker.views("never-viewed").await, 0);
    }

    #[tokio::test]
    async fn clear_resets_one_or_all_markers() {
        let store = FakeStore::new();
        let tracker = tracker(store.clone());

        tracker.record_view("s1", "n1").await.unwrap();
        tracker.record_view("s1", "n2").await.unwrap();

        tracker.clear_view_session("s1", Some("n1"));
        assert!(!tracker.has_viewed_in_session("s1", "n1"));
        assert!(tracker.has_viewed_in_session("s1", "n2"));

        tracker.clear_view_session("s1", None);
        assert!(!tracker.has_viewed_in_session("s1", "n2"));
    }

    #[tokio::test]
    async fn clear_all_leaves_unrelated_session_keys() {
        let store = FakeStore::new();
        let sessions = Arc::new(Sessions::new(Duration::from_secs(60)));
        let tracker = ViewTracker::new(store, sessions.clone());

        sessions.set("s1", "isLoggedIn", "true");
        tracker.record_view("s1", "n1").await.unwrap();

        tracker.clear_view_session("s1", None);

        assert!(!tracker.has_viewed_in_session("s1", "n1"));
        assert_eq!(sessions.get("s1", "isLoggedIn"), Some("true".to_string()));
    }

    #[test]
    fn format_views_buckets() {
        assert_eq!(format_views(None), "0");
        assert_eq!(format_views(Some(0)), "0");
        assert_eq!(format_views(Some(1)), "1");
        assert_eq!(format_views(Some(999)), "999");
        assert_eq!(format_views(Some(1_000)), "1K");
        assert_eq!(format_views(Some(1_500)), "1.5K");
        assert_eq!(format_views(Some(2_000)), "2K");
        assert_eq!(format_views(Some(999_999)), "1000K");
        assert_eq!(format_views(Some(1_000_000)), "1M");
        assert_eq!(format_views(Some(2_300_000)), "2.3M");
        assert_eq!(format_views(Some(999_999_999)), "1000M");
        assert_eq!(format_views(Some(1_000_000_000)), "1B");
        assert_eq!(format_views(Some(1_500_000_000)), "1.5B");
    }

    #[test]
    fn rank_popular_sorts_caps_and_preserves_input() {
        let input = vec![
            naskah("a", Some(5)),
            naskah("b", Some(20)),
            naskah("c", Some(1)),
        ];

        let top = rank_popular(&input, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "b");
        assert_eq!(top[1].id, "a");

        // Input order unchanged.
        assert_eq!(input[0].id, "a");
        assert_eq!(input[2].id, "c");
    }

    #[test]
    fn rank_popular_treats_missing_views_as_zero_and_keeps_tie_order() {
        let input = vec![
            naskah("a", None),
            naskah("b", Some(3)),
            naskah("c", Some(0)),
            naskah("d", Some(3)),
        ];

        let ranked = rank_popular(&input, 10);
        assert_eq!(ranked[0].id, "b");
        assert_eq!(ranked[1].id, "d");
        // "a" (no counter) and "c" (zero) tie at 0, input order kept.
        assert_eq!(ranked[2].id, "a");
        assert_eq!(ranked[3].id, "c");
    }
}
