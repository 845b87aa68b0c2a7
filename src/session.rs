//! Ephemeral per-user session state
//!
//! One session per user at a time, created when metadata resolves and deleted
//! when a download finishes (or fails, or the callback turns out to be stale).
//! Nothing survives a restart by design.

use dashmap::DashMap;
use url::Url;

use crate::core::platform::Platform;
use crate::format::{AudioFormat, VideoFormat};

/// In-flight download request for one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub url: Url,
    pub title: String,
    /// Uploader/channel name, reused as the audio performer on delivery
    pub uploader: String,
    pub platform: Platform,
    /// Negotiated video ladder; empty for platforms without a quality menu
    pub video_formats: Vec<VideoFormat>,
    /// Negotiated audio ladder; 3 entries or empty
    pub audio_formats: Vec<AudioFormat>,
}

/// Concurrency-safe keyed store of live sessions.
///
/// DashMap's shard locks serialize operations on the same key; operations on
/// different users never contend. There is no TTL: staleness is detected by
/// callers through `get` returning `None` and surfaced as a session-expired
/// error.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: DashMap<i64, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the session for a user. A new URL mid-conversation
    /// replaces the old session wholesale, never merges.
    pub fn put(&self, session: Session) {
        self.inner.insert(session.user_id, session);
    }

    pub fn get(&self, user_id: i64) -> Option<Session> {
        self.inner.get(&user_id).map(|entry| entry.clone())
    }

    /// Atomically removes and returns the session. Format selections claim
    /// the session through this, so two presses on the same keyboard cannot
    /// both start a download: the second finds nothing and is answered as
    /// expired.
    pub fn take(&self, user_id: i64) -> Option<Session> {
        self.inner.remove(&user_id).map(|(_, session)| session)
    }

    pub fn delete(&self, user_id: i64) {
        self.inner.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: i64, title: &str) -> Session {
        Session {
            user_id,
            url: Url::parse("https://youtu.be/abc").unwrap(),
            title: title.to_string(),
            uploader: "channel".to_string(),
            platform: Platform::YouTube,
            video_formats: Vec::new(),
            audio_formats: Vec::new(),
        }
    }

    #[test]
    fn put_get_delete_roundtrip() {
        let store = SessionStore::new();
        assert!(store.get(1).is_none());

        store.put(session(1, "first"));
        assert_eq!(store.get(1).unwrap().title, "first");
        assert_eq!(store.len(), 1);

        store.delete(1);
        assert!(store.get(1).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces_existing_session() {
        let store = SessionStore::new();
        store.put(session(7, "old"));
        store.put(session(7, "new"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7).unwrap().title, "new");
    }

    #[test]
    fn take_yields_the_session_exactly_once() {
        let store = SessionStore::new();
        store.put(session(3, "claimed"));

        assert_eq!(store.take(3).unwrap().title, "claimed");
        assert!(store.take(3).is_none());
        assert!(store.get(3).is_none());
    }

    #[test]
    fn users_do_not_interfere() {
        let store = SessionStore::new();
        store.put(session(1, "one"));
        store.put(session(2, "two"));

        store.delete(1);
        assert!(store.get(1).is_none());
        assert_eq!(store.get(2).unwrap().title, "two");
    }

    #[test]
    fn delete_of_absent_user_is_a_no_op() {
        let store = SessionStore::new();
        store.delete(99);
        assert!(store.is_empty());
    }
}
