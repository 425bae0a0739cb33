//! Session registry: the process-wide map from session id to [`Session`].
//!
//! Lookups are lock-free reads on a `DashMap`. No map guard is ever held
//! across an await point; callers receive cloned `Arc`s.

use std::sync::Arc;

use bridgebot_types::error::SessionError;
use bridgebot_types::session::SessionSummary;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::chat::buffer::HistoryLimits;

use super::handle::Session;

/// Owns every live session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    limits: HistoryLimits,
}

impl SessionRegistry {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
        }
    }

    /// Register a fresh `initializing` session under `id`.
    ///
    /// Idempotent: an existing session is returned untouched. The flag is
    /// `true` only when this call created the session. A session that is
    /// still registered but already closing counts as absent and is
    /// replaced.
    pub fn create(&self, id: &str) -> (Arc<Session>, bool) {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(mut entry) if entry.get().is_closed() => {
                let session = Arc::new(Session::new(id, self.limits));
                entry.insert(session.clone());
                info!(session_id = id, "closing session replaced");
                (session, true)
            }
            Entry::Occupied(entry) => {
                debug!(session_id = id, "session already registered");
                (entry.get().clone(), false)
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(Session::new(id, self.limits));
                entry.insert(session.clone());
                info!(session_id = id, "session registered");
                (session, true)
            }
        }
    }

    /// Like [`create`](Self::create) but rejects an id already in use.
    pub fn create_strict(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        match self.create(id) {
            (session, true) => Ok(session),
            (_, false) => Err(SessionError::AlreadyExists(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Summaries of all sessions, oldest first.
    pub async fn list_all(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|e| e.value().clone()).collect();
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            summaries.push(session.summary().await);
        }
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        summaries
    }

    /// Close the session, then drop it from the map.
    ///
    /// Returns `false` if no session was registered under `id`. Closing
    /// happens first so a concurrent `get` never sees a removed but still
    /// open session. A replacement registered while closing is kept.
    pub async fn remove(&self, id: &str) -> bool {
        let Some(session) = self.sessions.get(id).map(|e| e.value().clone()) else {
            return false;
        };
        session.close().await;
        if self
            .sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, &session))
            .is_some()
        {
            info!(session_id = id, "session removed");
        } else {
            debug!(session_id = id, "session replaced while closing");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgebot_types::session::SessionStatus;

    #[test]
    fn test_create_is_idempotent() {
        let registry = SessionRegistry::default();

        let (first, created) = registry.create("shop-1");
        assert!(created);
        let (second, created) = registry.create("shop-1");
        assert!(!created);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_strict_rejects_duplicate() {
        let registry = SessionRegistry::default();
        registry.create_strict("shop-1").unwrap();

        let err = registry.create_strict("shop-1").unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(id) if id == "shop-1"));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = SessionRegistry::default();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_new_session_is_initializing() {
        let registry = SessionRegistry::default();
        let (session, _) = registry.create("shop-1");
        assert_eq!(session.status().await.0, SessionStatus::Initializing);
    }

    #[tokio::test]
    async fn test_remove_closes_before_dropping() {
        let registry = SessionRegistry::default();
        let (session, _) = registry.create("shop-1");

        assert!(registry.remove("shop-1").await);

        assert!(session.is_closed());
        assert_eq!(session.status().await.0, SessionStatus::Closed);
        assert!(registry.get("shop-1").is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_false() {
        let registry = SessionRegistry::default();
        assert!(!registry.remove("missing").await);
    }

    #[tokio::test]
    async fn test_id_is_reusable_after_remove() {
        let registry = SessionRegistry::default();
        let (old, _) = registry.create("shop-1");
        registry.remove("shop-1").await;

        let (new, created) = registry.create("shop-1");
        assert!(created);
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(!new.is_closed());
    }

    #[tokio::test]
    async fn test_create_replaces_closing_session() {
        let registry = SessionRegistry::default();
        let (old, _) = registry.create("shop-1");
        // Closed but not yet dropped from the map, as during a remove.
        old.close().await;

        let (new, created) = registry.create("shop-1");
        assert!(created);
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(!new.is_closed());
        assert!(Arc::ptr_eq(&registry.get("shop-1").unwrap(), &new));
    }

    #[tokio::test]
    async fn test_remove_keeps_replacement_registered_while_closing() {
        let registry = SessionRegistry::default();
        let (old, _) = registry.create("shop-1");
        old.close().await;
        let (new, _) = registry.create("shop-1");

        // Removing now targets the replacement, not the stale session.
        assert!(registry.remove("shop-1").await);
        assert!(new.is_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_is_ordered_by_creation() {
        let registry = SessionRegistry::default();
        for id in ["a", "b", "c"] {
            registry.create(id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let ids: Vec<String> = registry
            .list_all()
            .await
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
