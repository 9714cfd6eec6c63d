//! Authoritative map from connection identity to session state.

use std::sync::Arc;

use dashmap::DashMap;

use super::session::Session;

/// Shared registry of all live sessions.
///
/// `DashMap` gives shard-level concurrency: reads never block other reads,
/// and a write only locks the shard its key hashes to.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn add(&self, session: Arc<Session>) {
        self.sessions.insert(session.client_id.clone(), session);
    }

    /// `None` means "target unreachable" — callers skip, they never fail.
    pub fn get(&self, client_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(client_id).map(|s| s.value().clone())
    }

    pub fn remove(&self, client_id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(client_id).map(|(_, s)| s)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of every live session.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_session(client_id: &str) -> Arc<Session> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Session::new(
            client_id.to_string(),
            "acme".to_string(),
            false,
            tx,
        ))
    }

    #[test]
    fn add_get_remove() {
        let registry = SessionRegistry::new();
        registry.add(make_session("cli_a"));

        assert!(registry.get("cli_a").is_some());
        assert_eq!(registry.count(), 1);

        let removed = registry.remove("cli_a").unwrap();
        assert_eq!(removed.client_id, "cli_a");
        assert!(registry.get("cli_a").is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn get_unknown_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.remove("missing").is_none());
    }

    #[test]
    fn all_returns_snapshot() {
        let registry = SessionRegistry::new();
        registry.add(make_session("cli_a"));
        registry.add(make_session("cli_b"));

        let mut ids: Vec<String> = registry.all().iter().map(|s| s.client_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, ["cli_a", "cli_b"]);
    }
}
