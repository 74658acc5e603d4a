//! Process-wide session registry
//!
//! Keyed by session id. Entries are created on connect and removed
//! eagerly on cleanup; session lifetime is tied to the connection, so
//! there is no background sweep.

use std::sync::Arc;

use dashmap::DashMap;

use voice_bridge_agent::SessionBridge;

use crate::ServerError;

/// Registry of live session bridges
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionBridge>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
        }
    }

    /// Register a bridge under its session id
    pub fn insert(&self, bridge: Arc<SessionBridge>) -> Result<(), ServerError> {
        let active = self.sessions.len();
        if active >= self.max_sessions {
            return Err(ServerError::Capacity(active));
        }

        self.sessions
            .insert(bridge.session_id().to_string(), bridge);
        metrics::gauge!("voice_bridge_active_sessions").set(self.sessions.len() as f64);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionBridge>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session eagerly on cleanup
    pub fn remove(&self, id: &str) -> Option<Arc<SessionBridge>> {
        let removed = self.sessions.remove(id).map(|(_, bridge)| bridge);
        metrics::gauge!("voice_bridge_active_sessions").set(self.sessions.len() as f64);
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}
