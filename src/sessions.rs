//! Session storage with per-session locking.
//!
//! Turns on the same session run one at a time: [`SessionStore::checkout`]
//! hands out an owned guard on that session's async mutex, held for the
//! whole turn. Different sessions proceed in parallel. Sessions live for the
//! life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use support_harness_core::session::Session;

pub type SessionGuard = OwnedMutexGuard<Session>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Lock the session `id`, creating it on first use.
    async fn checkout(&self, id: &str) -> SessionGuard;
    /// Copy of the session's current state, if it exists.
    async fn snapshot(&self, id: &str) -> Option<Session>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<Session>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &str) -> Arc<AsyncMutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(id))))
            .clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn checkout(&self, id: &str) -> SessionGuard {
        self.slot(id).lock_owned().await
    }

    async fn snapshot(&self, id: &str) -> Option<Session> {
        let slot = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(id).cloned()
        }?;
        let session = slot.lock().await;
        Some(session.clone())
    }

    fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
