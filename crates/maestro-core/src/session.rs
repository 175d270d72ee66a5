//! Session management for isolated workflow sessions
//!
//! Each session is an independent [`Orchestrator`] with its own task table,
//! workflow state and journal. Sessions share nothing except the read-only
//! role registry. A single session is still driven one operation at a time:
//! its orchestrator sits behind a mutex.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{MaestroError, Result};
use crate::journal::SessionId;
use crate::orchestrator::{Orchestrator, SessionArchive};
use crate::role::RoleRegistry;

/// Slot holding a session's orchestrator until the session ends
type SessionSlot = Arc<Mutex<Option<Orchestrator>>>;

/// Owner of all live workflow sessions
#[derive(Debug)]
pub struct SessionManager {
    registry: Arc<RoleRegistry>,
    default_config: SessionConfig,
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
}

impl SessionManager {
    pub fn new(registry: RoleRegistry, default_config: SessionConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            default_config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new session, with the default config unless one is given
    pub fn create_session(&self, config: Option<SessionConfig>) -> SessionId {
        let config = config.unwrap_or_else(|| self.default_config.clone());
        let session_id = Uuid::new_v4();
        let orchestrator =
            Orchestrator::with_session_id(session_id, Arc::clone(&self.registry), config);

        self.sessions
            .write()
            .insert(session_id, Arc::new(Mutex::new(Some(orchestrator))));

        tracing::info!("Session created: {}", session_id);
        session_id
    }

    /// Run `f` against one session's orchestrator
    ///
    /// Fails with [`MaestroError::SessionNotFound`] if the session is unknown
    /// or was ended while this call waited for it.
    pub fn with_session<F, R>(&self, id: SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Orchestrator) -> R,
    {
        let slot = self.slot(id)?;
        let mut guard = slot.lock();
        let orchestrator = guard.as_mut().ok_or(MaestroError::SessionNotFound(id))?;
        Ok(f(orchestrator))
    }

    /// End a session and return its archive
    ///
    /// Waits for any in-flight `with_session` call on the same session to
    /// finish, so its changes are part of the archive.
    pub fn end_session(&self, id: SessionId) -> Result<SessionArchive> {
        let slot = self
            .sessions
            .write()
            .remove(&id)
            .ok_or(MaestroError::SessionNotFound(id))?;

        let orchestrator = slot
            .lock()
            .take()
            .ok_or(MaestroError::SessionNotFound(id))?;

        tracing::info!("Session ended: {}", id);
        Ok(orchestrator.close())
    }

    fn slot(&self, id: SessionId) -> Result<SessionSlot> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(MaestroError::SessionNotFound(id))
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::HandoffReport;
    use crate::role::Role;
    use crate::task::TaskContext;
    use crate::types::{CompletionStatus, RoleId};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn manager() -> SessionManager {
        let tester = Role::builder("tester")
            .responsibility("Write tests")
            .build()
            .unwrap();
        SessionManager::new(
            RoleRegistry::from_roles([tester]).unwrap(),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_sessions_are_isolated() {
        let manager = manager();
        let a = manager.create_session(None);
        let b = manager.create_session(None);

        let task = manager
            .with_session(a, |m| m.delegate("tester", TaskContext::new()))
            .unwrap()
            .unwrap();

        // Same role is free in the other session
        let other = manager
            .with_session(b, |m| m.delegate("tester", TaskContext::new()))
            .unwrap();
        assert!(other.is_ok());

        manager
            .with_session(a, |m| {
                m.accept(
                    task,
                    HandoffReport::builder(task, CompletionStatus::Completed)
                        .key_fact("Only in session A")
                        .build(),
                )
            })
            .unwrap()
            .unwrap();

        let facts_b = manager.with_session(b, |m| m.snapshot().facts.len()).unwrap();
        assert_eq!(facts_b, 0);
        assert_eq!(manager.session_count(), 2);
    }

    #[test]
    fn test_end_session() {
        let manager = manager();
        let id = manager.create_session(None);
        manager
            .with_session(id, |m| m.delegate("tester", TaskContext::new()))
            .unwrap()
            .unwrap();

        let archive = manager.end_session(id).unwrap();
        assert_eq!(archive.session_id, id);
        assert_eq!(archive.tasks.len(), 1);

        assert!(matches!(
            manager.with_session(id, |_| ()),
            Err(MaestroError::SessionNotFound(_))
        ));
        assert!(manager.end_session(id).is_err());
    }

    #[test]
    fn test_end_session_waits_for_active_call() {
        let manager = manager();
        let id = manager.create_session(None);
        let (entered_tx, entered_rx) = mpsc::channel();

        let archive = thread::scope(|scope| {
            let shared = &manager;
            scope.spawn(move || {
                shared
                    .with_session(id, |m| {
                        entered_tx.send(()).unwrap();
                        thread::sleep(Duration::from_millis(50));
                        m.delegate("tester", TaskContext::new())
                    })
                    .unwrap()
                    .unwrap();
            });

            entered_rx.recv().unwrap();
            manager.end_session(id).unwrap()
        });

        // The task delegated while end_session waited is in the archive
        assert_eq!(archive.tasks.len(), 1);
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn test_late_holder_sees_ended_session() {
        let manager = manager();
        let id = manager.create_session(None);

        // A caller that fetched the slot before the session ended
        let slot = manager.slot(id).unwrap();
        manager.end_session(id).unwrap();

        assert!(slot.lock().is_none());
        assert!(matches!(
            manager.with_session(id, |_| ()),
            Err(MaestroError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_registry_is_shared() {
        let manager = manager();
        let id = manager.create_session(None);
        let known = manager
            .with_session(id, |m| m.registry().contains(&RoleId::new("tester")))
            .unwrap();
        assert!(known);
    }
}
