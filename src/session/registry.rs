//! Session registry
//!
//! Maps logical connection names to running sessions. There is no global
//! "current session": callers pass a name, or hold the `Arc<Session>`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::Session;
use crate::config::Config;
use crate::error::{Error, Result};

/// Summary of a registered session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub name: String,
    pub id: String,
    pub pid: Option<u32>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub is_alive: bool,
}

/// All sessions, keyed by name
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live session called `name`, starting one if needed
    pub async fn start(&self, name: &str, config: Config) -> Result<Arc<Session>> {
        self.start_with(name, move || Session::start(name, config))
            .await
    }

    /// Like [`start`](Self::start), with the process launched by `launch`
    ///
    /// The registry stays locked from the liveness check until the new
    /// session is registered, so concurrent callers share one process.
    pub async fn start_with<F, Fut>(&self, name: &str, launch: F) -> Result<Arc<Session>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Session>>,
    {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(name).cloned() {
            if existing.is_running().await {
                debug!("Reusing running session '{}'", name);
                return Ok(existing);
            }
        }

        let session = Arc::new(launch().await?);
        let previous = sessions.insert(name.to_string(), Arc::clone(&session));
        drop(sessions);

        if let Some(previous) = previous {
            if let Err(e) = previous.terminate().await {
                debug!("Exited session '{}' did not stop cleanly: {}", previous.name(), e);
            }
        }
        Ok(session)
    }

    /// Register a session, replacing any previous one of the same name
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let previous = self
            .sessions
            .write()
            .await
            .insert(session.name().to_string(), Arc::clone(&session));

        if let Some(previous) = previous {
            if let Err(e) = previous.terminate().await {
                warn!("Failed to stop replaced session '{}': {}", previous.name(), e);
            }
        }
        session
    }

    /// Live session called `name`
    pub async fn get(&self, name: &str) -> Result<Arc<Session>> {
        let session = self.sessions.read().await.get(name).cloned();
        match session {
            Some(session) if session.is_running().await => Ok(session),
            _ => Err(Error::ProcessNotRunning {
                session: name.to_string(),
            }),
        }
    }

    /// Stop and forget the session called `name`
    pub async fn terminate(&self, name: &str) -> Result<()> {
        let session = self.sessions.write().await.remove(name);
        match session {
            Some(session) => session.terminate().await,
            None => Err(Error::ProcessNotRunning {
                session: name.to_string(),
            }),
        }
    }

    pub async fn info(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        let mut info = Vec::with_capacity(sessions.len());
        for session in sessions {
            info.push(SessionInfo {
                name: session.name().to_string(),
                id: session.id().to_string(),
                pid: session.pid(),
                started_at: session.started_at(),
                is_alive: session.is_running().await,
            });
        }
        info.sort_by(|a, b| a.name.cmp(&b.name));
        info
    }

    pub async fn active_count(&self) -> usize {
        self.info().await.iter().filter(|info| info.is_alive).count()
    }

    /// Drop sessions whose process has exited; returns how many went
    pub async fn cleanup_exited(&self) -> usize {
        let sessions: Vec<(String, Arc<Session>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(name, session)| (name.clone(), Arc::clone(session)))
            .collect();

        let mut dead = Vec::new();
        for (name, session) in sessions {
            if !session.is_running().await {
                dead.push(name);
            }
        }

        let mut map = self.sessions.write().await;
        for name in &dead {
            map.remove(name);
            debug!("Removed exited session '{}'", name);
        }
        dead.len()
    }
}
