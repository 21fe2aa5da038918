//! In-memory registry of open sessions for the HTTP surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::controller::SessionController;
use super::message::IdSource;
use super::reply::ReplyService;
use crate::config::AssistantConfig;
use crate::error::SessionError;

/// Opens, looks up, and disposes of sessions. Sessions share nothing but the
/// backend and the id source.
pub struct SessionRegistry {
    config: AssistantConfig,
    reply: Arc<dyn ReplyService>,
    ids: Arc<dyn IdSource>,
    sessions: RwLock<HashMap<Uuid, Arc<SessionController>>>,
}

impl SessionRegistry {
    pub fn new(
        config: AssistantConfig,
        reply: Arc<dyn ReplyService>,
        ids: Arc<dyn IdSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            reply,
            ids,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Open a new session.
    pub async fn open(&self) -> Arc<SessionController> {
        let controller = Arc::new(SessionController::from_config(
            &self.config,
            Arc::clone(&self.reply),
            Arc::clone(&self.ids),
        ));
        self.sessions
            .write()
            .await
            .insert(controller.id(), Arc::clone(&controller));
        controller
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionController>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound { id })
    }

    /// Remove and dispose of a session, cancelling any reply in flight.
    pub async fn close(&self, id: Uuid) -> Result<(), SessionError> {
        let controller = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound { id })?;
        controller.close();
        Ok(())
    }

    /// Dispose of every open session.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "Closing all sessions");
        }
        for (_, controller) in drained {
            controller.close();
        }
    }

    /// Close and remove sessions with no appended message for `idle_timeout`.
    /// Sessions waiting on a reply are kept. Returns how many were pruned.
    pub async fn prune_idle(&self, idle_timeout: Duration) -> usize {
        let Some(cutoff) = TimeDelta::from_std(idle_timeout)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let mut stale = Vec::new();
        for (id, controller) in sessions.iter() {
            if controller.is_idle_since(cutoff).await {
                stale.push(*id);
            }
        }

        for id in &stale {
            if let Some(controller) = sessions.remove(id) {
                controller.close();
            }
        }
        if !stale.is_empty() {
            info!(count = stale.len(), remaining = sessions.len(), "Pruned idle sessions");
        }
        stale.len()
    }

    /// Idle timeout from the registry's config.
    pub fn idle_timeout(&self) -> Duration {
        self.config.session_idle_timeout
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::SequentialIds;
    use crate::chat::reply::LocalReplyService;

    fn registry() -> Arc<SessionRegistry> {
        let reply = LocalReplyService::default().with_latency(Duration::ZERO);
        SessionRegistry::new(
            AssistantConfig::default(),
            Arc::new(reply),
            Arc::new(SequentialIds::new()),
        )
    }

    #[tokio::test]
    async fn open_get_close() {
        let registry = registry();
        let session = registry.open().await;
        assert_eq!(registry.count().await, 1);

        let found = registry.get(session.id()).await.unwrap();
        assert_eq!(found.id(), session.id());

        registry.close(session.id()).await.unwrap();
        assert!(session.is_closed());
        assert_eq!(registry.count().await, 0);
        assert!(matches!(
            registry.get(session.id()).await,
            Err(SessionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn close_unknown_session_is_not_found() {
        let registry = registry();
        let id = Uuid::new_v4();
        assert!(matches!(
            registry.close(id).await,
            Err(SessionError::NotFound { id: missing }) if missing == id
        ));
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let registry = registry();
        let a = registry.open().await;
        let b = registry.open().await;

        a.submit("help").await.unwrap();
        assert_eq!(a.current().await.messages.len(), 3);
        assert_eq!(b.current().await.messages.len(), 1);
    }

    #[tokio::test]
    async fn close_all_disposes_everything() {
        let registry = registry();
        let a = registry.open().await;
        let b = registry.open().await;
        registry.close_all().await;
        assert!(a.is_closed());
        assert!(b.is_closed());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn prune_removes_only_idle_sessions() {
        let registry = registry();
        let stale = registry.open().await;
        let fresh = registry.open().await;

        // Nothing has been quiet for an hour yet.
        assert_eq!(registry.prune_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.count().await, 2);

        tokio::time::sleep(Duration::from_millis(300)).await;
        fresh.submit("help").await.unwrap();

        assert_eq!(registry.prune_idle(Duration::from_millis(150)).await, 1);
        assert!(stale.is_closed());
        assert!(!fresh.is_closed());
        assert!(registry.get(fresh.id()).await.is_ok());
        assert!(matches!(
            registry.get(stale.id()).await,
            Err(SessionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn prune_keeps_session_waiting_on_reply() {
        let reply = LocalReplyService::default().with_latency(Duration::from_millis(200));
        let registry = SessionRegistry::new(
            AssistantConfig::default(),
            Arc::new(reply),
            Arc::new(SequentialIds::new()),
        );
        let session = registry.open().await;

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.submit("help").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(registry.prune_idle(Duration::ZERO).await, 0);
        assert!(!session.is_closed());
        pending.await.unwrap().unwrap();

        assert_eq!(registry.prune_idle(Duration::ZERO).await, 1);
        assert_eq!(registry.count().await, 0);
    }

    #[test]
    fn idle_timeout_comes_from_config() {
        assert_eq!(registry().idle_timeout(), Duration::from_secs(3600));
    }
}
