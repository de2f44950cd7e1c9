//! Feedback store
//!
//! Owns the tab registry and the notification queue and wires them to the
//! feedback backend. The registry sits behind a single mutex that is never
//! held across an `.await`, so mutations stay atomic with respect to each
//! other.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::notifications::NotificationQueue;
use super::policy::SelectionPolicy;
use super::registry::{TabRegistry, UpsertOutcome};
use super::types::{
    CloseAllReport, FeedbackData, FeedbackTab, PushOptions, SessionId, StoreEvent, StoreSnapshot,
};
use crate::backend::FeedbackBackend;
use crate::config::TabsConfig;
use crate::error::{Error, Result};

const EVENT_CAPACITY: usize = 256;

/// Explicitly owned feedback tab store
pub struct FeedbackStore {
    registry: Mutex<TabRegistry>,
    notifications: NotificationQueue,
    backend: Arc<dyn FeedbackBackend>,
    events: broadcast::Sender<StoreEvent>,
}

impl FeedbackStore {
    pub fn new(config: &TabsConfig, backend: Arc<dyn FeedbackBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let registry = TabRegistry::new(
            SelectionPolicy::new(config.auto_switch_threshold),
            config.fallback_title_prefix.clone(),
            events.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            notifications: NotificationQueue::new(config.notification_ttl(), events.clone()),
            backend,
            events,
        }
    }

    /// Subscribe to state-changed events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Push a new or updated feedback session
    pub fn push(&self, data: FeedbackData, options: PushOptions) -> UpsertOutcome {
        let outcome = self.registry.lock().upsert(data, options);
        if let Some(title) = &outcome.announce {
            self.notifications
                .notify(format!("New feedback request: {}", title));
        }
        outcome
    }

    pub fn remove(&self, id: &str) -> Option<FeedbackTab> {
        self.registry.lock().remove(id)
    }

    pub fn set_active(&self, id: &str) -> bool {
        self.registry.lock().set_active(id)
    }

    pub fn get(&self, id: &str) -> Option<FeedbackTab> {
        self.registry.lock().get(id).cloned()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.registry.lock().exists(id)
    }

    pub fn tabs(&self) -> Vec<FeedbackTab> {
        self.registry.lock().tabs().to_vec()
    }

    pub fn active_id(&self) -> SessionId {
        self.registry.lock().active_id().to_string()
    }

    pub fn current_tab(&self) -> Option<FeedbackTab> {
        self.registry.lock().active_tab().cloned()
    }

    pub fn has_active_feedback(&self) -> bool {
        !self.registry.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn unviewed_count(&self) -> usize {
        self.registry.lock().unviewed_count()
    }

    /// Drop every tab without contacting the backend
    pub fn clear_all_sessions(&self) {
        self.registry.lock().clear();
    }

    pub fn mark_all_viewed(&self) {
        self.registry.lock().mark_all_viewed();
    }

    pub fn refresh(&self, id: &str) -> bool {
        self.registry.lock().refresh(id)
    }

    pub fn ensure_active_visible(&self) {
        self.registry.lock().ensure_active_visible();
    }

    pub fn notify(&self, message: impl Into<String>) {
        self.notifications.notify(message);
    }

    pub fn dismiss(&self, message: &str) -> bool {
        self.notifications.dismiss(message)
    }

    pub fn clear_notifications(&self) {
        self.notifications.clear_all();
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.messages()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let (tabs, active_id, unviewed_count) = {
            let registry = self.registry.lock();
            (
                registry.tabs().to_vec(),
                registry.active_id().to_string(),
                registry.unviewed_count(),
            )
        };

        StoreSnapshot {
            total_count: tabs.len(),
            tabs,
            active_id,
            notifications: self.notifications.messages(),
            unviewed_count,
        }
    }

    /// Close a single tab at the user's request.
    ///
    /// The backend is asked to cancel the session; the tab is removed whether
    /// or not that succeeds. Returns whether the cancellation succeeded.
    pub async fn close_session(&self, id: &str) -> bool {
        if !self.exists(id) {
            debug!("Close ignored, session {} not open", id);
            return false;
        }

        let cancelled = match self.backend.cancel(id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to cancel feedback session {}: {}", id, e);
                false
            }
        };
        self.remove(id);
        cancelled
    }

    /// Forward the user's response to the backend and retire the tab.
    ///
    /// The tab stays open if the backend rejects the submission.
    pub async fn submit_feedback(&self, id: &str, content: &str) -> Result<()> {
        if !self.exists(id) {
            warn!("Feedback submitted for unknown session: {}", id);
            return Err(Error::SessionNotFound(id.to_string()));
        }

        self.backend.submit(id, content).await?;
        info!("Feedback submitted for session {}", id);
        self.remove(id);
        Ok(())
    }

    /// Cancel every open session with the backend, then clear the registry.
    ///
    /// Cancellations run concurrently and independently; the registry is
    /// cleared only after all of them settle, regardless of failures.
    pub async fn close_all(&self) -> CloseAllReport {
        let session_ids: Vec<SessionId> = self
            .registry
            .lock()
            .tabs()
            .iter()
            .map(|tab| tab.id.clone())
            .collect();

        if session_ids.is_empty() {
            debug!("No sessions to close");
            return CloseAllReport::default();
        }
        info!("Closing {} feedback sessions", session_ids.len());

        let results = join_all(session_ids.iter().map(|id| async move {
            (id, self.backend.cancel(id).await)
        }))
        .await;

        let mut report = CloseAllReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    debug!("Feedback session cancelled: {}", id);
                    report.cancelled += 1;
                }
                Err(e) => {
                    error!("Failed to cancel feedback session {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        self.registry.lock().clear();
        info!(
            "Close all finished: {} cancelled, {} failed",
            report.cancelled, report.failed
        );

        if report.cancelled > 0 {
            self.notifications
                .notify(format!("Closed {} feedback session(s)", report.cancelled));
        }
        if report.failed > 0 {
            self.notifications.notify(format!(
                "{} session(s) failed to close but were removed from the view",
                report.failed
            ));
        }
        report
    }
}
