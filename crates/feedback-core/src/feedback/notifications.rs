//! Short-lived user-facing notifications
//!
//! Messages have no identity beyond their text. Each `notify` schedules a
//! removal of the first matching entry after the configured TTL; the timer
//! cannot be cancelled, so removal by value is idempotent.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::StoreEvent;

#[derive(Clone)]
pub struct NotificationQueue {
    messages: Arc<Mutex<Vec<String>>>,
    ttl: Duration,
    events: broadcast::Sender<StoreEvent>,
}

impl NotificationQueue {
    pub fn new(ttl: Duration, events: broadcast::Sender<StoreEvent>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            ttl,
            events,
        }
    }

    /// Append a message and schedule its expiry.
    ///
    /// Outside a Tokio runtime the message is queued but never expires.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        self.messages.lock().push(message.clone());
        debug!("Notification added: {}", message);
        let _ = self.events.send(StoreEvent::NotificationAdded {
            message: message.clone(),
        });

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep(queue.ttl).await;
                    queue.dismiss(&message);
                });
            }
            Err(_) => warn!("No async runtime, notification will not expire: {}", message),
        }
    }

    /// Remove the first entry equal to `message`. Returns false if absent.
    pub fn dismiss(&self, message: &str) -> bool {
        let removed = {
            let mut messages = self.messages.lock();
            match messages.iter().position(|m| m == message) {
                Some(index) => {
                    messages.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            debug!("Notification removed: {}", message);
            let _ = self.events.send(StoreEvent::NotificationRemoved {
                message: message.to_string(),
            });
        }
        removed
    }

    /// Empty the queue. Pending expiries become no-ops.
    pub fn clear_all(&self) {
        self.messages.lock().clear();
        debug!("All notifications cleared");
        let _ = self.events.send(StoreEvent::NotificationsCleared);
    }

    /// Messages in display order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> NotificationQueue {
        let (tx, _rx) = broadcast::channel(16);
        NotificationQueue::new(Duration::from_secs(5), tx)
    }

    async fn settle() {
        // Let spawned expiry tasks observe the advanced clock
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_expires_after_ttl() {
        let queue = queue();
        queue.notify("hello");
        settle().await;
        assert_eq!(queue.messages(), vec!["hello".to_string()]);

        tokio::time::advance(Duration::from_millis(4900)).await;
        settle().await;
        assert_eq!(queue.len(), 1);

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_before_expiry() {
        let queue = queue();
        queue.notify("hello");
        assert!(queue.dismiss("hello"));
        assert!(queue.is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        settle().await;
        assert!(queue.is_empty());
        assert!(!queue.dismiss("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_messages_expire_one_at_a_time() {
        let queue = queue();
        queue.notify("same");
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        queue.notify("same");
        settle().await;
        assert_eq!(queue.len(), 2);

        tokio::time::advance(Duration::from_millis(3100)).await;
        settle().await;
        assert_eq!(queue.len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_makes_timers_noops() {
        let queue = queue();
        queue.notify("one");
        queue.notify("two");
        queue.clear_all();
        assert!(queue.is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[test]
    fn test_notify_without_runtime_keeps_message() {
        let queue = queue();
        queue.notify("queued");
        assert_eq!(queue.messages(), vec!["queued".to_string()]);
    }
}
