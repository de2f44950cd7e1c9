//! Feedback backend
//!
//! The collaborator that owns the other end of a feedback session. The
//! store cancels sessions through it when tabs are closed and forwards the
//! user's response through it on submission.

mod file;

pub use file::{FileBackend, RequestRecord, RESPONSES_DIR, REQUESTS_DIR};

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait FeedbackBackend: Send + Sync {
    /// Abandon a pending session
    async fn cancel(&self, session_id: &str) -> Result<()>;

    /// Deliver the user's response for a session
    async fn submit(&self, session_id: &str, content: &str) -> Result<()>;
}
