//! The `feedback` tool: raise a request and wait for the console

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{FileBackend, RequestRecord};
use crate::error::Result;
use crate::feedback::SessionId;

/// How often a waiting call checks for an answer
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Context used when the client does not send one
pub const DEFAULT_CONTEXT: &str = "Feedback Session";

/// How a feedback request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Response(String),
    Cancelled,
}

impl FeedbackOutcome {
    /// Tool result body handed back to the AI client
    pub fn to_value(&self) -> Value {
        match self {
            FeedbackOutcome::Response(feedback) => json!({
                "type": "feedback_response",
                "user_feedback": feedback,
            }),
            FeedbackOutcome::Cancelled => json!({
                "type": "feedback_cancelled",
                "message": "Feedback session was cancelled by the user.",
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackRequester {
    backend: Arc<FileBackend>,
    raw_source: String,
    poll_interval: Duration,
}

impl FeedbackRequester {
    pub fn new(backend: Arc<FileBackend>, raw_source: impl Into<String>) -> Self {
        Self {
            backend,
            raw_source: raw_source.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    /// Write a new pending request and return its session id
    pub async fn open(&self, ai_response: &str, context: &str) -> Result<SessionId> {
        let session_id = Uuid::new_v4().to_string();
        let record = RequestRecord::pending(session_id.clone(), ai_response, context, &self.raw_source);
        let path = self.backend.write_request(&record).await?;
        info!("Feedback request {} written to {:?}", session_id, path);
        Ok(session_id)
    }

    /// Poll until the console answers or cancels `session_id`. No timeout.
    pub async fn wait(&self, session_id: &str) -> Result<FeedbackOutcome> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;

            if let Some(feedback) = self.backend.take_response(session_id).await? {
                self.backend.remove_request(session_id).await?;
                debug!("Feedback received for {}", session_id);
                return Ok(FeedbackOutcome::Response(feedback));
            }

            if self.backend.is_cancelled(session_id).await? {
                info!("Feedback session {} was cancelled", session_id);
                return Ok(FeedbackOutcome::Cancelled);
            }
        }
    }

    pub async fn request(&self, ai_response: &str, context: &str) -> Result<FeedbackOutcome> {
        let session_id = self.open(ai_response, context).await?;
        self.wait(&session_id).await
    }
}
