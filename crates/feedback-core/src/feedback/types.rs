//! Feedback tab types
//!
//! These types define the records held by the tab registry and the events
//! the store emits to whatever view layer is subscribed to it.

use serde::{Deserialize, Serialize};

/// Unique identifier for a feedback session
pub type SessionId = String;

/// Payload pushed by the request-serving process for one feedback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackData {
    pub session_id: SessionId,
    #[serde(default)]
    pub ai_response: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_source_display: Option<String>,
}

impl FeedbackData {
    /// Create a payload stamped with the current time
    pub fn new(
        session_id: impl Into<SessionId>,
        ai_response: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            ai_response: ai_response.into(),
            context: context.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            ai_source: None,
            ai_source_display: None,
        }
    }

    /// Attach the originating AI tool
    pub fn with_source(mut self, source: impl Into<String>, display: impl Into<String>) -> Self {
        self.ai_source = Some(source.into());
        self.ai_source_display = Some(display.into());
        self
    }
}

/// Options accompanying a push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOptions {
    /// Bring the pushed session to front regardless of what the user is doing
    #[serde(default)]
    pub auto_switch: bool,
}

impl PushOptions {
    pub fn auto_switch() -> Self {
        Self { auto_switch: true }
    }
}

/// Tab priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Which view renders a tab's content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Renderer {
    #[default]
    FeedbackSession,
}

/// One open feedback session, as presented in the tab strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTab {
    pub id: SessionId,
    /// Derived once at creation; updates never change it
    pub title: String,
    pub renderer: Renderer,
    pub payload: FeedbackData,
    /// Not yet brought to front since its last update
    pub is_new: bool,
    pub priority: Priority,
    pub ai_source: Option<String>,
    pub ai_source_display: Option<String>,
    /// Bumped whenever the content should be re-rendered
    pub revision: u64,
}

impl FeedbackTab {
    pub(crate) fn new(title: String, payload: FeedbackData) -> Self {
        Self {
            id: payload.session_id.clone(),
            title,
            renderer: Renderer::default(),
            ai_source: payload.ai_source.clone(),
            ai_source_display: payload.ai_source_display.clone(),
            payload,
            is_new: true,
            priority: Priority::default(),
            revision: 0,
        }
    }
}

/// State-changed signal emitted by the store for every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A new tab was appended
    SessionAdded { id: SessionId },
    /// An existing tab received a new payload
    SessionUpdated { id: SessionId },
    /// A tab was removed
    SessionRemoved { id: SessionId },
    /// The active tab changed; `None` means no selection
    ActiveChanged { id: Option<SessionId> },
    /// A tab was brought to front and is no longer new
    SessionViewed { id: SessionId },
    /// A tab's content should be redrawn
    SessionRefreshed { id: SessionId },
    /// Every tab was marked viewed
    AllViewed,
    /// Every tab was dropped
    SessionsCleared,
    NotificationAdded { message: String },
    NotificationRemoved { message: String },
    NotificationsCleared,
}

impl StoreEvent {
    pub(crate) fn active_changed(id: &str) -> Self {
        Self::ActiveChanged {
            id: (!id.is_empty()).then(|| id.to_string()),
        }
    }
}

/// Point-in-time copy of the observable state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub tabs: Vec<FeedbackTab>,
    /// Empty when nothing is selected
    pub active_id: SessionId,
    pub notifications: Vec<String>,
    pub total_count: usize,
    pub unviewed_count: usize,
}

/// Result of a bulk close
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAllReport {
    pub cancelled: usize,
    pub failed: usize,
}

impl CloseAllReport {
    pub fn total(&self) -> usize {
        self.cancelled + self.failed
    }
}
