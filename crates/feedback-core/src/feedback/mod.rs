//! Feedback tabs
//!
//! Tracks the feedback sessions that are open concurrently and decides which
//! one is in front. Key components:
//!
//! - `TabRegistry`: ordered tabs plus the active tab id
//! - `SelectionPolicy`: whether a pushed tab takes focus
//! - `NotificationQueue`: short-lived messages for tabs that arrived in the background
//! - `FeedbackStore`: the owned instance wiring these to a `FeedbackBackend`
//!
//! # Architecture
//!
//! ```text
//! push(data) ──▶ FeedbackStore ──▶ TabRegistry.upsert ──▶ SelectionPolicy
//!                     │                    │
//!                     │                    └──▶ StoreEvent ──▶ subscribers
//!                     └──▶ NotificationQueue (announce background tabs)
//!
//! close_all() ──▶ FeedbackBackend.cancel × N (concurrent) ──▶ TabRegistry.clear
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use feedback_core::feedback::{FeedbackStore, FeedbackData, PushOptions};
//!
//! let store = FeedbackStore::new(&config.tabs, backend);
//! let mut events = store.subscribe();
//!
//! store.push(FeedbackData::new("s1", "Done, please review", "Refactor"), PushOptions::default());
//! store.set_active("s1");
//! let report = store.close_all().await;
//! ```

mod notifications;
mod policy;
mod registry;
mod store;
mod types;

pub use notifications::NotificationQueue;
pub use policy::{Decision, SelectionContext, SelectionPolicy, SwitchReason};
pub use registry::{TabRegistry, UpsertOutcome};
pub use store::FeedbackStore;
pub use types::{
    CloseAllReport, FeedbackData, FeedbackTab, Priority, PushOptions, Renderer, SessionId,
    StoreEvent, StoreSnapshot,
};
