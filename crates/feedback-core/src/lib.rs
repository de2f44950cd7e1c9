//! Feedback Core - Feedback session tabs for the Feedback Desk console
//!
//! This crate provides the core functionality for Feedback Desk:
//! - The feedback tab registry and its active-tab selection policy
//! - Auto-expiring notifications
//! - Bulk operations over open sessions
//! - The file-system backend shared with the tool server, and request intake
//! - The tool server AI clients launch to raise feedback requests
//! - Configuration management

pub mod backend;
pub mod config;
pub mod error;
pub mod feedback;
pub mod intake;
pub mod server;
pub mod source;

pub use backend::{FeedbackBackend, FileBackend, RequestRecord};
pub use config::{Config, ConfigManager, StorageConfig, TabsConfig};
pub use error::{Error, Result};
pub use feedback::{
    CloseAllReport, FeedbackData, FeedbackStore, FeedbackTab, PushOptions, SessionId, StoreEvent,
    StoreSnapshot,
};
pub use intake::{ArrivalHook, RequestWatcher, ScanMode};
pub use server::{FeedbackOutcome, FeedbackRequester, ToolServer};
pub use source::{client_config, source_from_env, AiSource, TOOL_SERVER_FLAG};
