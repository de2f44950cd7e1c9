//! File-system exchange with the tool server
//!
//! Layout under the storage root:
//!
//! ```text
//! feedback_requests/<session_id>.json    written by the tool server
//! feedback_responses/<session_id>.json   written here on submission
//! ```
//!
//! A session counts as cancelled once its request file is gone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::FeedbackBackend;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::feedback::FeedbackData;
use crate::source::AiSource;

pub const REQUESTS_DIR: &str = "feedback_requests";
pub const RESPONSES_DIR: &str = "feedback_responses";

/// On-disk form of a pending feedback request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "aiResponse", default)]
    pub ai_response: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "aiSource", default, skip_serializing_if = "Option::is_none")]
    pub ai_source: Option<String>,
    #[serde(rename = "aiSourceDisplay", default, skip_serializing_if = "Option::is_none")]
    pub ai_source_display: Option<String>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<String>,
    /// Fields this side does not interpret, preserved on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestRecord {
    /// A fresh pending request, as the tool server writes it
    pub fn pending(
        session_id: impl Into<String>,
        ai_response: impl Into<String>,
        context: impl Into<String>,
        raw_source: &str,
    ) -> Self {
        let source: AiSource = raw_source.parse().unwrap_or_default();
        Self {
            session_id: session_id.into(),
            ai_response: ai_response.into(),
            context: context.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: Some("pending".to_string()),
            ai_source: Some(raw_source.to_string()),
            ai_source_display: Some(source.display_name().to_string()),
            processed: false,
            last_processed_at: None,
            extra: Map::new(),
        }
    }

    /// Payload pushed into the tab store
    pub fn to_feedback_data(&self) -> FeedbackData {
        FeedbackData {
            session_id: self.session_id.clone(),
            ai_response: self.ai_response.clone(),
            context: self.context.clone(),
            timestamp: self.timestamp.clone(),
            ai_source: Some(
                self.ai_source
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            ai_source_display: Some(
                self.ai_source_display
                    .clone()
                    .unwrap_or_else(|| AiSource::Unknown.display_name().to_string()),
            ),
        }
    }
}

/// Session ids become file names, so they must stay a single path component
fn validate_session_id(session_id: &str) -> Result<()> {
    let invalid = session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\']);
    if invalid {
        return Err(Error::InvalidRequest(format!(
            "unusable session id: {:?}",
            session_id
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn requests_dir(&self) -> PathBuf {
        self.root.join(REQUESTS_DIR)
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.root.join(RESPONSES_DIR)
    }

    pub fn request_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.requests_dir().join(format!("{}.json", session_id)))
    }

    pub fn response_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.responses_dir().join(format!("{}.json", session_id)))
    }

    /// Write (or overwrite) a request file
    pub async fn write_request(&self, record: &RequestRecord) -> Result<PathBuf> {
        let path = self.request_path(&record.session_id)?;
        tokio::fs::create_dir_all(self.requests_dir()).await?;
        tokio::fs::write(&path, serde_json::to_string_pretty(record)?).await?;
        Ok(path)
    }

    pub async fn read_request(&self, path: &Path) -> Result<RequestRecord> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read a response and delete its file. `None` while nothing was submitted.
    pub async fn take_response(&self, session_id: &str) -> Result<Option<String>> {
        let path = self.response_path(session_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let response: Value = serde_json::from_str(&content)?;
        let Some(feedback) = response.get("feedback").and_then(Value::as_str) else {
            return Ok(None);
        };
        let feedback = feedback.to_string();
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove response file {:?}: {}", path, e);
        }
        Ok(Some(feedback))
    }

    /// True once the request file for `session_id` is gone
    pub async fn is_cancelled(&self, session_id: &str) -> Result<bool> {
        let path = self.request_path(session_id)?;
        Ok(!tokio::fs::try_exists(&path).await?)
    }

    /// Remove a request file once its response has been collected
    pub async fn remove_request(&self, session_id: &str) -> Result<()> {
        let path = self.request_path(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn mark_processed(&self, session_id: &str) -> Result<()> {
        let path = self.request_path(session_id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let mut request: Value = serde_json::from_str(&content)?;
        let now = chrono::Utc::now().to_rfc3339();
        request["processed"] = json!(true);
        request["processed_at"] = json!(now);
        request["feedback_submitted"] = json!(true);
        tokio::fs::write(&path, serde_json::to_string_pretty(&request)?).await?;
        Ok(())
    }
}

#[async_trait]
impl FeedbackBackend for FileBackend {
    async fn cancel(&self, session_id: &str) -> Result<()> {
        let path = self.request_path(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed request file for {}", session_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Backend(format!(
                "failed to cancel {}: {}",
                session_id, e
            ))),
        }
    }

    async fn submit(&self, session_id: &str, content: &str) -> Result<()> {
        let path = self.response_path(session_id)?;
        tokio::fs::create_dir_all(self.responses_dir()).await?;

        let response = json!({
            "feedback": content,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        tokio::fs::write(&path, serde_json::to_string_pretty(&response)?)
            .await
            .map_err(|e| Error::Backend(format!("failed to write response for {}: {}", session_id, e)))?;

        if let Err(e) = self.mark_processed(session_id).await {
            warn!("Failed to mark request {} as processed: {}", session_id, e);
        } else {
            debug!("Marked feedback request as processed: {}", session_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_path_like_ids() {
        let backend = FileBackend::new("/tmp/unused");
        assert!(backend.request_path("../escape").is_err());
        assert!(backend.request_path("a/b").is_err());
        assert!(backend.request_path("").is_err());
        assert!(backend.request_path("session-1").is_ok());
    }

    #[test]
    fn test_record_defaults_for_missing_source() {
        let record: RequestRecord =
            serde_json::from_str(r#"{"sessionId":"s1","aiResponse":"hi","context":"c"}"#).unwrap();
        let data = record.to_feedback_data();
        assert_eq!(data.ai_source.as_deref(), Some("unknown"));
        assert_eq!(data.ai_source_display.as_deref(), Some("Unknown AI Tool"));
    }

    #[test]
    fn test_record_preserves_unknown_fields() {
        let record: RequestRecord =
            serde_json::from_str(r#"{"sessionId":"s1","custom":42}"#).unwrap();
        let rewritten = serde_json::to_value(&record).unwrap();
        assert_eq!(rewritten["custom"], 42);
    }

    #[tokio::test]
    async fn test_cancel_removes_request() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path());
        backend
            .write_request(&RequestRecord::pending("s1", "hi", "ctx", "cursor"))
            .await
            .unwrap();
        assert!(!backend.is_cancelled("s1").await.unwrap());

        backend.cancel("s1").await.unwrap();
        assert!(backend.is_cancelled("s1").await.unwrap());
        // Cancelling twice is fine
        backend.cancel("s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_writes_response_and_marks_request() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path());
        let path = backend
            .write_request(&RequestRecord::pending("s1", "hi", "ctx", "augment"))
            .await
            .unwrap();

        backend.submit("s1", "ship it").await.unwrap();

        let request = backend.read_request(&path).await.unwrap();
        assert!(request.processed);
        assert_eq!(request.extra["feedback_submitted"], true);
        assert_eq!(
            backend.take_response("s1").await.unwrap().as_deref(),
            Some("ship it")
        );
        assert!(backend.take_response("s1").await.unwrap().is_none());
    }
}
