//! Request intake
//!
//! Polls the request directory written by the tool server and pushes every
//! pending request into the feedback store.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::FileBackend;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::feedback::{FeedbackData, FeedbackStore, PushOptions};

/// Called for requests that show up while the watcher is already running
pub type ArrivalHook = Arc<dyn Fn(&FeedbackData) + Send + Sync>;

/// Why a scan is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Startup or manual rescan: every pending request is pushed
    Full,
    /// Periodic poll: requests pushed within the reprocess window are skipped
    Periodic,
}

pub struct RequestWatcher {
    backend: Arc<FileBackend>,
    store: Arc<FeedbackStore>,
    config: StorageConfig,
    on_arrival: Option<ArrivalHook>,
}

impl RequestWatcher {
    pub fn new(backend: Arc<FileBackend>, store: Arc<FeedbackStore>, config: StorageConfig) -> Self {
        Self {
            backend,
            store,
            config,
            on_arrival: None,
        }
    }

    /// Alert hook for periodic-scan arrivals. Startup backlog does not trigger it.
    pub fn with_arrival_hook(mut self, hook: ArrivalHook) -> Self {
        self.on_arrival = Some(hook);
        self
    }

    /// Scan the request directory once; returns how many requests were pushed
    pub async fn scan(&self, mode: ScanMode) -> Result<usize> {
        let requests_dir = self.backend.requests_dir();
        if !tokio::fs::try_exists(&requests_dir).await? {
            debug!("Requests directory {:?} does not exist, nothing to scan", requests_dir);
            return Ok(0);
        }

        let mut entries = tokio::fs::read_dir(&requests_dir).await?;
        let mut pushed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.process_file(&path, mode).await {
                Ok(true) => pushed += 1,
                Ok(false) => {}
                Err(e) => warn!("Skipping request file {:?}: {}", path, e),
            }
        }

        if mode == ScanMode::Full {
            info!("Scan of {:?} loaded {} pending feedback requests", requests_dir, pushed);
        }
        Ok(pushed)
    }

    fn recently_processed(&self, last_processed_at: Option<&str>) -> bool {
        let Some(last) = last_processed_at else {
            return false;
        };
        let Ok(last) = chrono::DateTime::parse_from_rfc3339(last) else {
            return false;
        };
        let elapsed = chrono::Utc::now().signed_duration_since(last.with_timezone(&chrono::Utc));
        match elapsed.to_std() {
            Ok(elapsed) => elapsed < self.config.reprocess_after(),
            // Timestamp in the future
            Err(_) => true,
        }
    }

    async fn process_file(&self, path: &Path, mode: ScanMode) -> Result<bool> {
        let mut record = self.backend.read_request(path).await?;
        if record.processed {
            return Ok(false);
        }
        if mode == ScanMode::Periodic && self.recently_processed(record.last_processed_at.as_deref()) {
            return Ok(false);
        }
        // The file name is the address used to cancel or answer the session
        if self.backend.request_path(&record.session_id)?.as_path() != path {
            return Err(Error::InvalidRequest(format!(
                "session id {:?} does not match its file name",
                record.session_id
            )));
        }

        debug!("Pushing feedback request {} from {:?}", record.session_id, path);
        let data = record.to_feedback_data();
        self.store.push(data.clone(), PushOptions::default());
        if mode == ScanMode::Periodic {
            info!(
                "New feedback request {} from {}",
                data.session_id,
                data.ai_source_display.as_deref().unwrap_or("unknown source")
            );
            if let Some(hook) = &self.on_arrival {
                hook(&data);
            }
        }

        record.last_processed_at = Some(chrono::Utc::now().to_rfc3339());
        match serde_json::to_string_pretty(&record) {
            Ok(content) => {
                if let Err(e) = tokio::fs::write(path, content).await {
                    warn!("Failed to update processed time for {:?}: {}", path, e);
                }
            }
            Err(e) => warn!("Failed to serialize request {:?}: {}", path, e),
        }
        Ok(true)
    }

    /// Full scan, then poll until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Request watcher started on {:?}", self.backend.requests_dir());
        if let Err(e) = self.scan(ScanMode::Full).await {
            warn!("Initial request scan failed: {}", e);
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        // First tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Request watcher stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.scan(ScanMode::Periodic).await {
                        warn!("Failed to scan requests directory: {}", e);
                    }
                }
            }
        }
    }
}
