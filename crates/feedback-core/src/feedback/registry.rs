//! Tab registry
//!
//! The authoritative, insertion-ordered set of open feedback tabs plus the
//! active tab id (empty string = nothing selected). Every mutation emits a
//! [`StoreEvent`] on the broadcast channel handed in at construction.
//!
//! The registry itself is not synchronized; [`FeedbackStore`](super::FeedbackStore)
//! owns it behind a single mutex.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::policy::{Decision, SelectionContext, SelectionPolicy};
use super::types::{FeedbackData, FeedbackTab, PushOptions, SessionId, StoreEvent};

/// What a push did to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// A new tab was appended (false for an in-place update)
    pub created: bool,
    /// The pushed tab became the active one
    pub switched: bool,
    /// Title of a tab that arrived without taking focus
    pub announce: Option<String>,
}

pub struct TabRegistry {
    tabs: Vec<FeedbackTab>,
    active_id: SessionId,
    policy: SelectionPolicy,
    title_prefix: String,
    events: broadcast::Sender<StoreEvent>,
}

impl TabRegistry {
    pub fn new(
        policy: SelectionPolicy,
        title_prefix: impl Into<String>,
        events: broadcast::Sender<StoreEvent>,
    ) -> Self {
        Self {
            tabs: Vec::new(),
            active_id: SessionId::new(),
            policy,
            title_prefix: title_prefix.into(),
            events,
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    /// Point the selection at `id` without marking it viewed
    fn select(&mut self, id: &str) {
        if self.active_id != id {
            self.active_id = id.to_string();
            self.emit(StoreEvent::active_changed(id));
        }
    }

    fn selection_context(&self, is_create: bool, options: PushOptions) -> SelectionContext {
        SelectionContext {
            is_create,
            registry_was_empty: is_create && self.tabs.len() == 1,
            has_active: !self.active_id.is_empty(),
            auto_switch_requested: options.auto_switch,
            active_is_new: self.active_tab().map(|tab| tab.is_new),
            tab_count: self.tabs.len(),
        }
    }

    /// Insert a new tab or update an existing one in place, then run the
    /// selection policy.
    pub fn upsert(&mut self, data: FeedbackData, options: PushOptions) -> UpsertOutcome {
        let id = data.session_id.clone();
        debug!(
            "Pushing feedback session {} (tabs: {}, active: {:?})",
            id,
            self.tabs.len(),
            self.active_id
        );

        if let Some(index) = self.position(&id) {
            let tab = &mut self.tabs[index];
            tab.ai_source = data.ai_source.clone();
            tab.ai_source_display = data.ai_source_display.clone();
            tab.payload = data;
            tab.is_new = true;
            debug!("Session {} already open, updated in place", id);
            self.emit(StoreEvent::SessionUpdated { id: id.clone() });

            let decision = self.policy.decide(&self.selection_context(false, options));
            if decision.switches() {
                debug!("Switching to updated session {} ({:?})", id, decision);
                self.select(&id);
            }
            return UpsertOutcome {
                created: false,
                switched: decision.switches(),
                announce: None,
            };
        }

        let title = if data.context.is_empty() {
            format!("{} {}", self.title_prefix, self.tabs.len() + 1)
        } else {
            data.context.clone()
        };
        self.tabs.push(FeedbackTab::new(title.clone(), data));
        info!("Opened feedback tab {} ({} open)", id, self.tabs.len());
        self.emit(StoreEvent::SessionAdded { id: id.clone() });

        let decision = self.policy.decide(&self.selection_context(true, options));
        match decision {
            Decision::Switch(reason) => {
                debug!("Auto-switching to new session {} ({:?})", id, reason);
                self.select(&id);
                UpsertOutcome {
                    created: true,
                    switched: true,
                    announce: None,
                }
            }
            Decision::Stay => {
                debug!("New session {} added without switching", id);
                if self.active_id.is_empty() {
                    warn!("No active tab after push, selecting {}", id);
                    self.select(&id);
                }
                UpsertOutcome {
                    created: true,
                    switched: false,
                    announce: Some(title),
                }
            }
        }
    }

    /// Remove a tab. Absent ids are a no-op.
    ///
    /// When the active tab goes away the selection moves to the tab that now
    /// sits at the same index, or the previous one if the tail was removed.
    pub fn remove(&mut self, id: &str) -> Option<FeedbackTab> {
        let Some(index) = self.position(id) else {
            debug!("Remove ignored, session {} not open", id);
            return None;
        };

        let removed = self.tabs.remove(index);
        self.emit(StoreEvent::SessionRemoved { id: id.to_string() });

        if self.active_id == id {
            let next = if self.tabs.is_empty() {
                SessionId::new()
            } else {
                let next_index = index.min(self.tabs.len() - 1);
                self.tabs[next_index].id.clone()
            };
            self.select(&next);
        }

        info!(
            "Closed feedback tab {} ({} open, active: {:?})",
            id,
            self.tabs.len(),
            self.active_id
        );
        Some(removed)
    }

    /// Bring a tab to front and mark it viewed.
    ///
    /// Returns false (and leaves state untouched) when no such tab exists.
    pub fn set_active(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            warn!("Attempted to activate a tab that does not exist: {}", id);
            return false;
        };

        self.select(id);
        let tab = &mut self.tabs[index];
        if tab.is_new {
            tab.is_new = false;
            debug!("Tab marked as viewed: {}", id);
            self.emit(StoreEvent::SessionViewed { id: id.to_string() });
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&FeedbackTab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Drop every tab and the selection
    pub fn clear(&mut self) {
        info!("Clearing {} feedback tabs", self.tabs.len());
        self.tabs.clear();
        self.emit(StoreEvent::SessionsCleared);
        self.select("");
    }

    pub fn mark_all_viewed(&mut self) {
        for tab in &mut self.tabs {
            tab.is_new = false;
        }
        debug!("All feedback tabs marked as viewed");
        self.emit(StoreEvent::AllViewed);
    }

    /// Re-issue a tab's payload so views redraw it. Returns false if absent.
    pub fn refresh(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let tab = &mut self.tabs[index];
        tab.payload = tab.payload.clone();
        tab.revision += 1;
        debug!("Tab content refreshed: {} (revision {})", id, tab.revision);
        self.emit(StoreEvent::SessionRefreshed { id: id.to_string() });
        true
    }

    /// Repair a selection that points at a missing tab, or redraw the
    /// active tab when the selection is sound.
    pub fn ensure_active_visible(&mut self) {
        if self.active_id.is_empty() {
            return;
        }
        if self.exists(&self.active_id) {
            let id = self.active_id.clone();
            self.refresh(&id);
            return;
        }

        match self.tabs.first().map(|tab| tab.id.clone()) {
            Some(first) => {
                warn!(
                    "Active tab {} not found, switching to first available: {}",
                    self.active_id, first
                );
                self.set_active(&first);
            }
            None => {
                warn!("Active tab {} not found and no tabs open", self.active_id);
                self.select("");
            }
        }
    }

    pub fn tabs(&self) -> &[FeedbackTab] {
        &self.tabs
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn active_tab(&self) -> Option<&FeedbackTab> {
        if self.active_id.is_empty() {
            return None;
        }
        self.get(&self.active_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn unviewed_count(&self) -> usize {
        self.tabs.iter().filter(|tab| tab.is_new).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (TabRegistry, broadcast::Receiver<StoreEvent>) {
        let (tx, rx) = broadcast::channel(64);
        (TabRegistry::new(SelectionPolicy::default(), "Feedback", tx), rx)
    }

    fn data(id: &str) -> FeedbackData {
        FeedbackData::new(id, "response", format!("context {}", id))
    }

    fn ids(registry: &TabRegistry) -> Vec<&str> {
        registry.tabs().iter().map(|tab| tab.id.as_str()).collect()
    }

    #[test]
    fn test_first_push_becomes_active() {
        let (mut registry, _rx) = registry();
        let outcome = registry.upsert(data("a"), PushOptions::default());

        assert!(outcome.created);
        assert!(outcome.switched);
        assert_eq!(registry.active_id(), "a");
        assert!(registry.get("a").unwrap().is_new);
    }

    #[test]
    fn test_second_push_while_first_unviewed_stays() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        let outcome = registry.upsert(data("b"), PushOptions::default());

        assert!(!outcome.switched);
        assert_eq!(outcome.announce.as_deref(), Some("context b"));
        assert_eq!(registry.active_id(), "a");
        assert_eq!(ids(&registry), vec!["a", "b"]);
    }

    #[test]
    fn test_auto_switch_option() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        let outcome = registry.upsert(data("b"), PushOptions::auto_switch());

        assert!(outcome.switched);
        assert!(outcome.announce.is_none());
        assert_eq!(registry.active_id(), "b");
    }

    #[test]
    fn test_fallback_title_uses_ordinal() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(FeedbackData::new("b", "r", ""), PushOptions::default());
        assert_eq!(registry.get("b").unwrap().title, "Feedback 2");
    }

    #[test]
    fn test_update_keeps_title_and_length() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.set_active("a");

        let update = FeedbackData::new("a", "second", "other context").with_source("cursor", "Cursor AI");
        let outcome = registry.upsert(update, PushOptions::default());

        assert!(!outcome.created);
        assert!(outcome.announce.is_none());
        assert_eq!(registry.len(), 1);
        let tab = registry.get("a").unwrap();
        assert_eq!(tab.title, "context a");
        assert_eq!(tab.payload.ai_response, "second");
        assert_eq!(tab.ai_source.as_deref(), Some("cursor"));
        assert!(tab.is_new);
    }

    #[test]
    fn test_remove_active_prefers_same_index() {
        let (mut registry, _rx) = registry();
        for id in ["a", "b", "c"] {
            registry.upsert(data(id), PushOptions::default());
        }
        registry.set_active("b");

        registry.remove("b");
        assert_eq!(registry.active_id(), "c");
    }

    #[test]
    fn test_remove_active_tail_falls_back_to_previous() {
        let (mut registry, _rx) = registry();
        for id in ["a", "b", "c"] {
            registry.upsert(data(id), PushOptions::default());
        }
        registry.set_active("c");

        registry.remove("c");
        assert_eq!(registry.active_id(), "b");
    }

    #[test]
    fn test_remove_last_tab_clears_selection() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.remove("a");
        assert_eq!(registry.active_id(), "");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_inactive_keeps_selection() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(data("b"), PushOptions::default());
        registry.remove("b");
        assert_eq!(registry.active_id(), "a");
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        assert!(registry.remove("missing").is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_id(), "a");
    }

    #[test]
    fn test_set_active_unknown_leaves_state() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        assert!(!registry.set_active("nonexistent"));
        assert_eq!(registry.active_id(), "a");
        assert!(registry.get("a").unwrap().is_new);
    }

    #[test]
    fn test_set_active_marks_viewed() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(data("b"), PushOptions::default());
        assert_eq!(registry.unviewed_count(), 2);

        assert!(registry.set_active("b"));
        assert!(!registry.get("b").unwrap().is_new);
        assert_eq!(registry.unviewed_count(), 1);
    }

    #[test]
    fn test_viewed_active_at_threshold_does_not_switch() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.set_active("a");

        let outcome = registry.upsert(data("c"), PushOptions::default());
        assert!(!outcome.switched);
        assert_eq!(registry.active_id(), "a");
    }

    #[test]
    fn test_viewed_active_below_raised_threshold_switches() {
        let (tx, _rx) = broadcast::channel(16);
        let mut registry = TabRegistry::new(SelectionPolicy::new(3), "Feedback", tx);
        registry.upsert(data("a"), PushOptions::default());
        registry.set_active("a");

        let outcome = registry.upsert(data("c"), PushOptions::default());
        assert!(outcome.switched);
        assert_eq!(registry.active_id(), "c");
    }

    #[test]
    fn test_clear() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(data("b"), PushOptions::default());
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.active_id(), "");
    }

    #[test]
    fn test_mark_all_viewed() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(data("b"), PushOptions::default());
        registry.mark_all_viewed();
        assert_eq!(registry.unviewed_count(), 0);
    }

    #[test]
    fn test_refresh_bumps_revision_only() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        let before = registry.get("a").unwrap().clone();

        assert!(registry.refresh("a"));
        let after = registry.get("a").unwrap();
        assert_eq!(after.payload, before.payload);
        assert_eq!(after.revision, before.revision + 1);
        assert!(!registry.refresh("missing"));
    }

    #[test]
    fn test_ensure_active_visible_repairs_dangling_selection() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.upsert(data("b"), PushOptions::default());
        registry.active_id = "ghost".to_string();

        registry.ensure_active_visible();
        assert_eq!(registry.active_id(), "a");
        assert!(!registry.get("a").unwrap().is_new);
    }

    #[test]
    fn test_ensure_active_visible_refreshes_valid_selection() {
        let (mut registry, _rx) = registry();
        registry.upsert(data("a"), PushOptions::default());

        registry.ensure_active_visible();
        assert_eq!(registry.active_id(), "a");
        assert_eq!(registry.get("a").unwrap().revision, 1);
    }

    #[test]
    fn test_ensure_active_visible_with_no_tabs_resets_selection() {
        let (mut registry, _rx) = registry();
        registry.active_id = "ghost".to_string();
        registry.ensure_active_visible();
        assert_eq!(registry.active_id(), "");
    }

    #[test]
    fn test_events_emitted_in_order() {
        let (mut registry, mut rx) = registry();
        registry.upsert(data("a"), PushOptions::default());
        registry.set_active("a");
        registry.remove("a");

        let events: Vec<StoreEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                StoreEvent::SessionAdded { id: "a".into() },
                StoreEvent::ActiveChanged { id: Some("a".into()) },
                StoreEvent::SessionViewed { id: "a".into() },
                StoreEvent::SessionRemoved { id: "a".into() },
                StoreEvent::ActiveChanged { id: None },
            ]
        );
    }
}
