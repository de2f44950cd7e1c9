//! Active tab selection policy
//!
//! Decides, for every push, whether the pushed tab should become the active
//! one. Rules are evaluated in order and the first match wins:
//!
//! 1. the registry was empty before this tab
//! 2. nothing is currently selected
//! 3. the caller asked for `auto_switch`
//! 4. the active tab has already been viewed and the tab count is still
//!    below the threshold
//!
//! Updates to an existing tab only consult rules 2 and 3.

/// Why a push switched the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    FirstTab,
    NoActiveTab,
    Requested,
    ActiveTabViewed,
}

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Switch(SwitchReason),
    Stay,
}

impl Decision {
    pub fn switches(&self) -> bool {
        matches!(self, Decision::Switch(_))
    }
}

/// Registry facts the policy decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionContext {
    /// The push created a new tab (as opposed to updating one)
    pub is_create: bool,
    pub registry_was_empty: bool,
    pub has_active: bool,
    pub auto_switch_requested: bool,
    /// `is_new` of the currently active tab, if there is one
    pub active_is_new: Option<bool>,
    /// Number of tabs once the pushed tab is in place
    pub tab_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    threshold: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self { threshold: 2 }
    }
}

impl SelectionPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn decide(&self, ctx: &SelectionContext) -> Decision {
        if ctx.is_create && ctx.registry_was_empty {
            return Decision::Switch(SwitchReason::FirstTab);
        }
        if !ctx.has_active {
            return Decision::Switch(SwitchReason::NoActiveTab);
        }
        if ctx.auto_switch_requested {
            return Decision::Switch(SwitchReason::Requested);
        }
        if ctx.is_create && ctx.active_is_new == Some(false) && ctx.tab_count < self.threshold {
            return Decision::Switch(SwitchReason::ActiveTabViewed);
        }
        Decision::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_ctx() -> SelectionContext {
        SelectionContext {
            is_create: true,
            registry_was_empty: false,
            has_active: true,
            auto_switch_requested: false,
            active_is_new: Some(true),
            tab_count: 2,
        }
    }

    #[test]
    fn test_first_tab_always_switches() {
        let ctx = SelectionContext {
            registry_was_empty: true,
            has_active: false,
            active_is_new: None,
            tab_count: 1,
            ..create_ctx()
        };
        assert_eq!(
            SelectionPolicy::default().decide(&ctx),
            Decision::Switch(SwitchReason::FirstTab)
        );
    }

    #[test]
    fn test_no_active_tab_switches() {
        let ctx = SelectionContext {
            has_active: false,
            active_is_new: None,
            ..create_ctx()
        };
        assert_eq!(
            SelectionPolicy::default().decide(&ctx),
            Decision::Switch(SwitchReason::NoActiveTab)
        );
    }

    #[test]
    fn test_requested_switch() {
        let ctx = SelectionContext {
            auto_switch_requested: true,
            ..create_ctx()
        };
        assert_eq!(
            SelectionPolicy::default().decide(&ctx),
            Decision::Switch(SwitchReason::Requested)
        );
    }

    #[test]
    fn test_unviewed_active_tab_keeps_focus() {
        assert_eq!(SelectionPolicy::default().decide(&create_ctx()), Decision::Stay);
    }

    #[test]
    fn test_viewed_active_tab_at_threshold_does_not_switch() {
        let ctx = SelectionContext {
            active_is_new: Some(false),
            tab_count: 2,
            ..create_ctx()
        };
        assert_eq!(SelectionPolicy::default().decide(&ctx), Decision::Stay);
    }

    #[test]
    fn test_viewed_active_tab_below_threshold_switches() {
        let ctx = SelectionContext {
            active_is_new: Some(false),
            tab_count: 2,
            ..create_ctx()
        };
        assert_eq!(
            SelectionPolicy::new(3).decide(&ctx),
            Decision::Switch(SwitchReason::ActiveTabViewed)
        );
    }

    #[test]
    fn test_update_ignores_threshold_rule() {
        let ctx = SelectionContext {
            is_create: false,
            active_is_new: Some(false),
            tab_count: 1,
            ..create_ctx()
        };
        assert_eq!(SelectionPolicy::new(5).decide(&ctx), Decision::Stay);
    }

    #[test]
    fn test_update_with_no_active_tab_switches() {
        let ctx = SelectionContext {
            is_create: false,
            has_active: false,
            active_is_new: None,
            ..create_ctx()
        };
        assert!(SelectionPolicy::default().decide(&ctx).switches());
    }
}
