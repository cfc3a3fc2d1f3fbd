//! Per-connection subscription manager.
//!
//! Tracks which notification targets a WebSocket client listens to and
//! filters dispatches server-side.

use std::collections::HashSet;

use crate::domain::NotifyTarget;

/// Wildcard target matching every dispatch.
pub const WILDCARD: &str = "*";

/// Manages the set of target subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed targets. Ignored while `subscribe_all` is set.
    targets: HashSet<NotifyTarget>,
    /// Whether the client subscribed to everything (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds targets to the subscription set. `"*"` enables the wildcard and
    /// blank targets are ignored. Returns the targets actually added.
    pub fn subscribe(&mut self, targets: &[String]) -> Vec<NotifyTarget> {
        let mut added = Vec::new();
        for raw in targets {
            if raw == WILDCARD {
                self.subscribe_all = true;
                continue;
            }
            let target = NotifyTarget::new(raw.trim());
            if !target.is_empty() && self.targets.insert(target.clone()) {
                added.push(target);
            }
        }
        added
    }

    /// Removes targets from the subscription set. `"*"` clears the
    /// wildcard.
    pub fn unsubscribe(&mut self, targets: &[String]) {
        for raw in targets {
            if raw == WILDCARD {
                self.subscribe_all = false;
            } else {
                self.targets.remove(&NotifyTarget::new(raw.trim()));
            }
        }
    }

    /// Returns `true` if a dispatch for `target` should be forwarded.
    #[must_use]
    pub fn matches(&self, target: &NotifyTarget) -> bool {
        self.subscribe_all || self.targets.contains(target)
    }

    /// Returns the number of explicitly subscribed targets.
    #[must_use]
    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(&NotifyTarget::from("chan")));
    }

    #[test]
    fn subscribe_specific_target() {
        let mut mgr = SubscriptionManager::new();
        let added = mgr.subscribe(&strings(&["chan", "chan", " "]));
        assert_eq!(added, vec![NotifyTarget::from("chan")]);
        assert!(mgr.matches(&NotifyTarget::from("chan")));
        assert!(!mgr.matches(&NotifyTarget::from("other")));
        assert_eq!(mgr.count(), 1);
    }

    #[test]
    fn wildcard_matches_everything_until_removed() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&strings(&["*"]));
        assert!(mgr.is_subscribed_all());
        assert!(mgr.matches(&NotifyTarget::from("anything")));
        mgr.unsubscribe(&strings(&["*"]));
        assert!(!mgr.matches(&NotifyTarget::from("anything")));
    }

    #[test]
    fn unsubscribe_removes_target() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&strings(&["chan"]));
        mgr.unsubscribe(&strings(&["chan"]));
        assert!(!mgr.matches(&NotifyTarget::from("chan")));
        assert_eq!(mgr.count(), 0);
    }
}
