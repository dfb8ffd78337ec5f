//! Focus Module
//!
//! Tracks the focused client and a most-recently-used history used to pick
//! a fallback when the focused client goes away.

use std::collections::VecDeque;

use crate::wm::client::ClientId;

/// Focus manager
#[derive(Debug)]
pub struct FocusState {
    /// Currently focused client
    focused: Option<ClientId>,

    /// Most recent first
    history: VecDeque<ClientId>,

    max_history_size: usize,
}

impl FocusState {
    pub fn new() -> Self {
        Self {
            focused: None,
            history: VecDeque::new(),
            max_history_size: 20,
        }
    }

    pub fn focused(&self) -> Option<ClientId> {
        self.focused
    }

    /// Returns the previously focused client when focus actually moved
    pub fn set(&mut self, target: Option<ClientId>) -> Option<Option<ClientId>> {
        if self.focused == target {
            return None;
        }
        let previous = self.focused;
        self.focused = target;
        if let Some(id) = target {
            self.history.retain(|&w| w != id);
            self.history.push_front(id);
            self.history.truncate(self.max_history_size);
        }
        Some(previous)
    }

    /// Drop every trace of a destroyed client
    pub fn forget(&mut self, id: ClientId) {
        self.history.retain(|&w| w != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    /// Most recently focused client accepted by `eligible`
    pub fn fallback(&self, mut eligible: impl FnMut(ClientId) -> bool) -> Option<ClientId> {
        self.history.iter().copied().find(|&id| eligible(id))
    }
}

impl Default for FocusState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_set_reports_only_real_changes() {
        let mut keys: SlotMap<ClientId, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let mut focus = FocusState::new();
        assert_eq!(focus.set(Some(a)), Some(None));
        assert_eq!(focus.set(Some(a)), None);
        assert_eq!(focus.set(None), Some(Some(a)));
    }

    #[test]
    fn test_fallback_uses_history() {
        let mut keys: SlotMap<ClientId, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());
        let c = keys.insert(());
        let mut focus = FocusState::new();
        focus.set(Some(a));
        focus.set(Some(b));
        focus.set(Some(c));
        focus.forget(c);
        assert_eq!(focus.focused(), None);
        assert_eq!(focus.fallback(|_| true), Some(b));
        assert_eq!(focus.fallback(|id| id != b), Some(a));
    }
}
