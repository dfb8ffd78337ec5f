//! Map state of bridged windows
//!
//! Scene visibility has to reach the X server as map/unmap requests. Unmaps
//! the WM issues itself come back as `UnmapNotify`; those are counted here so
//! the event loop does not mistake them for the client withdrawing.

use std::collections::HashMap;

use x11rb::protocol::xproto::Window;

/// Request to send for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapChange {
    Map(Window),
    Unmap(Window),
}

#[derive(Debug, Default)]
pub struct MapTracker {
    /// Last state requested from the server
    mapped: HashMap<Window, bool>,
    pending_unmaps: HashMap<Window, u32>,
}

impl MapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a map the caller already sent
    pub fn mapped(&mut self, window: Window) {
        self.mapped.insert(window, true);
    }

    /// Changes needed so every window matches `wanted`
    pub fn sync<I>(&mut self, wanted: I) -> Vec<MapChange>
    where
        I: IntoIterator<Item = (Window, bool)>,
    {
        let mut changes = Vec::new();
        for (window, visible) in wanted {
            if self.mapped.get(&window) == Some(&visible) {
                continue;
            }
            self.mapped.insert(window, visible);
            if visible {
                changes.push(MapChange::Map(window));
            } else {
                *self.pending_unmaps.entry(window).or_default() += 1;
                changes.push(MapChange::Unmap(window));
            }
        }
        changes
    }

    /// Whether an `UnmapNotify` for `window` was caused by our own unmap
    pub fn take_unmap(&mut self, window: Window) -> bool {
        let Some(count) = self.pending_unmaps.get_mut(&window) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending_unmaps.remove(&window);
        }
        true
    }

    pub fn forget(&mut self, window: Window) {
        self.mapped.remove(&window);
        self.pending_unmaps.remove(&window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_changes_are_reported() {
        let mut tracker = MapTracker::new();
        tracker.mapped(5);
        tracker.mapped(6);
        assert_eq!(tracker.sync([(5, true), (6, false)]), vec![MapChange::Unmap(6)]);
        assert!(tracker.sync([(5, true), (6, false)]).is_empty());
        assert_eq!(tracker.sync([(6, true)]), vec![MapChange::Map(6)]);
    }

    #[test]
    fn test_own_unmaps_are_recognised_once() {
        let mut tracker = MapTracker::new();
        tracker.mapped(5);
        tracker.sync([(5, false)]);
        assert!(tracker.take_unmap(5));
        // A second notify comes from the client itself
        assert!(!tracker.take_unmap(5));
    }

    #[test]
    fn test_forget_drops_pending_unmaps() {
        let mut tracker = MapTracker::new();
        tracker.mapped(5);
        tracker.sync([(5, false)]);
        tracker.forget(5);
        assert!(!tracker.take_unmap(5));
        assert_eq!(tracker.sync([(5, true)]), vec![MapChange::Map(5)]);
    }
}
