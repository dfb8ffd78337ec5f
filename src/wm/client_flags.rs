//! Client Flags
//!
//! Bitfield flags for the boolean client attributes, plus the window type
//! and layer enums the stacking core keys off.

use bitflags::bitflags;

bitflags! {
    /// Boolean client attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClientFlags: u32 {
        const ONTOP               = 1 << 0;
        const ABOVE               = 1 << 1;
        const BELOW               = 1 << 2;
        const FULLSCREEN          = 1 << 3;
        const STICKY              = 1 << 4;
        const MODAL               = 1 << 5;
        const MINIMIZED           = 1 << 6;
        const HIDDEN              = 1 << 7;
        const SKIP_TASKBAR        = 1 << 8;
        const MAXIMIZED_HORIZ     = 1 << 9;
        const MAXIMIZED_VERT      = 1 << 10;
        const URGENT              = 1 << 11;
    }
}

impl ClientFlags {
    /// Attributes whose value feeds the layer classifier or visibility
    pub fn stacking_relevant() -> Self {
        Self::ONTOP
            | Self::ABOVE
            | Self::BELOW
            | Self::FULLSCREEN
            | Self::STICKY
            | Self::MINIMIZED
            | Self::HIDDEN
    }

    /// Attributes carried by `_NET_WM_STATE`. Minimized shows up as hidden.
    pub fn mirrored() -> Self {
        Self::all() - Self::ONTOP
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowType {
    #[default]
    Normal,
    Desktop,
    Dock,
    Dialog,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Notification,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Combo,
    Dnd,
}

impl WindowType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Desktop => "desktop",
            Self::Dock => "dock",
            Self::Dialog => "dialog",
            Self::Toolbar => "toolbar",
            Self::Menu => "menu",
            Self::Utility => "utility",
            Self::Splash => "splash",
            Self::Notification => "notification",
            Self::DropdownMenu => "dropdown_menu",
            Self::PopupMenu => "popup_menu",
            Self::Tooltip => "tooltip",
            Self::Combo => "combo",
            Self::Dnd => "dnd",
        }
    }
}

/// Client layer (for stacking)
///
/// `Ignore` is not a tier: it marks a transient that is stacked with its
/// ancestor. The remaining variants are ordered bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowLayer {
    Ignore,
    Desktop,
    Below,
    Normal,
    Above,
    Fullscreen,
    Ontop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order_is_monotonic() {
        assert!(WindowLayer::Desktop < WindowLayer::Below);
        assert!(WindowLayer::Below < WindowLayer::Normal);
        assert!(WindowLayer::Normal < WindowLayer::Above);
        assert!(WindowLayer::Above < WindowLayer::Fullscreen);
        assert!(WindowLayer::Fullscreen < WindowLayer::Ontop);
    }
}
