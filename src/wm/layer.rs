//! Layer classification
//!
//! Maps a client's attributes and the current focus onto a compositing
//! layer. Explicit user overrides win over derived policy; first match wins.

use crate::scene::SceneLayer;
use crate::wm::client::{Client, ClientId};
use crate::wm::client_flags::{ClientFlags, WindowLayer, WindowType};

/// Layer of `client` while `focused` holds input focus
pub fn classify(client: &Client, focused: Option<ClientId>) -> WindowLayer {
    let flags = client.flags;
    if flags.contains(ClientFlags::ONTOP) {
        WindowLayer::Ontop
    } else if flags.contains(ClientFlags::FULLSCREEN) && focused == Some(client.id) {
        // Fullscreen only gets its own tier while focused
        WindowLayer::Fullscreen
    } else if flags.contains(ClientFlags::ABOVE) {
        WindowLayer::Above
    } else if flags.contains(ClientFlags::BELOW) {
        WindowLayer::Below
    } else if client.transient_for.is_some() {
        WindowLayer::Ignore
    } else if client.window_type == WindowType::Desktop {
        WindowLayer::Desktop
    } else {
        WindowLayer::Normal
    }
}

impl WindowLayer {
    /// Container tier, `None` for `Ignore`
    pub fn scene_layer(self) -> Option<SceneLayer> {
        match self {
            Self::Ignore => None,
            Self::Desktop => Some(SceneLayer::Desktop),
            Self::Below => Some(SceneLayer::Below),
            Self::Normal => Some(SceneLayer::Normal),
            Self::Above => Some(SceneLayer::Above),
            Self::Fullscreen => Some(SceneLayer::Fullscreen),
            Self::Ontop => Some(SceneLayer::Ontop),
        }
    }
}
