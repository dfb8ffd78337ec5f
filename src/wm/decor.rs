//! Decor surfaces
//!
//! Panels, status bars and similar overlay objects. They are stacked
//! independently of clients, with a simpler layer rule and no transient
//! grouping.

use slotmap::new_key_type;

use crate::scene::{NodeId, SceneLayer};
use crate::wm::client_flags::WindowType;

new_key_type! {
    pub struct DecorId;
}

#[derive(Debug, Clone)]
pub struct DecorSurface {
    pub id: DecorId,
    pub node: NodeId,
    pub window_type: WindowType,
    pub ontop: bool,
    pub visible: bool,
}

impl DecorSurface {
    pub fn new(id: DecorId, node: NodeId, window_type: WindowType) -> Self {
        Self {
            id,
            node,
            window_type,
            ontop: false,
            visible: true,
        }
    }

    /// Tier this surface is raised to the top of
    pub fn layer(&self) -> SceneLayer {
        match self.window_type {
            WindowType::Desktop | WindowType::Splash => SceneLayer::Background,
            _ if self.ontop => SceneLayer::Overlay,
            WindowType::Dock => SceneLayer::Above,
            _ => SceneLayer::Decor,
        }
    }
}
