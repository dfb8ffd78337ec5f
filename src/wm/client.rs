use slotmap::new_key_type;

use crate::scene::NodeId;
use crate::shared::{Geometry, Strut};
use crate::wm::client_flags::{ClientFlags, WindowType};

new_key_type! {
    /// Handle of a managed client. Stale handles resolve to nothing.
    pub struct ClientId;
}

/// Where a client's surface comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Native toplevel surface of the host compositor
    Native { surface: u64 },
    /// Overlay-style surface (layer-shell like) managed as a client
    Overlay { surface: u64 },
    /// Surface of a legacy X11 client reached through the compatibility bridge
    Bridged { window: u32 },
}

impl ClientKind {
    /// X11 window id, for bridged clients only
    pub fn protocol_window(&self) -> Option<u32> {
        match *self {
            Self::Bridged { window } => Some(window),
            Self::Native { .. } | Self::Overlay { .. } => None,
        }
    }

    pub fn is_bridged(&self) -> bool {
        matches!(self, Self::Bridged { .. })
    }
}

/// Canonical attribute record of a managed window
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,

    pub kind: ClientKind,

    /// Scene node, owned exclusively by this client
    pub node: NodeId,

    /// Last known geometry
    pub geometry: Geometry,

    /// Boolean attributes (ontop, above, fullscreen, ...)
    pub flags: ClientFlags,

    pub window_type: WindowType,

    /// Ancestor this client is stacked with, if any
    pub transient_for: Option<ClientId>,

    /// Desktop (virtual workspace) index
    pub desktop: u32,

    /// Reserved screen edges (docks and panels)
    pub strut: Strut,

    pub title: String,
}

impl Client {
    pub fn new(id: ClientId, kind: ClientKind, node: NodeId, desktop: u32) -> Self {
        Self {
            id,
            kind,
            node,
            geometry: Geometry::default(),
            flags: ClientFlags::empty(),
            window_type: WindowType::Normal,
            transient_for: None,
            desktop,
            strut: Strut::default(),
            title: String::new(),
        }
    }

    pub fn has(&self, flag: ClientFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_ontop(&self) -> bool {
        self.has(ClientFlags::ONTOP)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.has(ClientFlags::FULLSCREEN)
    }

    pub fn is_sticky(&self) -> bool {
        self.has(ClientFlags::STICKY)
    }

    pub fn is_minimized(&self) -> bool {
        self.has(ClientFlags::MINIMIZED)
    }

    /// Whether the node should be drawn while `current_desktop` is shown
    pub fn is_visible_on(&self, current_desktop: u32) -> bool {
        !self.has(ClientFlags::MINIMIZED)
            && !self.has(ClientFlags::HIDDEN)
            && (self.is_sticky() || self.desktop == current_desktop)
    }
}
