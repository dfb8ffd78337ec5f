//! Inbound client messages
//!
//! Decodes EWMH requests sent by compatibility clients. Anything malformed
//! decodes to `None` and is dropped by the caller without touching state.

use tracing::debug;
use x11rb::protocol::xproto::{Atom, ClientMessageEvent, Window};

use crate::ewmh::atoms::Atoms;
use crate::wm::client_flags::ClientFlags;

/// `_NET_WM_STATE` action (data[0])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    /// New value of an attribute currently at `current`
    pub fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

/// Decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    ActiveWindow { window: Window },
    CloseWindow { window: Window },
    /// Up to two attributes addressed by one message
    WmState {
        window: Window,
        action: StateAction,
        flags: Vec<ClientFlags>,
    },
    CurrentDesktop { desktop: u32 },
    WmDesktop { window: Window, desktop: u32 },
}

/// Decode a 32-bit client message
pub fn decode(
    atoms: &Atoms,
    window: Window,
    message_type: Atom,
    format: u8,
    data: [u32; 5],
) -> Option<BridgeRequest> {
    if format != 32 {
        debug!("Dropping client message with format {}", format);
        return None;
    }

    if message_type == atoms._NET_ACTIVE_WINDOW {
        Some(BridgeRequest::ActiveWindow { window })
    } else if message_type == atoms._NET_CLOSE_WINDOW {
        Some(BridgeRequest::CloseWindow { window })
    } else if message_type == atoms._NET_WM_STATE {
        let Some(action) = StateAction::from_wire(data[0]) else {
            debug!("_NET_WM_STATE: unknown action {} for window {}", data[0], window);
            return None;
        };
        let mut flags = Vec::with_capacity(2);
        for atom in [data[1], data[2]] {
            match atoms.state_flag(atom) {
                Some(flag) if !flags.contains(&flag) => flags.push(flag),
                Some(_) => {}
                None if atom != 0 => debug!("_NET_WM_STATE: ignoring atom {}", atom),
                None => {}
            }
        }
        if flags.is_empty() {
            return None;
        }
        Some(BridgeRequest::WmState {
            window,
            action,
            flags,
        })
    } else if message_type == atoms._NET_CURRENT_DESKTOP {
        Some(BridgeRequest::CurrentDesktop { desktop: data[0] })
    } else if message_type == atoms._NET_WM_DESKTOP {
        Some(BridgeRequest::WmDesktop {
            window,
            desktop: data[0],
        })
    } else {
        None
    }
}

pub fn from_event(atoms: &Atoms, event: &ClientMessageEvent) -> Option<BridgeRequest> {
    if event.format != 32 {
        return None;
    }
    decode(
        atoms,
        event.window,
        event.type_,
        event.format,
        event.data.as_data32(),
    )
}
