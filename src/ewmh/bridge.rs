//! EWMH mirror of the canonical client state
//!
//! Only bridged clients are mirrored. When no X connection exists the bridge
//! is built with [`Bridge::absent`] and every method returns immediately.

use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Atom, Window};

use crate::ewmh::atoms::Atoms;
use crate::ewmh::wire::{PropertyValue, WireConn};
use crate::shared::Strut;
use crate::wm::client_flags::{ClientFlags, WindowType};
use crate::wm::workspace::ALL_WORKSPACES;

struct Link {
    wire: Box<dyn WireConn>,
    atoms: Atoms,
    root: Window,
    client_list: Option<Vec<Window>>,
    stacking_list: Option<Vec<Window>>,
    active: Option<Window>,
    current_desktop: Option<u32>,
}

impl Link {
    fn write(&self, window: Window, property: Atom, value: PropertyValue) {
        if let Err(e) = self.wire.replace_property(window, property, &value) {
            warn!(
                "Failed to write property {} on window {}: {:#}",
                property, window, e
            );
        }
    }

    fn delete(&self, window: Window, property: Atom) {
        if let Err(e) = self.wire.delete_property(window, property) {
            warn!(
                "Failed to delete property {} on window {}: {:#}",
                property, window, e
            );
        }
    }
}

/// Outbound half of the compatibility bridge
pub struct Bridge {
    link: Option<Link>,
}

impl Bridge {
    /// Bridge without a protocol connection
    pub fn absent() -> Self {
        Self { link: None }
    }

    pub fn new(wire: Box<dyn WireConn>, atoms: Atoms, root: Window) -> Self {
        Self {
            link: Some(Link {
                wire,
                atoms,
                root,
                client_list: None,
                stacking_list: None,
                active: None,
                current_desktop: None,
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.link.is_some()
    }

    pub fn atoms(&self) -> Option<&Atoms> {
        self.link.as_ref().map(|l| &l.atoms)
    }

    /// Advertise `_NET_SUPPORTED` and the supporting WM check window
    pub fn setup(&mut self, check_window: Option<Window>, wm_name: &str) {
        let Some(link) = &self.link else {
            return;
        };
        let atoms = &link.atoms;
        link.write(
            link.root,
            atoms._NET_SUPPORTED,
            PropertyValue::Atoms(atoms.supported()),
        );
        if let Some(check) = check_window {
            for window in [link.root, check] {
                link.write(
                    window,
                    atoms._NET_SUPPORTING_WM_CHECK,
                    PropertyValue::Windows(vec![check]),
                );
            }
            link.write(
                check,
                atoms._NET_WM_NAME,
                PropertyValue::Utf8List(vec![wm_name.to_string()]),
            );
        }
        info!("EWMH bridge advertised {} atoms", atoms.supported().len());
    }

    /// Replace `_NET_WM_STATE` with the full list derived from `flags`
    pub fn mirror_state(&self, window: Window, flags: ClientFlags) {
        let Some(link) = &self.link else {
            return;
        };
        let state = link.atoms.encode_state(flags);
        debug!("_NET_WM_STATE of {} <- {} atoms", window, state.len());
        link.write(window, link.atoms._NET_WM_STATE, PropertyValue::Atoms(state));
    }

    pub fn mirror_type(&self, window: Window, window_type: WindowType) {
        let Some(link) = &self.link else {
            return;
        };
        link.write(
            window,
            link.atoms._NET_WM_WINDOW_TYPE,
            PropertyValue::Atoms(vec![link.atoms.window_type_atom(window_type)]),
        );
    }

    /// Sticky clients advertise every desktop
    pub fn mirror_desktop(&self, window: Window, desktop: u32, sticky: bool) {
        let Some(link) = &self.link else {
            return;
        };
        let value = if sticky { ALL_WORKSPACES } else { desktop };
        link.write(
            window,
            link.atoms._NET_WM_DESKTOP,
            PropertyValue::Cardinals(vec![value]),
        );
    }

    pub fn mirror_strut(&self, window: Window, strut: &Strut) {
        let Some(link) = &self.link else {
            return;
        };
        if strut.is_empty() {
            link.delete(window, link.atoms._NET_WM_STRUT_PARTIAL);
            link.delete(window, link.atoms._NET_WM_STRUT);
            return;
        }
        let partial = strut.to_partial();
        link.write(
            window,
            link.atoms._NET_WM_STRUT_PARTIAL,
            PropertyValue::Cardinals(partial.to_vec()),
        );
        link.write(
            window,
            link.atoms._NET_WM_STRUT,
            PropertyValue::Cardinals(partial[..4].to_vec()),
        );
    }

    pub fn mirror_title(&self, window: Window, title: &str) {
        let Some(link) = &self.link else {
            return;
        };
        link.write(
            window,
            link.atoms._NET_WM_NAME,
            PropertyValue::Utf8List(vec![title.to_string()]),
        );
    }

    /// `_NET_ACTIVE_WINDOW`; `None` (or a non-bridged client) writes 0
    pub fn set_active(&mut self, window: Option<Window>) {
        let Some(link) = &mut self.link else {
            return;
        };
        let window = window.unwrap_or(0);
        if link.active == Some(window) {
            return;
        }
        link.active = Some(window);
        link.write(
            link.root,
            link.atoms._NET_ACTIVE_WINDOW,
            PropertyValue::Windows(vec![window]),
        );
    }

    /// `_NET_CLIENT_LIST` in manage order; rewritten only on change
    pub fn set_client_list(&mut self, windows: Vec<Window>) {
        let Some(link) = &mut self.link else {
            return;
        };
        if link.client_list.as_ref() == Some(&windows) {
            return;
        }
        link.write(
            link.root,
            link.atoms._NET_CLIENT_LIST,
            PropertyValue::Windows(windows.clone()),
        );
        link.client_list = Some(windows);
    }

    /// `_NET_CLIENT_LIST_STACKING`, bottom-to-top; rewritten only on change
    pub fn set_stacking_list(&mut self, windows: Vec<Window>) {
        let Some(link) = &mut self.link else {
            return;
        };
        if link.stacking_list.as_ref() == Some(&windows) {
            return;
        }
        link.write(
            link.root,
            link.atoms._NET_CLIENT_LIST_STACKING,
            PropertyValue::Windows(windows.clone()),
        );
        link.stacking_list = Some(windows);
    }

    pub fn set_desktops(&self, names: &[String]) {
        let Some(link) = &self.link else {
            return;
        };
        link.write(
            link.root,
            link.atoms._NET_NUMBER_OF_DESKTOPS,
            PropertyValue::Cardinals(vec![names.len() as u32]),
        );
        link.write(
            link.root,
            link.atoms._NET_DESKTOP_NAMES,
            PropertyValue::Utf8List(names.to_vec()),
        );
    }

    pub fn set_current_desktop(&mut self, index: u32) {
        let Some(link) = &mut self.link else {
            return;
        };
        if link.current_desktop == Some(index) {
            return;
        }
        link.current_desktop = Some(index);
        link.write(
            link.root,
            link.atoms._NET_CURRENT_DESKTOP,
            PropertyValue::Cardinals(vec![index]),
        );
    }

    /// Ask a bridged client to close itself (WM_DELETE_WINDOW)
    pub fn send_delete(&self, window: Window) {
        let Some(link) = &self.link else {
            return;
        };
        let data = [link.atoms.WM_DELETE_WINDOW, 0, 0, 0, 0];
        if let Err(e) = link
            .wire
            .send_client_message(window, link.atoms.WM_PROTOCOLS, data)
        {
            // Window may already be gone
            debug!("Failed to send WM_DELETE_WINDOW to {}: {:#}", window, e);
        }
    }

    pub fn flush(&self) {
        let Some(link) = &self.link else {
            return;
        };
        if let Err(e) = link.wire.flush() {
            warn!("Failed to flush bridge connection: {:#}", e);
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("active", &self.is_active())
            .finish()
    }
}
