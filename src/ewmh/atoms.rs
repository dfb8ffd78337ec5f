//! EWMH (Extended Window Manager Hints) atoms
//!
//! Interned once when the bridge starts. The list covers what the bridge
//! mirrors and decodes, nothing more.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};

use crate::wm::client_flags::{ClientFlags, WindowType};

macro_rules! atoms {
    ($($field:ident => $name:literal,)*) => {
        /// Holds all interned EWMH atoms
        #[derive(Debug, Clone)]
        #[allow(non_snake_case)]
        pub struct Atoms {
            $(pub $field: Atom,)*
        }

        impl Atoms {
            /// Atom names in declaration order
            pub const NAMES: &'static [&'static str] = &[$($name,)*];

            /// Build the table with any name -> atom resolver
            pub fn resolve(mut lookup: impl FnMut(&str) -> Result<Atom>) -> Result<Self> {
                Ok(Self {
                    $($field: lookup($name)?,)*
                })
            }

            /// Every atom name with its value
            pub fn all(&self) -> Vec<(&'static str, Atom)> {
                vec![$(($name, self.$field),)*]
            }
        }
    };
}

atoms! {
    _NET_SUPPORTED => "_NET_SUPPORTED",
    _NET_SUPPORTING_WM_CHECK => "_NET_SUPPORTING_WM_CHECK",
    _NET_CLIENT_LIST => "_NET_CLIENT_LIST",
    _NET_CLIENT_LIST_STACKING => "_NET_CLIENT_LIST_STACKING",
    _NET_NUMBER_OF_DESKTOPS => "_NET_NUMBER_OF_DESKTOPS",
    _NET_DESKTOP_NAMES => "_NET_DESKTOP_NAMES",
    _NET_CURRENT_DESKTOP => "_NET_CURRENT_DESKTOP",
    _NET_ACTIVE_WINDOW => "_NET_ACTIVE_WINDOW",
    _NET_CLOSE_WINDOW => "_NET_CLOSE_WINDOW",
    _NET_WM_NAME => "_NET_WM_NAME",
    _NET_WM_DESKTOP => "_NET_WM_DESKTOP",
    _NET_WM_STRUT => "_NET_WM_STRUT",
    _NET_WM_STRUT_PARTIAL => "_NET_WM_STRUT_PARTIAL",
    _NET_WM_WINDOW_TYPE => "_NET_WM_WINDOW_TYPE",
    _NET_WM_WINDOW_TYPE_DESKTOP => "_NET_WM_WINDOW_TYPE_DESKTOP",
    _NET_WM_WINDOW_TYPE_DOCK => "_NET_WM_WINDOW_TYPE_DOCK",
    _NET_WM_WINDOW_TYPE_TOOLBAR => "_NET_WM_WINDOW_TYPE_TOOLBAR",
    _NET_WM_WINDOW_TYPE_MENU => "_NET_WM_WINDOW_TYPE_MENU",
    _NET_WM_WINDOW_TYPE_UTILITY => "_NET_WM_WINDOW_TYPE_UTILITY",
    _NET_WM_WINDOW_TYPE_SPLASH => "_NET_WM_WINDOW_TYPE_SPLASH",
    _NET_WM_WINDOW_TYPE_DIALOG => "_NET_WM_WINDOW_TYPE_DIALOG",
    _NET_WM_WINDOW_TYPE_DROPDOWN_MENU => "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU",
    _NET_WM_WINDOW_TYPE_POPUP_MENU => "_NET_WM_WINDOW_TYPE_POPUP_MENU",
    _NET_WM_WINDOW_TYPE_TOOLTIP => "_NET_WM_WINDOW_TYPE_TOOLTIP",
    _NET_WM_WINDOW_TYPE_NOTIFICATION => "_NET_WM_WINDOW_TYPE_NOTIFICATION",
    _NET_WM_WINDOW_TYPE_COMBO => "_NET_WM_WINDOW_TYPE_COMBO",
    _NET_WM_WINDOW_TYPE_DND => "_NET_WM_WINDOW_TYPE_DND",
    _NET_WM_WINDOW_TYPE_NORMAL => "_NET_WM_WINDOW_TYPE_NORMAL",
    _NET_WM_STATE => "_NET_WM_STATE",
    _NET_WM_STATE_MODAL => "_NET_WM_STATE_MODAL",
    _NET_WM_STATE_STICKY => "_NET_WM_STATE_STICKY",
    _NET_WM_STATE_MAXIMIZED_VERT => "_NET_WM_STATE_MAXIMIZED_VERT",
    _NET_WM_STATE_MAXIMIZED_HORZ => "_NET_WM_STATE_MAXIMIZED_HORZ",
    _NET_WM_STATE_SKIP_TASKBAR => "_NET_WM_STATE_SKIP_TASKBAR",
    _NET_WM_STATE_HIDDEN => "_NET_WM_STATE_HIDDEN",
    _NET_WM_STATE_FULLSCREEN => "_NET_WM_STATE_FULLSCREEN",
    _NET_WM_STATE_ABOVE => "_NET_WM_STATE_ABOVE",
    _NET_WM_STATE_BELOW => "_NET_WM_STATE_BELOW",
    _NET_WM_STATE_DEMANDS_ATTENTION => "_NET_WM_STATE_DEMANDS_ATTENTION",
    WM_PROTOCOLS => "WM_PROTOCOLS",
    WM_DELETE_WINDOW => "WM_DELETE_WINDOW",
    UTF8_STRING => "UTF8_STRING",
}

impl Atoms {
    /// Intern all required atoms, pipelining the requests
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let names = Self::NAMES;
        let cookies = names
            .iter()
            .map(|name| conn.intern_atom(false, name.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to send InternAtom requests")?;
        let mut replies = Vec::with_capacity(cookies.len());
        for (cookie, name) in cookies.into_iter().zip(names) {
            let atom = cookie
                .reply()
                .with_context(|| format!("Failed to intern {}", name))?
                .atom;
            replies.push(atom);
        }
        let mut values = replies.into_iter();
        Self::resolve(|name| {
            values
                .next()
                .with_context(|| format!("Missing interned atom {}", name))
        })
    }

    /// `_NET_SUPPORTED` contents, advertised once at start-up
    pub fn supported(&self) -> Vec<Atom> {
        self.all()
            .into_iter()
            .filter(|(name, _)| name.starts_with("_NET_"))
            .map(|(_, atom)| atom)
            .collect()
    }

    /// One state atom per boolean attribute the bridge mirrors
    pub fn state_table(&self) -> [(ClientFlags, Atom); 10] {
        [
            (ClientFlags::MODAL, self._NET_WM_STATE_MODAL),
            (ClientFlags::FULLSCREEN, self._NET_WM_STATE_FULLSCREEN),
            (ClientFlags::MAXIMIZED_HORIZ, self._NET_WM_STATE_MAXIMIZED_HORZ),
            (ClientFlags::MAXIMIZED_VERT, self._NET_WM_STATE_MAXIMIZED_VERT),
            (ClientFlags::STICKY, self._NET_WM_STATE_STICKY),
            (ClientFlags::SKIP_TASKBAR, self._NET_WM_STATE_SKIP_TASKBAR),
            (ClientFlags::ABOVE, self._NET_WM_STATE_ABOVE),
            (ClientFlags::BELOW, self._NET_WM_STATE_BELOW),
            (ClientFlags::HIDDEN, self._NET_WM_STATE_HIDDEN),
            (ClientFlags::URGENT, self._NET_WM_STATE_DEMANDS_ATTENTION),
        ]
    }

    pub fn state_flag(&self, atom: Atom) -> Option<ClientFlags> {
        if atom == 0 {
            return None;
        }
        self.state_table()
            .into_iter()
            .find(|&(_, a)| a == atom)
            .map(|(flag, _)| flag)
    }

    /// `_NET_WM_STATE` list for a set of flags, in table order. An iconified
    /// client advertises `_NET_WM_STATE_HIDDEN` even when not hidden itself.
    pub fn encode_state(&self, flags: ClientFlags) -> Vec<Atom> {
        let mut flags = flags;
        if flags.contains(ClientFlags::MINIMIZED) {
            flags.insert(ClientFlags::HIDDEN);
        }
        self.state_table()
            .into_iter()
            .filter(|&(flag, _)| flags.contains(flag))
            .map(|(_, atom)| atom)
            .collect()
    }

    /// Flags named by a `_NET_WM_STATE` list; unknown atoms are skipped
    pub fn decode_state(&self, atoms: &[Atom]) -> ClientFlags {
        atoms
            .iter()
            .filter_map(|&atom| self.state_flag(atom))
            .fold(ClientFlags::empty(), |acc, flag| acc | flag)
    }

    pub fn window_type_atom(&self, window_type: WindowType) -> Atom {
        match window_type {
            WindowType::Normal => self._NET_WM_WINDOW_TYPE_NORMAL,
            WindowType::Desktop => self._NET_WM_WINDOW_TYPE_DESKTOP,
            WindowType::Dock => self._NET_WM_WINDOW_TYPE_DOCK,
            WindowType::Dialog => self._NET_WM_WINDOW_TYPE_DIALOG,
            WindowType::Toolbar => self._NET_WM_WINDOW_TYPE_TOOLBAR,
            WindowType::Menu => self._NET_WM_WINDOW_TYPE_MENU,
            WindowType::Utility => self._NET_WM_WINDOW_TYPE_UTILITY,
            WindowType::Splash => self._NET_WM_WINDOW_TYPE_SPLASH,
            WindowType::Notification => self._NET_WM_WINDOW_TYPE_NOTIFICATION,
            WindowType::DropdownMenu => self._NET_WM_WINDOW_TYPE_DROPDOWN_MENU,
            WindowType::PopupMenu => self._NET_WM_WINDOW_TYPE_POPUP_MENU,
            WindowType::Tooltip => self._NET_WM_WINDOW_TYPE_TOOLTIP,
            WindowType::Combo => self._NET_WM_WINDOW_TYPE_COMBO,
            WindowType::Dnd => self._NET_WM_WINDOW_TYPE_DND,
        }
    }

    /// First recognised entry of a `_NET_WM_WINDOW_TYPE` list wins
    pub fn window_type_from_atoms(&self, atoms: &[Atom]) -> WindowType {
        const TYPES: [WindowType; 14] = [
            WindowType::Normal,
            WindowType::Desktop,
            WindowType::Dock,
            WindowType::Dialog,
            WindowType::Toolbar,
            WindowType::Menu,
            WindowType::Utility,
            WindowType::Splash,
            WindowType::Notification,
            WindowType::DropdownMenu,
            WindowType::PopupMenu,
            WindowType::Tooltip,
            WindowType::Combo,
            WindowType::Dnd,
        ];
        atoms
            .iter()
            .find_map(|&atom| {
                TYPES
                    .into_iter()
                    .find(|&t| self.window_type_atom(t) == atom)
            })
            .unwrap_or(WindowType::Normal)
    }

    /// Table with fake sequential atom values
    #[cfg(test)]
    pub fn fake() -> Self {
        let mut next = 100;
        Self::resolve(|_| {
            next += 1;
            Ok(next)
        })
        .expect("fake atoms never fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_encoding_roundtrip() {
        let atoms = Atoms::fake();
        let flags = ClientFlags::FULLSCREEN | ClientFlags::ABOVE | ClientFlags::URGENT;
        let encoded = atoms.encode_state(flags);
        assert_eq!(encoded.len(), 3);
        assert_eq!(atoms.decode_state(&encoded), flags);
    }

    #[test]
    fn test_unmirrored_flags_are_not_encoded() {
        let atoms = Atoms::fake();
        assert!(atoms.encode_state(ClientFlags::ONTOP).is_empty());
        assert_eq!(atoms.decode_state(&[0, 1, 2]), ClientFlags::empty());
    }

    #[test]
    fn test_minimized_encodes_as_hidden() {
        let atoms = Atoms::fake();
        assert_eq!(
            atoms.encode_state(ClientFlags::MINIMIZED),
            vec![atoms._NET_WM_STATE_HIDDEN]
        );
        assert_eq!(
            atoms.encode_state(ClientFlags::MINIMIZED | ClientFlags::HIDDEN),
            vec![atoms._NET_WM_STATE_HIDDEN]
        );
    }

    #[test]
    fn test_window_type_first_known_wins() {
        let atoms = Atoms::fake();
        let list = [
            9999,
            atoms._NET_WM_WINDOW_TYPE_DOCK,
            atoms._NET_WM_WINDOW_TYPE_DIALOG,
        ];
        assert_eq!(atoms.window_type_from_atoms(&list), WindowType::Dock);
        assert_eq!(atoms.window_type_from_atoms(&[]), WindowType::Normal);
    }

    #[test]
    fn test_supported_only_lists_net_atoms() {
        let atoms = Atoms::fake();
        let supported = atoms.supported();
        assert!(supported.contains(&atoms._NET_WM_STATE_ABOVE));
        assert!(!supported.contains(&atoms.WM_DELETE_WINDOW));
        assert!(!supported.contains(&atoms.UTF8_STRING));
    }
}
