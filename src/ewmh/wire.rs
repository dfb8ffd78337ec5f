//! Wire access for the bridge
//!
//! The bridge only ever replaces whole properties and sends client
//! messages, so that is all this trait exposes. `X11Link` is the x11rb
//! implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageEvent, ConnectionExt as _, CreateWindowAux, EventMask, PropMode,
    Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

/// A full property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Atoms(Vec<Atom>),
    Windows(Vec<Window>),
    Cardinals(Vec<u32>),
    /// NUL-separated UTF8_STRING list
    Utf8List(Vec<String>),
}

pub trait WireConn {
    fn replace_property(&self, window: Window, property: Atom, value: &PropertyValue) -> Result<()>;

    fn delete_property(&self, window: Window, property: Atom) -> Result<()>;

    /// 32-bit client message delivered to `window` itself
    fn send_client_message(&self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// x11rb connection plus the atom used for UTF-8 string lists
pub struct X11Link {
    conn: Arc<RustConnection>,
    utf8_string: Atom,
}

impl X11Link {
    pub fn new(conn: Arc<RustConnection>, utf8_string: Atom) -> Self {
        Self { conn, utf8_string }
    }

    /// Create the invisible child window used for `_NET_SUPPORTING_WM_CHECK`
    pub fn create_check_window(&self, root: Window) -> Result<Window> {
        let window = self.conn.generate_id()?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                root,
                -1,
                -1,
                1,
                1,
                0,
                WindowClass::INPUT_ONLY,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new(),
            )?
            .check()
            .context("Failed to create supporting WM check window")?;
        Ok(window)
    }
}

impl std::fmt::Debug for X11Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X11Link")
            .field("utf8_string", &self.utf8_string)
            .finish_non_exhaustive()
    }
}

impl WireConn for X11Link {
    fn replace_property(&self, window: Window, property: Atom, value: &PropertyValue) -> Result<()> {
        match value {
            PropertyValue::Atoms(atoms) => {
                self.conn
                    .change_property32(PropMode::REPLACE, window, property, AtomEnum::ATOM, atoms)?;
            }
            PropertyValue::Windows(windows) => {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    window,
                    property,
                    AtomEnum::WINDOW,
                    windows,
                )?;
            }
            PropertyValue::Cardinals(values) => {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    window,
                    property,
                    AtomEnum::CARDINAL,
                    values,
                )?;
            }
            PropertyValue::Utf8List(strings) => {
                let mut data = Vec::new();
                for s in strings {
                    data.extend_from_slice(s.as_bytes());
                    data.push(0);
                }
                self.conn.change_property8(
                    PropMode::REPLACE,
                    window,
                    property,
                    self.utf8_string,
                    &data,
                )?;
            }
        }
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn send_client_message(&self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn
            .send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

/// In-memory wire that keeps the last value of every property
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingConn {
    pub properties: std::cell::RefCell<std::collections::HashMap<(Window, Atom), PropertyValue>>,
    pub messages: std::cell::RefCell<Vec<(Window, Atom, [u32; 5])>>,
    pub writes: std::cell::Cell<usize>,
}

#[cfg(test)]
impl RecordingConn {
    pub fn get(&self, window: Window, property: Atom) -> Option<PropertyValue> {
        self.properties.borrow().get(&(window, property)).cloned()
    }
}

#[cfg(test)]
impl WireConn for std::rc::Rc<RecordingConn> {
    fn replace_property(&self, window: Window, property: Atom, value: &PropertyValue) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.properties
            .borrow_mut()
            .insert((window, property), value.clone());
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.properties.borrow_mut().remove(&(window, property));
        Ok(())
    }

    fn send_client_message(&self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()> {
        self.messages.borrow_mut().push((window, message_type, data));
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
