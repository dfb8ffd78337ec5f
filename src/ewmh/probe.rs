//! Initial properties of a bridged window, read once when it is managed

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::cookie::Cookie;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _, GetPropertyReply, Window};

use crate::ewmh::atoms::Atoms;
use crate::shared::Strut;
use crate::wm::client_flags::{ClientFlags, WindowType};

/// What a client had already set before it was mapped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialHints {
    pub window_type: WindowType,
    pub transient_for: Option<Window>,
    pub state: ClientFlags,
    /// `_NET_WM_DESKTOP`, may be `ALL_WORKSPACES`
    pub desktop: Option<u32>,
    pub strut: Option<Strut>,
    pub title: Option<String>,
}

/// Read the hints of `window`; missing properties keep their defaults
pub fn read_initial<C: Connection>(conn: &C, atoms: &Atoms, window: Window) -> Result<InitialHints> {
    let window_type = conn.get_property(
        false,
        window,
        atoms._NET_WM_WINDOW_TYPE,
        AtomEnum::ATOM,
        0,
        64,
    )?;
    let transient = conn.get_property(
        false,
        window,
        AtomEnum::WM_TRANSIENT_FOR,
        AtomEnum::WINDOW,
        0,
        1,
    )?;
    let state = conn.get_property(false, window, atoms._NET_WM_STATE, AtomEnum::ATOM, 0, 64)?;
    let desktop = conn.get_property(
        false,
        window,
        atoms._NET_WM_DESKTOP,
        AtomEnum::CARDINAL,
        0,
        1,
    )?;
    let strut_partial = conn.get_property(
        false,
        window,
        atoms._NET_WM_STRUT_PARTIAL,
        AtomEnum::CARDINAL,
        0,
        12,
    )?;
    let strut_legacy = conn.get_property(
        false,
        window,
        atoms._NET_WM_STRUT,
        AtomEnum::CARDINAL,
        0,
        4,
    )?;
    let title = request_title(conn, atoms, window)?;

    let mut hints = InitialHints::default();

    if let Ok(reply) = window_type.reply() {
        if let Some(values) = reply.value32() {
            hints.window_type = atoms.window_type_from_atoms(&values.collect::<Vec<_>>());
        }
    }
    if let Ok(reply) = transient.reply() {
        hints.transient_for = reply
            .value32()
            .and_then(|mut v| v.next())
            .filter(|&w| w != 0 && w != window);
    }
    if let Ok(reply) = state.reply() {
        if let Some(values) = reply.value32() {
            hints.state = atoms.decode_state(&values.collect::<Vec<_>>());
        }
    }
    if let Ok(reply) = desktop.reply() {
        hints.desktop = reply.value32().and_then(|mut v| v.next());
    }
    let cardinals = |reply: Option<GetPropertyReply>| -> Option<Vec<u32>> {
        reply.and_then(|r| r.value32().map(|v| v.collect()))
    };
    hints.strut = pick_strut(
        cardinals(strut_partial.reply().ok()).as_deref(),
        cardinals(strut_legacy.reply().ok()).as_deref(),
    );
    hints.title = title.reply().ok().and_then(|r| decode_title(&r.value));

    Ok(hints)
}

/// Re-read only `_NET_WM_NAME`, after a PropertyNotify
pub fn read_title<C: Connection>(conn: &C, atoms: &Atoms, window: Window) -> Result<Option<String>> {
    let reply = request_title(conn, atoms, window)?.reply()?;
    Ok(decode_title(&reply.value))
}

fn request_title<'c, C: Connection>(
    conn: &'c C,
    atoms: &Atoms,
    window: Window,
) -> Result<Cookie<'c, C, GetPropertyReply>> {
    Ok(conn.get_property(
        false,
        window,
        atoms._NET_WM_NAME,
        atoms.UTF8_STRING,
        0,
        1024,
    )?)
}

/// `_NET_WM_STRUT_PARTIAL` wins; legacy `_NET_WM_STRUT` is the fallback
fn pick_strut(partial: Option<&[u32]>, legacy: Option<&[u32]>) -> Option<Strut> {
    partial
        .and_then(Strut::from_cardinals)
        .or_else(|| legacy.and_then(Strut::from_cardinals))
}

fn decode_title(value: &[u8]) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_strut_used_without_partial() {
        let strut = pick_strut(None, Some(&[0, 0, 28, 0])).unwrap();
        assert_eq!(strut, Strut::edges(0, 0, 28, 0));
        assert_eq!(pick_strut(Some(&[]), Some(&[0, 0, 28, 0])), Some(strut));
        assert_eq!(pick_strut(None, None), None);
    }

    #[test]
    fn test_partial_strut_wins_over_legacy() {
        let partial = [0, 0, 24, 0, 0, 0, 0, 0, 0, 1919, 0, 0];
        let strut = pick_strut(Some(&partial), Some(&[0, 0, 40, 0])).unwrap();
        assert_eq!(strut.top, 24);
        assert_eq!(strut.top_end_x, 1919);
    }

    #[test]
    fn test_empty_title_is_none() {
        assert_eq!(decode_title(b""), None);
        assert_eq!(decode_title("caf\u{e9}".as_bytes()).as_deref(), Some("caf\u{e9}"));
    }
}
