//! Window Manager Module
//!
//! Owns the canonical client state and drives the stacking engine and the
//! EWMH bridge from it. Every mutation goes through a setter here; the
//! setter updates the record, emits a signal, and the built-in reactions
//! (dirty marking, mirroring) run before user subscribers.

pub mod client;
pub mod client_flags;
pub mod decor;
pub mod focus;
pub mod layer;
pub mod signals;
pub mod stack;
pub mod stacking;
pub mod transients;
pub mod workspace;

use std::collections::HashMap;

use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ewmh::probe::InitialHints;
use crate::ewmh::{Bridge, BridgeRequest};
use crate::scene::{NodeId, SceneError, SceneGraph, SceneLayer, SceneTree};
use crate::shared::{Geometry, Strut};
use crate::wm::client::{Client, ClientId, ClientKind};
use crate::wm::client_flags::{ClientFlags, WindowLayer, WindowType};
use crate::wm::decor::{DecorId, DecorSurface};
use crate::wm::focus::FocusState;
use crate::wm::signals::{Notifier, Property, Signal, SignalEvent, Subscription};
use crate::wm::stack::StackArray;
use crate::wm::stacking::{StackingEngine, StackingView};
use crate::wm::workspace::{ALL_WORKSPACES, Desktops};

pub struct WindowManager<S: SceneGraph = SceneTree> {
    scene: S,
    clients: SlotMap<ClientId, Client>,
    /// Manage order, for `_NET_CLIENT_LIST`
    managed: Vec<ClientId>,
    /// Bridged X window -> client
    windows: HashMap<u32, ClientId>,
    stack: StackArray,
    engine: StackingEngine,
    focus: FocusState,
    desktops: Desktops,
    decors: SlotMap<DecorId, DecorSurface>,
    /// Bottom to top
    decor_order: Vec<DecorId>,
    notifier: Notifier,
    bridge: Bridge,
    raise_on_focus: bool,
}

impl<S: SceneGraph> WindowManager<S> {
    /// Create the layer containers in `scene` and publish the desktop layout
    pub fn new(mut scene: S, config: &Config, mut bridge: Bridge) -> Result<Self, SceneError> {
        let layers = crate::scene::SceneLayers::create(&mut scene)?;
        let desktops = Desktops::new(config.desktops.count, &config.desktops.names);

        bridge.set_desktops(desktops.names());
        bridge.set_current_desktop(desktops.current());
        bridge.set_client_list(Vec::new());
        bridge.set_stacking_list(Vec::new());
        bridge.set_active(None);

        info!(
            "Window manager ready: {} desktops, bridge {}",
            desktops.count(),
            if bridge.is_active() { "active" } else { "absent" }
        );

        Ok(Self {
            scene,
            clients: SlotMap::with_key(),
            managed: Vec::new(),
            windows: HashMap::new(),
            stack: StackArray::new(),
            engine: StackingEngine::new(layers),
            focus: FocusState::new(),
            desktops,
            decors: SlotMap::with_key(),
            decor_order: Vec::new(),
            notifier: Notifier::new(),
            bridge,
            raise_on_focus: config.focus.raise_on_focus,
        })
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Bridged windows paired with whether their scene node is enabled
    pub fn bridged_visibility(&self) -> Vec<(u32, bool)> {
        self.clients
            .values()
            .filter_map(|c| {
                let window = c.kind.protocol_window()?;
                Some((window, self.scene.is_enabled(c.node).unwrap_or(true)))
            })
            .collect()
    }

    pub fn client_for_window(&self, window: u32) -> Option<ClientId> {
        self.windows.get(&window).copied()
    }

    pub fn stack(&self) -> &StackArray {
        &self.stack
    }

    pub fn focused(&self) -> Option<ClientId> {
        self.focus.focused()
    }

    pub fn desktops(&self) -> &Desktops {
        &self.desktops
    }

    pub fn decor(&self, id: DecorId) -> Option<&DecorSurface> {
        self.decors.get(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    /// Container node of a scene layer
    pub fn layer_container(&self, layer: SceneLayer) -> NodeId {
        self.engine.layers().container(layer)
    }

    /// Layer the classifier assigns right now
    pub fn layer_of(&self, id: ClientId) -> Option<WindowLayer> {
        self.clients
            .get(id)
            .map(|c| layer::classify(c, self.focus.focused()))
    }

    pub fn subscribe<F>(&mut self, signal: Signal, handler: F) -> Subscription
    where
        F: FnMut(&SignalEvent) + 'static,
    {
        self.notifier.connect(signal, handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.notifier.disconnect(subscription)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Start managing a surface; it goes on top of the Stack Array with
    /// default attributes on the current desktop
    pub fn manage(&mut self, kind: ClientKind) -> Result<ClientId, SceneError> {
        if let Some(window) = kind.protocol_window() {
            if let Some(&existing) = self.windows.get(&window) {
                debug!("WM: window {} already managed", window);
                return Ok(existing);
            }
        }

        let node = self
            .scene
            .create_node(self.engine.layers().container(SceneLayer::Normal))?;
        let desktop = self.desktops.current();
        let id = self
            .clients
            .insert_with_key(|id| Client::new(id, kind, node, desktop));
        self.managed.push(id);
        self.stack.push_top(id);

        if let Some(window) = kind.protocol_window() {
            self.windows.insert(window, id);
            self.bridge.mirror_state(window, ClientFlags::empty());
            self.bridge.mirror_desktop(window, desktop, false);
        }
        self.push_client_list();

        info!("WM: managing {:?} as {:?}", kind, id);
        self.emit(Signal::Manage, id);
        Ok(id)
    }

    /// Manage a bridged window and apply what it had already set
    pub fn manage_bridged(&mut self, window: u32, hints: &InitialHints) -> Result<ClientId, SceneError> {
        let id = self.manage(ClientKind::Bridged { window })?;

        self.set_type(id, hints.window_type);
        if let Some(parent) = hints.transient_for.and_then(|w| self.client_for_window(w)) {
            self.set_transient_for(id, Some(parent));
        }
        for flag in hints.state.iter() {
            self.set_flag(id, flag, true);
        }
        match hints.desktop {
            Some(ALL_WORKSPACES) => {
                self.set_sticky(id, true);
            }
            Some(desktop) => {
                self.set_desktop(id, desktop);
            }
            None => {}
        }
        if let Some(strut) = hints.strut {
            self.set_strut(id, strut);
        }
        if let Some(title) = &hints.title {
            self.set_title(id, title);
        }
        Ok(id)
    }

    /// Stop managing a client. Its transients are re-attached to the next
    /// living ancestor, or left without one.
    pub fn unmanage(&mut self, id: ClientId) {
        if !self.clients.contains_key(id) {
            debug!("WM: unmanage of unknown client {:?}", id);
            return;
        }
        self.emit(Signal::Unmanage, id);

        let Some(client) = self.clients.remove(id) else {
            return;
        };
        let was_focused = self.focus.focused() == Some(id);
        self.stack.remove(id);
        self.managed.retain(|&c| c != id);
        self.focus.forget(id);
        if let Some(window) = client.kind.protocol_window() {
            self.windows.remove(&window);
        }
        if let Err(e) = self.scene.destroy_node(client.node) {
            warn!("WM: failed to destroy node of {:?}: {}", id, e);
        }

        let orphans: Vec<ClientId> = self
            .stack
            .iter()
            .filter(|&c| self.clients.get(c).and_then(|c| c.transient_for) == Some(id))
            .collect();
        for orphan in orphans {
            if let Some(c) = self.clients.get_mut(orphan) {
                c.transient_for = client.transient_for;
            }
            debug!(
                "WM: {:?} re-attached to {:?}",
                orphan, client.transient_for
            );
            self.emit(Signal::Property(Property::TransientFor), orphan);
        }

        info!("WM: unmanaged {:?}", id);
        self.engine.mark_dirty();
        self.push_client_list();

        if was_focused {
            let current = self.desktops.current();
            let next = self.focus.fallback(|c| {
                self.clients
                    .get(c)
                    .is_some_and(|c| c.is_visible_on(current))
            });
            self.focus(next);
            if next.is_none() {
                self.bridge.set_active(None);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Attribute setters. Each returns whether the value changed; an
    // unchanged value emits nothing.
    // ---------------------------------------------------------------------

    fn set_flag(&mut self, id: ClientId, flag: ClientFlags, value: bool) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            debug!("WM: {:?} on unknown client {:?}", flag, id);
            return false;
        };
        if client.flags.contains(flag) == value {
            return false;
        }
        client.flags.set(flag, value);
        if let Some(property) = Property::from_flag(flag) {
            self.emit(Signal::Property(property), id);
        }
        true
    }

    pub fn set_ontop(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::ONTOP, value)
    }

    pub fn set_above(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::ABOVE, value)
    }

    pub fn set_below(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::BELOW, value)
    }

    pub fn set_fullscreen(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::FULLSCREEN, value)
    }

    pub fn set_sticky(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::STICKY, value)
    }

    pub fn set_modal(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::MODAL, value)
    }

    pub fn set_minimized(&mut self, id: ClientId, value: bool) -> bool {
        let changed = self.set_flag(id, ClientFlags::MINIMIZED, value);
        if changed && value && self.focus.focused() == Some(id) {
            self.focus(None);
        }
        changed
    }

    pub fn set_hidden(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::HIDDEN, value)
    }

    pub fn set_skip_taskbar(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::SKIP_TASKBAR, value)
    }

    pub fn set_maximized_horizontal(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::MAXIMIZED_HORIZ, value)
    }

    pub fn set_maximized_vertical(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::MAXIMIZED_VERT, value)
    }

    /// Both axes at once; each axis emits its own signal
    pub fn set_maximized(&mut self, id: ClientId, value: bool) -> bool {
        let horizontal = self.set_maximized_horizontal(id, value);
        let vertical = self.set_maximized_vertical(id, value);
        horizontal || vertical
    }

    pub fn set_urgent(&mut self, id: ClientId, value: bool) -> bool {
        self.set_flag(id, ClientFlags::URGENT, value)
    }

    pub fn set_type(&mut self, id: ClientId, window_type: WindowType) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.window_type == window_type {
            return false;
        }
        client.window_type = window_type;
        self.emit(Signal::Property(Property::Type), id);
        true
    }

    /// Rejected when `parent` is unknown, is `id` itself, or would close a
    /// cycle
    pub fn set_transient_for(&mut self, id: ClientId, parent: Option<ClientId>) -> bool {
        let Some(current) = self.clients.get(id).map(|c| c.transient_for) else {
            return false;
        };
        if current == parent {
            return false;
        }
        if let Some(parent) = parent {
            if !self.clients.contains_key(parent)
                || transients::would_cycle(&self.clients, id, parent)
            {
                debug!("WM: rejected transient {:?} -> {:?}", id, parent);
                return false;
            }
        }
        if let Some(client) = self.clients.get_mut(id) {
            client.transient_for = parent;
        }
        self.emit(Signal::Property(Property::TransientFor), id);
        true
    }

    /// `ALL_WORKSPACES` makes the client sticky instead
    pub fn set_desktop(&mut self, id: ClientId, desktop: u32) -> bool {
        if desktop == ALL_WORKSPACES {
            return self.set_sticky(id, true);
        }
        if !self.desktops.is_valid(desktop) {
            debug!("WM: desktop {} out of range for {:?}", desktop, id);
            return false;
        }
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.desktop == desktop {
            return false;
        }
        client.desktop = desktop;
        self.emit(Signal::Property(Property::Desktop), id);

        let current = self.desktops.current();
        if self.focus.focused() == Some(id)
            && !self.clients.get(id).is_some_and(|c| c.is_visible_on(current))
        {
            self.focus(None);
        }
        true
    }

    pub fn set_strut(&mut self, id: ClientId, strut: Strut) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.strut == strut {
            return false;
        }
        client.strut = strut;
        self.emit(Signal::Property(Property::Strut), id);
        true
    }

    pub fn set_geometry(&mut self, id: ClientId, geometry: Geometry) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.geometry == geometry {
            return false;
        }
        client.geometry = geometry;
        self.emit(Signal::Property(Property::Geometry), id);
        true
    }

    pub fn set_title(&mut self, id: ClientId, title: &str) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.title == title {
            return false;
        }
        client.title = title.to_string();
        self.emit(Signal::Property(Property::Title), id);
        true
    }

    // ---------------------------------------------------------------------
    // Focus and order
    // ---------------------------------------------------------------------

    /// Move input focus; `None` clears it
    pub fn focus(&mut self, target: Option<ClientId>) {
        if let Some(id) = target {
            if !self.clients.contains_key(id) {
                debug!("WM: focus on unknown client {:?}", id);
                return;
            }
        }
        let Some(previous) = self.focus.set(target) else {
            return;
        };

        let active = target
            .and_then(|id| self.clients.get(id))
            .and_then(|c| c.kind.protocol_window());
        self.bridge.set_active(active);

        if let Some(previous) = previous.filter(|&p| self.clients.contains_key(p)) {
            self.emit(Signal::Unfocus, previous);
        }
        if let Some(id) = target {
            self.emit(Signal::Focus, id);
        }
    }

    /// Bring a client forward: un-minimize, show its desktop, focus, and
    /// raise when configured to
    pub fn activate(&mut self, id: ClientId) {
        let Some(client) = self.clients.get(id) else {
            debug!("WM: activate on unknown client {:?}", id);
            return;
        };
        let desktop = (!client.is_sticky()).then_some(client.desktop);

        self.set_minimized(id, false);
        if let Some(desktop) = desktop {
            self.view_desktop(desktop);
        }
        self.focus(Some(id));
        if self.raise_on_focus {
            self.raise(id);
        }
    }

    pub fn raise(&mut self, id: ClientId) {
        if !self.stack.contains(id) || self.stack.is_top(id) {
            return;
        }
        self.stack.push_top(id);
        self.emit(Signal::Raised, id);
    }

    pub fn lower(&mut self, id: ClientId) {
        if !self.stack.contains(id) || self.stack.is_bottom(id) {
            return;
        }
        self.stack.push_bottom(id);
        self.emit(Signal::Lowered, id);
    }

    /// Politely ask a client to close
    pub fn close(&mut self, id: ClientId) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        match client.kind.protocol_window() {
            Some(window) if self.bridge.is_active() => {
                info!("WM: closing window {}", window);
                self.bridge.send_delete(window);
            }
            _ => self.emit(Signal::RequestClose, id),
        }
    }

    /// Show another desktop; focus leaves clients that are no longer shown
    pub fn view_desktop(&mut self, index: u32) -> bool {
        if !self.desktops.view(index) {
            return false;
        }
        debug!("WM: viewing desktop {}", index);
        self.engine.mark_dirty();
        self.bridge.set_current_desktop(index);

        let focused_visible = self
            .focus
            .focused()
            .and_then(|id| self.clients.get(id))
            .is_some_and(|c| c.is_visible_on(index));
        if !focused_visible {
            let next = self.focus.fallback(|c| {
                self.clients
                    .get(c)
                    .is_some_and(|c| c.is_visible_on(index))
            });
            self.focus(next);
        }
        true
    }

    // ---------------------------------------------------------------------
    // Inbound EWMH requests
    // ---------------------------------------------------------------------

    /// Apply a decoded client message through the same setters
    pub fn handle_request(&mut self, request: BridgeRequest) {
        debug!("WM: bridge request {:?}", request);
        match request {
            BridgeRequest::ActiveWindow { window } => {
                if let Some(id) = self.request_target(window) {
                    self.activate(id);
                }
            }
            BridgeRequest::CloseWindow { window } => {
                if let Some(id) = self.request_target(window) {
                    self.close(id);
                }
            }
            BridgeRequest::WmState {
                window,
                action,
                flags,
            } => {
                let Some(id) = self.request_target(window) else {
                    return;
                };
                for flag in flags {
                    let current = self.clients.get(id).is_some_and(|c| c.has(flag));
                    self.set_flag(id, flag, action.apply(current));
                }
            }
            BridgeRequest::CurrentDesktop { desktop } => {
                self.view_desktop(desktop);
            }
            BridgeRequest::WmDesktop { window, desktop } => {
                let Some(id) = self.request_target(window) else {
                    return;
                };
                if desktop == ALL_WORKSPACES {
                    self.set_sticky(id, true);
                } else if self.desktops.is_valid(desktop) {
                    self.set_sticky(id, false);
                    self.set_desktop(id, desktop);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Decoration surfaces
    // ---------------------------------------------------------------------

    pub fn add_decor(&mut self, window_type: WindowType) -> Result<DecorId, SceneError> {
        let node = self
            .scene
            .create_node(self.engine.layers().container(SceneLayer::Decor))?;
        let id = self
            .decors
            .insert_with_key(|id| DecorSurface::new(id, node, window_type));
        self.decor_order.push(id);
        self.engine.mark_dirty();
        Ok(id)
    }

    pub fn remove_decor(&mut self, id: DecorId) {
        let Some(decor) = self.decors.remove(id) else {
            return;
        };
        self.decor_order.retain(|&d| d != id);
        if let Err(e) = self.scene.destroy_node(decor.node) {
            warn!("WM: failed to destroy decor node: {}", e);
        }
        self.engine.mark_dirty();
    }

    pub fn set_decor_ontop(&mut self, id: DecorId, ontop: bool) {
        if let Some(decor) = self.decors.get_mut(id) {
            if decor.ontop != ontop {
                decor.ontop = ontop;
                self.engine.mark_dirty();
            }
        }
    }

    pub fn set_decor_visible(&mut self, id: DecorId, visible: bool) {
        if let Some(decor) = self.decors.get_mut(id) {
            if decor.visible != visible {
                decor.visible = visible;
                self.engine.mark_dirty();
            }
        }
    }

    /// Move a surface to the top of its layer
    pub fn raise_decor(&mut self, id: DecorId) {
        if self.decors.contains_key(id) && self.decor_order.last() != Some(&id) {
            self.decor_order.retain(|&d| d != id);
            self.decor_order.push(id);
            self.engine.mark_dirty();
        }
    }

    // ---------------------------------------------------------------------
    // Refresh
    // ---------------------------------------------------------------------

    /// Once per event-loop turn: restack if needed, then publish the
    /// stacking-ordered client list. Returns the scene calls issued.
    pub fn refresh(&mut self) -> usize {
        let was_dirty = self.engine.is_dirty();
        let view = StackingView {
            clients: &self.clients,
            stack: &self.stack,
            decors: &self.decors,
            decor_order: &self.decor_order,
            focused: self.focus.focused(),
            current_desktop: self.desktops.current(),
        };
        let calls = match self.engine.refresh(&mut self.scene, view) {
            Ok(calls) => calls,
            Err(e) => {
                warn!("WM: stacking pass failed, previous order kept: {}", e);
                0
            }
        };
        if was_dirty {
            let stacking = self.bridged_windows(self.stack.iter());
            self.bridge.set_stacking_list(stacking);
        }
        self.bridge.flush();
        calls
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn emit(&mut self, signal: Signal, id: ClientId) {
        match signal {
            Signal::Property(property) => {
                if property.affects_stacking() {
                    self.engine.mark_dirty();
                }
                self.mirror(property, id);
            }
            Signal::Manage
            | Signal::Unmanage
            | Signal::Raised
            | Signal::Lowered
            | Signal::Focus
            | Signal::Unfocus => self.engine.mark_dirty(),
            Signal::RequestClose => {}
        }
        self.notifier.emit(signal, id);
    }

    /// Push one changed attribute to the bridge
    fn mirror(&self, property: Property, id: ClientId) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let Some(window) = client.kind.protocol_window() else {
            return;
        };
        match property {
            Property::Type => self.bridge.mirror_type(window, client.window_type),
            Property::Desktop => {
                self.bridge
                    .mirror_desktop(window, client.desktop, client.is_sticky())
            }
            Property::Strut => self.bridge.mirror_strut(window, &client.strut),
            Property::Title => self.bridge.mirror_title(window, &client.title),
            Property::TransientFor | Property::Geometry => {}
            _ => {
                let Some(flag) = property.flag() else {
                    return;
                };
                if ClientFlags::mirrored().contains(flag) {
                    self.bridge.mirror_state(window, client.flags);
                }
                if flag == ClientFlags::STICKY {
                    self.bridge
                        .mirror_desktop(window, client.desktop, client.is_sticky());
                }
            }
        }
    }

    fn request_target(&self, window: u32) -> Option<ClientId> {
        let id = self.windows.get(&window).copied();
        if id.is_none() {
            debug!("WM: request for unmanaged window {}", window);
        }
        id
    }

    fn bridged_windows(&self, ids: impl Iterator<Item = ClientId>) -> Vec<u32> {
        ids.filter_map(|id| self.clients.get(id))
            .filter_map(|c| c.kind.protocol_window())
            .collect()
    }

    fn push_client_list(&mut self) {
        let list = self.bridged_windows(self.managed.iter().copied());
        self.bridge.set_client_list(list);
    }
}

impl<S: SceneGraph> std::fmt::Debug for WindowManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("clients", &self.clients.len())
            .field("stack", &self.stack)
            .field("focused", &self.focus.focused())
            .field("desktops", &self.desktops)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ewmh::atoms::Atoms;
    use crate::ewmh::requests::{self, StateAction};
    use crate::ewmh::wire::{PropertyValue, RecordingConn};
    use std::cell::RefCell;
    use std::rc::Rc;

    const ROOT: u32 = 1;

    fn headless() -> WindowManager {
        WindowManager::new(SceneTree::new(), &Config::default(), Bridge::absent()).unwrap()
    }

    fn bridged() -> (WindowManager, Rc<RecordingConn>, Atoms) {
        let wire = Rc::new(RecordingConn::default());
        let bridge = Bridge::new(Box::new(wire.clone()), Atoms::fake(), ROOT);
        let wm = WindowManager::new(SceneTree::new(), &Config::default(), bridge).unwrap();
        (wm, wire, Atoms::fake())
    }

    fn native(wm: &mut WindowManager, surface: u64) -> ClientId {
        wm.manage(ClientKind::Native { surface }).unwrap()
    }

    fn node(wm: &WindowManager, id: ClientId) -> NodeId {
        wm.client(id).unwrap().node
    }

    fn recorded(wm: &mut WindowManager) -> Rc<RefCell<Vec<Signal>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for property in Property::ALL {
            let sink = log.clone();
            wm.subscribe(Signal::Property(property), move |e| {
                sink.borrow_mut().push(e.signal)
            });
        }
        log
    }

    #[test]
    fn test_manage_and_unmanage_keep_stack_unique() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        wm.raise(a);
        wm.lower(a);
        wm.raise(a);
        assert_eq!(wm.stack().as_slice(), &[b, a]);
        wm.unmanage(a);
        wm.unmanage(a);
        assert_eq!(wm.stack().as_slice(), &[b]);
        assert!(wm.client(a).is_none());
    }

    #[test]
    fn test_transient_scenario_places_child_above_ancestor() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        assert!(wm.set_transient_for(b, Some(a)));
        wm.refresh();

        let normal = wm.layer_container(SceneLayer::Normal);
        assert_eq!(wm.scene().children(normal), &[node(&wm, a), node(&wm, b)]);
        assert_eq!(wm.layer_of(b), Some(WindowLayer::Ignore));
    }

    #[test]
    fn test_transient_follows_raised_ancestor_layer() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        let c = native(&mut wm, 3);
        wm.set_transient_for(b, Some(a));
        wm.set_transient_for(c, Some(b));
        wm.set_above(a, true);
        wm.refresh();

        let above = wm.layer_container(SceneLayer::Above);
        assert_eq!(
            wm.scene().children(above),
            &[node(&wm, a), node(&wm, b), node(&wm, c)]
        );
        assert!(wm.scene().is_descendant(node(&wm, c), above));
    }

    #[test]
    fn test_transient_cycle_rejected() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        assert!(wm.set_transient_for(b, Some(a)));
        assert!(!wm.set_transient_for(a, Some(b)));
        assert!(!wm.set_transient_for(a, Some(a)));
        assert_eq!(wm.client(a).unwrap().transient_for, None);
    }

    #[test]
    fn test_unmanage_reattaches_transients() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        let c = native(&mut wm, 3);
        wm.set_transient_for(b, Some(a));
        wm.set_transient_for(c, Some(b));
        wm.refresh();

        wm.unmanage(b);
        assert_eq!(wm.client(c).unwrap().transient_for, Some(a));
        wm.unmanage(a);
        assert_eq!(wm.client(c).unwrap().transient_for, None);
        assert_eq!(wm.layer_of(c), Some(WindowLayer::Normal));

        wm.refresh();
        let normal = wm.layer_container(SceneLayer::Normal);
        assert_eq!(wm.scene().children(normal), &[node(&wm, c)]);
    }

    #[test]
    fn test_setters_are_idempotent() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let log = recorded(&mut wm);

        assert!(wm.set_sticky(a, true));
        assert!(!wm.set_sticky(a, true));
        assert!(!wm.set_title(a, ""));
        assert!(wm.set_title(a, "term"));
        assert!(!wm.set_title(a, "term"));
        assert_eq!(
            log.borrow().as_slice(),
            &[
                Signal::Property(Property::Sticky),
                Signal::Property(Property::Title)
            ]
        );
    }

    #[test]
    fn test_refresh_twice_issues_no_calls() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        wm.set_ontop(a, true);
        wm.set_transient_for(b, Some(a));
        assert!(wm.refresh() > 0);

        let before = wm.scene().mutations();
        assert_eq!(wm.refresh(), 0);
        wm.set_title(a, "no stacking effect");
        assert!(!wm.is_dirty());
        assert_eq!(wm.refresh(), 0);
        assert_eq!(wm.scene().mutations(), before);
    }

    #[test]
    fn test_ontop_and_below_set_separately() {
        let mut wm = headless();
        let c = native(&mut wm, 1);
        wm.set_ontop(c, true);
        wm.set_below(c, true);
        assert_eq!(wm.layer_of(c), Some(WindowLayer::Ontop));
        wm.refresh();
        let ontop = wm.layer_container(SceneLayer::Ontop);
        assert_eq!(wm.scene().parent(node(&wm, c)), Some(ontop));
    }

    #[test]
    fn test_inbound_fullscreen_waits_for_focus() {
        let (mut wm, _wire, atoms) = bridged();
        let other = native(&mut wm, 1);
        let d = wm
            .manage_bridged(0x400001, &InitialHints::default())
            .unwrap();
        wm.focus(Some(other));

        let request = requests::decode(
            &atoms,
            0x400001,
            atoms._NET_WM_STATE,
            32,
            [1, atoms._NET_WM_STATE_FULLSCREEN, 0, 0, 0],
        )
        .unwrap();
        wm.handle_request(request);

        assert!(wm.client(d).unwrap().is_fullscreen());
        assert_eq!(wm.layer_of(d), Some(WindowLayer::Normal));
        wm.refresh();
        let normal = wm.layer_container(SceneLayer::Normal);
        assert_eq!(wm.scene().parent(node(&wm, d)), Some(normal));

        wm.focus(Some(d));
        assert_eq!(wm.layer_of(d), Some(WindowLayer::Fullscreen));
        wm.refresh();
        let fullscreen = wm.layer_container(SceneLayer::Fullscreen);
        assert_eq!(wm.scene().parent(node(&wm, d)), Some(fullscreen));
    }

    #[test]
    fn test_setter_mirrors_full_state() {
        let (mut wm, wire, atoms) = bridged();
        let d = wm.manage_bridged(7, &InitialHints::default()).unwrap();

        wm.set_above(d, true);
        wm.set_urgent(d, true);
        let Some(PropertyValue::Atoms(state)) = wire.get(7, atoms._NET_WM_STATE) else {
            panic!("state not mirrored");
        };
        assert_eq!(
            atoms.decode_state(&state),
            ClientFlags::ABOVE | ClientFlags::URGENT
        );

        wm.set_above(d, false);
        assert_eq!(
            wire.get(7, atoms._NET_WM_STATE),
            Some(PropertyValue::Atoms(vec![atoms._NET_WM_STATE_DEMANDS_ATTENTION]))
        );
    }

    #[test]
    fn test_minimized_client_advertises_hidden() {
        let (mut wm, wire, atoms) = bridged();
        let d = wm.manage_bridged(7, &InitialHints::default()).unwrap();

        wm.set_minimized(d, true);
        assert_eq!(
            wire.get(7, atoms._NET_WM_STATE),
            Some(PropertyValue::Atoms(vec![atoms._NET_WM_STATE_HIDDEN]))
        );
        wm.set_minimized(d, false);
        assert_eq!(
            wire.get(7, atoms._NET_WM_STATE),
            Some(PropertyValue::Atoms(vec![]))
        );
    }

    #[test]
    fn test_desktop_switch_changes_bridged_visibility() {
        let (mut wm, _wire, _atoms) = bridged();
        let here = wm.manage_bridged(7, &InitialHints::default()).unwrap();
        let there = wm.manage_bridged(8, &InitialHints::default()).unwrap();
        wm.set_desktop(there, 1);
        wm.refresh();
        let mut visible = wm.bridged_visibility();
        visible.sort();
        assert_eq!(visible, vec![(7, true), (8, false)]);

        wm.handle_request(BridgeRequest::CurrentDesktop { desktop: 1 });
        wm.set_minimized(here, true);
        wm.refresh();
        let mut visible = wm.bridged_visibility();
        visible.sort();
        assert_eq!(visible, vec![(7, false), (8, true)]);
    }

    #[test]
    fn test_request_equals_direct_setter() {
        let (mut wm, wire, atoms) = bridged();
        let via_request = wm.manage_bridged(10, &InitialHints::default()).unwrap();
        let via_setter = wm.manage_bridged(11, &InitialHints::default()).unwrap();

        wm.handle_request(BridgeRequest::WmState {
            window: 10,
            action: StateAction::Toggle,
            flags: vec![ClientFlags::MAXIMIZED_HORIZ, ClientFlags::MAXIMIZED_VERT],
        });
        wm.set_maximized(via_setter, true);

        let a = wm.client(via_request).unwrap().flags;
        let b = wm.client(via_setter).unwrap().flags;
        assert_eq!(a, b);
        assert_eq!(
            wire.get(10, atoms._NET_WM_STATE),
            wire.get(11, atoms._NET_WM_STATE)
        );

        wm.handle_request(BridgeRequest::WmState {
            window: 10,
            action: StateAction::Toggle,
            flags: vec![ClientFlags::MAXIMIZED_HORIZ],
        });
        assert!(!wm.client(via_request).unwrap().has(ClientFlags::MAXIMIZED_HORIZ));
    }

    #[test]
    fn test_redundant_request_writes_nothing() {
        let (mut wm, wire, _atoms) = bridged();
        let d = wm.manage_bridged(10, &InitialHints::default()).unwrap();
        wm.set_below(d, true);
        let writes = wire.writes.get();
        wm.handle_request(BridgeRequest::WmState {
            window: 10,
            action: StateAction::Add,
            flags: vec![ClientFlags::BELOW],
        });
        assert_eq!(wire.writes.get(), writes);
    }

    #[test]
    fn test_aggregate_lists() {
        let (mut wm, wire, atoms) = bridged();
        let a = wm.manage_bridged(20, &InitialHints::default()).unwrap();
        let _native = native(&mut wm, 1);
        let b = wm.manage_bridged(21, &InitialHints::default()).unwrap();
        wm.lower(b);
        wm.focus(Some(a));
        wm.refresh();

        assert_eq!(
            wire.get(ROOT, atoms._NET_CLIENT_LIST),
            Some(PropertyValue::Windows(vec![20, 21]))
        );
        assert_eq!(
            wire.get(ROOT, atoms._NET_CLIENT_LIST_STACKING),
            Some(PropertyValue::Windows(vec![21, 20]))
        );
        assert_eq!(
            wire.get(ROOT, atoms._NET_ACTIVE_WINDOW),
            Some(PropertyValue::Windows(vec![20]))
        );

        wm.unmanage(a);
        assert_eq!(
            wire.get(ROOT, atoms._NET_CLIENT_LIST),
            Some(PropertyValue::Windows(vec![21]))
        );
    }

    #[test]
    fn test_initial_hints_applied_on_manage() {
        let (mut wm, wire, atoms) = bridged();
        let parent = wm.manage_bridged(30, &InitialHints::default()).unwrap();
        let hints = InitialHints {
            window_type: WindowType::Dialog,
            transient_for: Some(30),
            state: ClientFlags::MODAL | ClientFlags::SKIP_TASKBAR,
            desktop: Some(ALL_WORKSPACES),
            strut: None,
            title: Some("Save as".to_string()),
        };
        let dialog = wm.manage_bridged(31, &hints).unwrap();

        let client = wm.client(dialog).unwrap();
        assert_eq!(client.window_type, WindowType::Dialog);
        assert_eq!(client.transient_for, Some(parent));
        assert!(client.is_sticky());
        assert!(client.has(ClientFlags::MODAL | ClientFlags::SKIP_TASKBAR));
        assert_eq!(client.title, "Save as");
        assert_eq!(
            wire.get(31, atoms._NET_WM_DESKTOP),
            Some(PropertyValue::Cardinals(vec![ALL_WORKSPACES]))
        );
    }

    #[test]
    fn test_desktop_requests_and_visibility() {
        let (mut wm, wire, atoms) = bridged();
        let d = wm.manage_bridged(40, &InitialHints::default()).unwrap();
        wm.handle_request(BridgeRequest::WmDesktop {
            window: 40,
            desktop: 2,
        });
        assert_eq!(wm.client(d).unwrap().desktop, 2);
        wm.refresh();
        assert_eq!(wm.scene().is_enabled(node(&wm, d)), Some(false));

        wm.handle_request(BridgeRequest::CurrentDesktop { desktop: 2 });
        assert_eq!(wm.desktops().current(), 2);
        assert_eq!(
            wire.get(ROOT, atoms._NET_CURRENT_DESKTOP),
            Some(PropertyValue::Cardinals(vec![2]))
        );
        wm.refresh();
        assert_eq!(wm.scene().is_enabled(node(&wm, d)), Some(true));

        wm.handle_request(BridgeRequest::CurrentDesktop { desktop: 99 });
        assert_eq!(wm.desktops().current(), 2);
    }

    #[test]
    fn test_activate_unminimizes_focuses_and_raises() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        wm.set_minimized(a, true);
        wm.activate(a);
        assert!(!wm.client(a).unwrap().is_minimized());
        assert_eq!(wm.focused(), Some(a));
        assert_eq!(wm.stack().as_slice(), &[b, a]);
    }

    #[test]
    fn test_unmanage_focus_falls_back() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        let c = native(&mut wm, 3);
        wm.focus(Some(a));
        wm.focus(Some(b));
        wm.set_minimized(a, true);
        wm.focus(Some(c));
        wm.unmanage(c);
        assert_eq!(wm.focused(), Some(b));
    }

    #[test]
    fn test_close_without_bridge_asks_host() {
        let mut wm = headless();
        let a = wm.manage(ClientKind::Bridged { window: 5 }).unwrap();
        let closed = Rc::new(RefCell::new(Vec::new()));
        let sink = closed.clone();
        wm.subscribe(Signal::RequestClose, move |e| sink.borrow_mut().push(e.client));
        wm.close(a);
        assert_eq!(closed.borrow().as_slice(), &[a]);
    }

    #[test]
    fn test_close_with_bridge_sends_delete() {
        let (mut wm, wire, atoms) = bridged();
        let a = wm.manage_bridged(5, &InitialHints::default()).unwrap();
        wm.handle_request(BridgeRequest::CloseWindow { window: 5 });
        assert_eq!(wire.messages.borrow().len(), 1);
        assert_eq!(wire.messages.borrow()[0].1, atoms.WM_PROTOCOLS);
        assert!(wm.client(a).is_some());
    }

    #[test]
    fn test_absent_bridge_changes_nothing_in_core() {
        let mut plain = headless();
        let (mut mirrored, _wire, _atoms) = bridged();
        for wm in [&mut plain, &mut mirrored] {
            let a = wm.manage(ClientKind::Bridged { window: 9 }).unwrap();
            let b = native(wm, 1);
            wm.set_fullscreen(a, true);
            wm.focus(Some(a));
            wm.set_transient_for(b, Some(a));
            wm.refresh();
        }
        for layer in SceneLayer::ALL {
            assert_eq!(
                plain.scene().children(plain.layer_container(layer)).len(),
                mirrored
                    .scene()
                    .children(mirrored.layer_container(layer))
                    .len()
            );
        }
    }

    #[test]
    fn test_subscribers_run_after_dirty_marking() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        wm.refresh();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        wm.subscribe(Signal::Property(Property::Above), move |e| {
            sink.borrow_mut().push(e.client)
        });
        wm.set_above(a, true);
        assert!(wm.is_dirty());
        assert_eq!(seen.borrow().as_slice(), &[a]);
    }

    #[test]
    fn test_decor_surfaces_layered() {
        let mut wm = headless();
        let bar = wm.add_decor(WindowType::Dock).unwrap();
        let osd = wm.add_decor(WindowType::Notification).unwrap();
        wm.refresh();
        let above = wm.layer_container(SceneLayer::Above);
        let decor = wm.layer_container(SceneLayer::Decor);
        assert_eq!(wm.scene().parent(wm.decor(bar).unwrap().node), Some(above));
        assert_eq!(wm.scene().parent(wm.decor(osd).unwrap().node), Some(decor));

        wm.set_decor_ontop(osd, true);
        wm.refresh();
        let overlay = wm.layer_container(SceneLayer::Overlay);
        assert_eq!(wm.scene().parent(wm.decor(osd).unwrap().node), Some(overlay));

        wm.remove_decor(bar);
        assert!(wm.decor(bar).is_none());
        assert!(wm.scene().children(above).is_empty());
    }

    #[test]
    fn test_decor_visibility_and_raise() {
        let mut wm = headless();
        let bar = wm.add_decor(WindowType::Normal).unwrap();
        let osd = wm.add_decor(WindowType::Notification).unwrap();
        wm.refresh();
        let decor = wm.layer_container(SceneLayer::Decor);
        let bar_node = wm.decor(bar).unwrap().node;
        let osd_node = wm.decor(osd).unwrap().node;
        assert_eq!(wm.scene().children(decor), &[bar_node, osd_node]);

        wm.raise_decor(bar);
        assert!(wm.is_dirty());
        wm.refresh();
        assert_eq!(wm.scene().children(decor), &[osd_node, bar_node]);

        // Already on top
        wm.raise_decor(bar);
        assert!(!wm.is_dirty());

        wm.set_decor_visible(osd, false);
        wm.refresh();
        assert_eq!(wm.scene().is_enabled(osd_node), Some(false));
        wm.set_decor_visible(osd, false);
        assert!(!wm.is_dirty());
        wm.set_decor_visible(osd, true);
        wm.refresh();
        assert_eq!(wm.scene().is_enabled(osd_node), Some(true));
    }

    #[test]
    fn test_unsubscribed_handler_stops_running() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        let subscription = wm.subscribe(Signal::Property(Property::Ontop), move |_| {
            *sink.borrow_mut() += 1
        });
        wm.set_ontop(a, true);
        assert!(wm.unsubscribe(subscription));
        wm.set_ontop(a, false);
        assert_eq!(*seen.borrow(), 1);
        assert!(!wm.unsubscribe(subscription));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_order() {
        let mut wm = headless();
        let a = native(&mut wm, 1);
        let b = native(&mut wm, 2);
        wm.refresh();
        let normal = wm.layer_container(SceneLayer::Normal);
        let before = wm.scene().children(normal).to_vec();

        wm.set_ontop(a, true);
        wm.set_above(b, true);
        wm.scene_mut().fail_after(1);
        assert_eq!(wm.refresh(), 0);
        assert_eq!(wm.scene().children(normal), before.as_slice());

        // The next turn retries without any new change
        assert!(wm.is_dirty());
        assert!(wm.refresh() > 0);
        assert_eq!(wm.layer_of(a), Some(WindowLayer::Ontop));
        let ontop = wm.layer_container(SceneLayer::Ontop);
        assert_eq!(wm.scene().parent(node(&wm, a)), Some(ontop));
        assert!(!wm.is_dirty());
    }
}
