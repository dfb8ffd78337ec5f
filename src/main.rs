//! Strata
//!
//! Window state and stacking engine with an optional EWMH bridge for X11
//! clients. Without an X display the core runs headless.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureRequestEvent, ConfigureWindowAux, ConnectionExt as _,
    EventMask, InputFocus, MapState, StackMode, Window,
};
use x11rb::rust_connection::RustConnection;

use strata::config::{BridgeConfig, Config, LoggingConfig};
use strata::ewmh::{Atoms, Bridge, MapChange, MapTracker, X11Link, probe, requests};
use strata::scene::{NodeId, SceneLayer, SceneTree};
use strata::shared::Geometry;
use strata::wm::WindowManager;
use strata::wm::client::ClientId;
use strata::x11_async::X11EventStream;

const WM_NAME: &str = "strata";

/// Live X connection while the bridge is enabled
struct X11Session {
    conn: Arc<RustConnection>,
    stream: X11EventStream,
    root: Window,
    atoms: Atoms,
}

/// Main application state
struct StrataApp {
    wm: WindowManager,
    x11: Option<X11Session>,
    /// Window that last received X input focus
    input_focus: Option<Window>,
    mapping: MapTracker,
}

impl StrataApp {
    fn new(config: &Config) -> Result<Self> {
        let (bridge, x11) = if config.bridge.enabled {
            match connect(&config.bridge) {
                Ok((bridge, session)) => (bridge, Some(session)),
                Err(e) => {
                    warn!("EWMH bridge unavailable, running headless: {:#}", e);
                    (Bridge::absent(), None)
                }
            }
        } else {
            info!("EWMH bridge disabled in configuration");
            (Bridge::absent(), None)
        };

        let wm = WindowManager::new(SceneTree::new(), config, bridge)
            .context("Failed to create scene layers")?;

        let mut app = Self {
            wm,
            x11,
            input_focus: None,
            mapping: MapTracker::new(),
        };
        app.adopt_existing()?;
        Ok(app)
    }

    async fn run(mut self) -> Result<()> {
        info!("Starting main event loop");
        let mut events: Vec<Event> = Vec::new();

        loop {
            for event in events.drain(..) {
                if let Err(e) = self.handle_event(event) {
                    debug!("Error handling event: {:#}", e);
                }
            }

            // Exactly one stacking pass per turn
            let calls = self.wm.refresh();
            if calls > 0 {
                if let Err(e) = self.restack() {
                    warn!("Failed to restack X windows: {:#}", e);
                }
                if let Err(e) = self.sync_mapping() {
                    warn!("Failed to map/unmap X windows: {:#}", e);
                }
            }
            self.sync_input_focus();

            let Some(x11) = &self.x11 else {
                std::future::pending::<()>().await;
                continue;
            };
            x11.stream
                .next_batch(&mut events)
                .await
                .context("X11 connection lost")?;
        }
    }

    /// Manage windows that were mapped before we started
    fn adopt_existing(&mut self) -> Result<()> {
        let Some(x11) = &self.x11 else {
            return Ok(());
        };
        let tree = x11.conn.query_tree(x11.root)?.reply()?;
        let mut adopt = Vec::new();
        for &window in &tree.children {
            let Ok(attrs) = x11.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if !attrs.override_redirect && attrs.map_state == MapState::VIEWABLE {
                adopt.push(window);
            }
        }
        info!("Adopting {} existing windows", adopt.len());
        for window in adopt {
            self.manage_window(window)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::MapRequest(e) => self.manage_window(e.window)?,
            Event::UnmapNotify(e) => {
                if self.mapping.take_unmap(e.window) {
                    debug!("Window {} hidden by us", e.window);
                } else {
                    self.forget_window(e.window);
                }
            }
            Event::DestroyNotify(e) => self.forget_window(e.window),
            Event::ConfigureRequest(e) => self.configure_window(&e)?,
            Event::ClientMessage(e) => {
                let request = self
                    .x11
                    .as_ref()
                    .and_then(|x11| requests::from_event(&x11.atoms, &e));
                if let Some(request) = request {
                    self.wm.handle_request(request);
                }
            }
            Event::PropertyNotify(e) => {
                let Some(x11) = &self.x11 else {
                    return Ok(());
                };
                if e.atom == x11.atoms._NET_WM_NAME {
                    if let Some(id) = self.wm.client_for_window(e.window) {
                        if let Some(title) = probe::read_title(&*x11.conn, &x11.atoms, e.window)? {
                            self.wm.set_title(id, &title);
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn manage_window(&mut self, window: Window) -> Result<()> {
        let Some(x11) = &self.x11 else {
            return Ok(());
        };
        if self.wm.client_for_window(window).is_some() {
            return Ok(());
        }
        let attrs = x11.conn.get_window_attributes(window)?.reply()?;
        if attrs.override_redirect {
            return Ok(());
        }

        let hints = probe::read_initial(&*x11.conn, &x11.atoms, window)?;
        x11.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        let geometry = x11.conn.get_geometry(window)?.reply().ok().map(|g| {
            Geometry::new(g.x as i32, g.y as i32, g.width as u32, g.height as u32)
        });
        x11.conn.map_window(window)?;
        self.mapping.mapped(window);

        let id = self.manage_with_hints(window, &hints)?;
        if let Some(geometry) = geometry {
            self.wm.set_geometry(id, geometry);
        }
        Ok(())
    }

    fn manage_with_hints(
        &mut self,
        window: Window,
        hints: &probe::InitialHints,
    ) -> Result<ClientId> {
        let id = self
            .wm
            .manage_bridged(window, hints)
            .context("Failed to create scene node")?;
        self.wm.activate(id);
        Ok(id)
    }

    fn forget_window(&mut self, window: Window) {
        self.mapping.forget(window);
        if let Some(id) = self.wm.client_for_window(window) {
            self.wm.unmanage(id);
        }
    }

    /// Geometry is granted as asked; stacking requests are ours to decide
    fn configure_window(&mut self, e: &ConfigureRequestEvent) -> Result<()> {
        let Some(x11) = &self.x11 else {
            return Ok(());
        };
        let mut aux = ConfigureWindowAux::from_configure_request(e);
        aux.sibling = None;
        aux.stack_mode = None;
        x11.conn.configure_window(e.window, &aux)?;

        if let Some(id) = self.wm.client_for_window(e.window) {
            self.wm.set_geometry(
                id,
                Geometry::new(
                    e.x as i32,
                    e.y as i32,
                    e.width as u32,
                    e.height as u32,
                ),
            );
        }
        Ok(())
    }

    /// Mirror the scene order onto the X server, bottom to top
    fn restack(&self) -> Result<()> {
        let Some(x11) = &self.x11 else {
            return Ok(());
        };
        let windows: HashMap<NodeId, Window> = self
            .wm
            .clients()
            .filter_map(|c| c.kind.protocol_window().map(|w| (c.node, w)))
            .collect();

        let mut previous: Option<Window> = None;
        for layer in SceneLayer::ALL {
            let container = self.wm.layer_container(layer);
            for node in self.wm.scene().children(container) {
                let Some(&window) = windows.get(node) else {
                    continue;
                };
                let aux = match previous {
                    Some(sibling) => ConfigureWindowAux::new()
                        .sibling(sibling)
                        .stack_mode(StackMode::ABOVE),
                    None => ConfigureWindowAux::new().stack_mode(StackMode::BELOW),
                };
                x11.conn.configure_window(window, &aux)?;
                previous = Some(window);
            }
        }
        Ok(())
    }

    /// Map or unmap bridged windows whose scene node changed visibility
    fn sync_mapping(&mut self) -> Result<()> {
        let Some(x11) = &self.x11 else {
            return Ok(());
        };
        for change in self.mapping.sync(self.wm.bridged_visibility()) {
            match change {
                MapChange::Map(window) => x11.conn.map_window(window)?,
                MapChange::Unmap(window) => x11.conn.unmap_window(window)?,
            };
        }
        Ok(())
    }

    fn sync_input_focus(&mut self) {
        let Some(x11) = &self.x11 else {
            return;
        };
        let target = self
            .wm
            .focused()
            .and_then(|id| self.wm.client(id))
            .and_then(|c| c.kind.protocol_window());
        if target == self.input_focus {
            return;
        }
        let window = target.unwrap_or(x11.root);
        if let Err(e) = x11
            .conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)
        {
            debug!("Failed to set input focus to {}: {}", window, e);
        }
        self.input_focus = target;
    }
}

/// Connect to X, become the window manager and start the bridge
fn connect(config: &BridgeConfig) -> Result<(Bridge, X11Session)> {
    let (conn, screen_num) =
        x11rb::connect(config.display.as_deref()).context("Failed to connect to X server")?;
    let conn = Arc::new(conn);
    let root = conn.setup().roots[screen_num].root;
    info!("Connected to X server, screen {}, root window {}", screen_num, root);

    let selection_name = format!("WM_S{}", screen_num);
    let selection = conn
        .intern_atom(false, selection_name.as_bytes())?
        .reply()
        .context("Failed to intern WM selection atom")?
        .atom;
    let owner = conn
        .get_selection_owner(selection)?
        .reply()
        .context("Failed to get WM selection owner")?
        .owner;
    if owner != 0 && !config.replace {
        anyhow::bail!(
            "Another window manager is already running (window 0x{:x}); set bridge.replace or pass --replace",
            owner
        );
    }

    let atoms = Atoms::new(&*conn).context("Failed to intern EWMH atoms")?;
    let link = X11Link::new(conn.clone(), atoms.UTF8_STRING);
    let check_window = link.create_check_window(root)?;
    conn.set_selection_owner(check_window, selection, x11rb::CURRENT_TIME)?;

    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new().event_mask(
            EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::PROPERTY_CHANGE,
        ),
    )?
    .check()
    .context("Failed to select substructure redirect on root window")?;

    let stream = X11EventStream::new(conn.clone()).context("Failed to initialize X11 event stream")?;

    let mut bridge = Bridge::new(Box::new(link), atoms.clone(), root);
    bridge.setup(Some(check_window), WM_NAME);

    Ok((
        bridge,
        X11Session {
            conn,
            stream,
            root,
            atoms,
        },
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = Config::load();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| match &loaded {
        Ok(config) => config.logging.filter.clone(),
        Err(_) => LoggingConfig::default().filter,
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Strata");

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration, using defaults: {:#}", e);
            Config::default()
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--replace" || arg == "-r") {
        info!("--replace flag detected: will take over from a running WM");
        config.bridge.replace = true;
    }
    if args.iter().any(|arg| arg == "--no-bridge") {
        config.bridge.enabled = false;
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let app = StrataApp::new(&config)?;

    tokio::select! {
        result = app.run() => {
            if let Err(e) = result {
                error!("Application error: {:#}", e);
                return Err(e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
