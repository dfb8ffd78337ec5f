//! Strata
//!
//! Canonical window state, layered stacking onto a retained scene graph, and
//! an EWMH mirror of that state for X11 clients.

pub mod config;
pub mod ewmh;
pub mod scene;
pub mod shared;
pub mod wm;
pub mod x11_async;

pub use config::Config;
pub use wm::WindowManager;
