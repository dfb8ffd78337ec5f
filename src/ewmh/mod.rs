//! EWMH / ICCCM compatibility bridge
//!
//! Mirrors canonical client state onto X11 properties and decodes client
//! messages back into the same setters the rest of the crate uses.

pub mod atoms;
pub mod bridge;
pub mod mapping;
pub mod probe;
pub mod requests;
pub mod wire;

pub use atoms::Atoms;
pub use bridge::Bridge;
pub use mapping::{MapChange, MapTracker};
pub use requests::{BridgeRequest, StateAction};
pub use wire::{WireConn, X11Link};
