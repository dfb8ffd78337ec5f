//! Plain value types shared by the window model and the protocol bridge.

pub mod window_state;

pub use window_state::{Geometry, Strut};
