//! Window + runtime loop.
//!
//! Owns the `winit` event loop and the single window, and turns redraws into
//! frame ticks.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
