//! Frame loop and the contracts around it.
//!
//! The window runtime drives an [`App`] once per redraw; [`FrameLoop`] is the
//! `App` that runs a [`ScriptHost`]'s lifecycle callbacks against the
//! graphics context.

mod app;
mod frame_loop;
mod host;

pub use app::{App, AppControl};
pub use frame_loop::{FrameLoop, LoopState};
pub use host::{ScriptError, ScriptHost};
