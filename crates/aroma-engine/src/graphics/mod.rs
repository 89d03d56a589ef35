//! The engine context scripts draw through.
//!
//! `Graphics` owns everything the drawing API touches: colors, the
//! transform stack, image records, the draw pipeline, the backend and the
//! texture loader. It is passed explicitly (usually as [`SharedGraphics`]);
//! there is no global instance.

mod error;
mod state;

pub use error::GraphicsError;
pub use state::{Graphics, ImageReleaser, SharedGraphics};
