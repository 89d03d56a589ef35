//! Color model shared between the script adapter and the renderers.

pub mod color;

pub use color::Color;
