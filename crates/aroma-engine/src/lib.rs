//! Aroma engine crate.
//!
//! A small immediate-mode 2D runtime: affine transforms on a fixed-depth
//! stack, colored convex polygons and textured quads through one shader,
//! asynchronously loaded images and a frame loop that drives script
//! lifecycle callbacks. The scripting language itself lives in `aroma-lua`.

pub mod math;
pub mod transform;
pub mod paint;
pub mod image;
pub mod render;
pub mod graphics;
pub mod core;

pub mod device;
pub mod time;
pub mod logging;
pub mod window;
