//! 2D affine math.
//!
//! Canonical CPU space:
//! - pixels, origin top-left
//! - +X right, +Y down
//!
//! Angles are radians. A positive angle turns clockwise on screen because the
//! projection flips Y; see [`Mat3::rotate`].

mod mat3;
mod viewport;

pub use mat3::Mat3;
pub use viewport::Viewport;
