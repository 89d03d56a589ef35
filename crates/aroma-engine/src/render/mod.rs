//! Draw pipeline and graphics backends.
//!
//! `DrawPipeline` turns polygon and image requests into calls on a
//! [`GraphicsBackend`], a GL-style state machine over a single program.
//!
//! Convention:
//! - Geometry is in window pixels (top-left origin, +Y down).
//! - The vertex shader applies `projection * transform` to each position.

mod backend;
mod gpu_backend;
mod pipeline;
mod recording;

pub use backend::{Attribute, GraphicsBackend, Uniforms, VertexLayout};
pub use gpu_backend::WgpuBackend;
pub use pipeline::{
    image_local_transform, quad_vertices, validate_polygon, DrawMode, DrawPipeline, ImageDraw,
    TexturedQuad, TexturedVertex,
};
pub use recording::{BackendOp, RecordedDraw, Recording, RecordingBackend};
