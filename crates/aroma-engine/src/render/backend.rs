use crate::image::TextureId;
use crate::math::Mat3;
use crate::paint::Color;

/// Vertex attribute slots of the single shader program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Location 0, `vec2` position in local pixels.
    Position,
    /// Location 1, `vec2` texture coordinate.
    TexCoord,
}

/// Interleaving of the floats passed to [`GraphicsBackend::upload_vertices`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexLayout {
    /// `x, y` per vertex.
    Position,
    /// `x, y, u, v` per vertex.
    PositionTexCoord,
}

impl VertexLayout {
    /// Floats per vertex.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            VertexLayout::Position => 2,
            VertexLayout::PositionTexCoord => 4,
        }
    }
}

/// Uniform block of the shader program.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Uniforms {
    pub transform: Mat3,
    pub projection: Mat3,
    pub color: Color,
    pub use_texture: bool,
}

/// GPU-facing half of the draw pipeline.
///
/// Mirrors a minimal GL-style state machine over one program and one vertex
/// buffer: uniforms, the bound texture, the uploaded vertices and the
/// attribute enable flags persist across calls until changed. A draw uses
/// whatever state is current when [`draw_triangle_fan`](Self::draw_triangle_fan)
/// is called.
pub trait GraphicsBackend {
    /// Starts a frame by clearing the framebuffer.
    fn clear(&mut self, color: Color);

    fn set_uniforms(&mut self, uniforms: &Uniforms);

    fn bind_texture(&mut self, texture: TextureId);

    /// Replaces the contents of the shared vertex buffer.
    fn upload_vertices(&mut self, layout: VertexLayout, data: &[f32]);

    fn set_attribute_enabled(&mut self, attribute: Attribute, enabled: bool);

    /// Issues one draw call over the first `vertex_count` uploaded vertices.
    fn draw_triangle_fan(&mut self, vertex_count: u32);

    /// Ends the frame and presents it.
    fn finish_frame(&mut self) {}

    /// True once the output can no longer be presented to.
    fn device_lost(&self) -> bool {
        false
    }
}
