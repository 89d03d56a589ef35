use std::cell::RefCell;
use std::rc::Rc;

use crate::image::TextureId;
use crate::math::Mat3;
use crate::paint::Color;

use super::{Attribute, GraphicsBackend, Uniforms, VertexLayout};

/// One backend call, as received.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    Clear(Color),
    SetUniforms(Uniforms),
    BindTexture(TextureId),
    UploadVertices { layout: VertexLayout, len: usize },
    SetAttribute { attribute: Attribute, enabled: bool },
    DrawTriangleFan(u32),
    FinishFrame,
}

/// The backend state a draw call observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub uniforms: Uniforms,
    pub texture: TextureId,
    pub layout: VertexLayout,
    pub vertices: Vec<f32>,
    pub position_enabled: bool,
    pub texcoord_enabled: bool,
    pub vertex_count: u32,
}

#[derive(Debug)]
struct Log {
    ops: Vec<BackendOp>,
    draws: Vec<RecordedDraw>,
    frames: usize,

    uniforms: Uniforms,
    texture: TextureId,
    layout: VertexLayout,
    vertices: Vec<f32>,
    position_enabled: bool,
    texcoord_enabled: bool,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            draws: Vec::new(),
            frames: 0,
            uniforms: Uniforms {
                transform: Mat3::IDENTITY,
                projection: Mat3::IDENTITY,
                color: Color::WHITE,
                use_texture: false,
            },
            texture: TextureId::NONE,
            layout: VertexLayout::Position,
            vertices: Vec::new(),
            position_enabled: false,
            texcoord_enabled: false,
        }
    }
}

/// Headless backend that records every call.
///
/// The [`Recording`] handle stays
/// readable after the backend has been boxed into a graphics context.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: Rc<RefCell<Log>>,
}

/// Read side of a [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct Recording {
    log: Rc<RefCell<Log>>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Recording) {
        let log = Rc::new(RefCell::new(Log::default()));
        (Self { log: log.clone() }, Recording { log })
    }
}

impl GraphicsBackend for RecordingBackend {
    fn clear(&mut self, color: Color) {
        self.log.borrow_mut().ops.push(BackendOp::Clear(color));
    }

    fn set_uniforms(&mut self, uniforms: &Uniforms) {
        let mut log = self.log.borrow_mut();
        log.uniforms = *uniforms;
        log.ops.push(BackendOp::SetUniforms(*uniforms));
    }

    fn bind_texture(&mut self, texture: TextureId) {
        let mut log = self.log.borrow_mut();
        log.texture = texture;
        log.ops.push(BackendOp::BindTexture(texture));
    }

    fn upload_vertices(&mut self, layout: VertexLayout, data: &[f32]) {
        let mut log = self.log.borrow_mut();
        log.layout = layout;
        log.vertices = data.to_vec();
        log.ops.push(BackendOp::UploadVertices { layout, len: data.len() });
    }

    fn set_attribute_enabled(&mut self, attribute: Attribute, enabled: bool) {
        let mut log = self.log.borrow_mut();
        match attribute {
            Attribute::Position => log.position_enabled = enabled,
            Attribute::TexCoord => log.texcoord_enabled = enabled,
        }
        log.ops.push(BackendOp::SetAttribute { attribute, enabled });
    }

    fn draw_triangle_fan(&mut self, vertex_count: u32) {
        let mut log = self.log.borrow_mut();
        let draw = RecordedDraw {
            uniforms: log.uniforms,
            texture: log.texture,
            layout: log.layout,
            vertices: log.vertices.clone(),
            position_enabled: log.position_enabled,
            texcoord_enabled: log.texcoord_enabled,
            vertex_count,
        };
        log.draws.push(draw);
        log.ops.push(BackendOp::DrawTriangleFan(vertex_count));
    }

    fn finish_frame(&mut self) {
        let mut log = self.log.borrow_mut();
        log.frames += 1;
        log.ops.push(BackendOp::FinishFrame);
    }
}

impl Recording {
    pub fn ops(&self) -> Vec<BackendOp> {
        self.log.borrow().ops.clone()
    }

    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.log.borrow().draws.clone()
    }

    /// Number of finished frames.
    pub fn frames(&self) -> usize {
        self.log.borrow().frames
    }

    /// Colors passed to `clear`, in order.
    pub fn clears(&self) -> Vec<Color> {
        self.log
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                BackendOp::Clear(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn attribute_enabled(&self, attribute: Attribute) -> bool {
        let log = self.log.borrow();
        match attribute {
            Attribute::Position => log.position_enabled,
            Attribute::TexCoord => log.texcoord_enabled,
        }
    }

    /// Forgets recorded ops and draws; current state is kept.
    pub fn clear_log(&self) {
        let mut log = self.log.borrow_mut();
        log.ops.clear();
        log.draws.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_snapshots_current_state() {
        let (mut b, rec) = RecordingBackend::new();
        b.bind_texture(TextureId(3));
        b.upload_vertices(VertexLayout::Position, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        b.set_attribute_enabled(Attribute::Position, true);
        b.draw_triangle_fan(3);
        b.bind_texture(TextureId(4));

        let d = &rec.draws()[0];
        assert_eq!(d.texture, TextureId(3));
        assert_eq!(d.vertices.len(), 6);
        assert!(d.position_enabled);
        assert!(!d.texcoord_enabled);
    }

    #[test]
    fn frames_and_clears_are_counted() {
        let (mut b, rec) = RecordingBackend::new();
        b.clear(Color::BLACK);
        b.finish_frame();
        b.clear(Color::WHITE);
        b.finish_frame();
        assert_eq!(rec.frames(), 2);
        assert_eq!(rec.clears(), vec![Color::BLACK, Color::WHITE]);

        rec.clear_log();
        assert!(rec.ops().is_empty());
        assert_eq!(rec.frames(), 2);
    }
}
