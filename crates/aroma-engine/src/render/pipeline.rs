use bytemuck::{Pod, Zeroable};

use crate::graphics::GraphicsError;
use crate::image::TextureId;
use crate::math::{Mat3, Viewport};
use crate::paint::Color;

use super::{Attribute, GraphicsBackend, Uniforms, VertexLayout};

/// Polygon draw mode. Only `Fill` is rendered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawMode {
    Fill,
    Line,
}

impl DrawMode {
    pub fn parse(mode: &str) -> Result<Self, GraphicsError> {
        match mode {
            "fill" => Ok(DrawMode::Fill),
            "line" => Ok(DrawMode::Line),
            other => Err(GraphicsError::UnsupportedMode(other.to_string())),
        }
    }

    /// Rejects modes that parse but are not rendered.
    pub fn drawable(self) -> Result<Self, GraphicsError> {
        match self {
            DrawMode::Fill => Ok(self),
            DrawMode::Line => Err(GraphicsError::UnsupportedMode(self.as_str().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrawMode::Fill => "fill",
            DrawMode::Line => "line",
        }
    }
}

/// Placement of an image draw.
///
/// `ox`/`oy` is the pivot in unscaled source pixels: it is subtracted last, in
/// the already rotated and scaled local frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImageDraw {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub sx: f32,
    pub sy: f32,
    pub ox: f32,
    pub oy: f32,
}

impl ImageDraw {
    #[inline]
    pub fn at(x: f32, y: f32) -> Self {
        Self { x, y, ..Self::default() }
    }
}

impl Default for ImageDraw {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, angle: 0.0, sx: 1.0, sy: 1.0, ox: 0.0, oy: 0.0 }
    }
}

/// A ready image, as far as the pipeline is concerned.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TexturedQuad {
    pub texture: TextureId,
    pub width: f32,
    pub height: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Builds the object-side transform of an image draw:
/// translate to `(x, y)`, rotate (skipped at 0), scale, translate by `-origin`.
pub fn image_local_transform(d: &ImageDraw) -> Mat3 {
    let mut local = Mat3::identity();
    local.translate(d.x, d.y);
    if d.angle != 0.0 {
        local.rotate(d.angle);
    }
    local.scale(d.sx, d.sy);
    if d.ox != 0.0 || d.oy != 0.0 {
        local.translate(-d.ox, -d.oy);
    }
    local
}

/// Native-size quad with unit texture coordinates, in fan order.
pub fn quad_vertices(width: f32, height: f32) -> [TexturedVertex; 4] {
    [
        TexturedVertex { pos: [0.0, 0.0], uv: [0.0, 0.0] },
        TexturedVertex { pos: [width, 0.0], uv: [1.0, 0.0] },
        TexturedVertex { pos: [width, height], uv: [1.0, 1.0] },
        TexturedVertex { pos: [0.0, height], uv: [0.0, 1.0] },
    ]
}

/// Checks a flat `x1, y1, x2, y2, ...` list: even and at least 3 points.
pub fn validate_polygon(coords: &[f32]) -> Result<(), GraphicsError> {
    if coords.len() % 2 != 0 {
        return Err(GraphicsError::PolygonOddCoordinates(coords.len()));
    }
    if coords.len() < 6 {
        return Err(GraphicsError::PolygonTooFewPoints(coords.len()));
    }
    Ok(())
}

/// Turns draw requests into backend calls.
///
/// One program, one vertex buffer, one draw call per request. Both request
/// kinds share the attribute slots, so each draw leaves `TexCoord` disabled.
#[derive(Debug, Clone)]
pub struct DrawPipeline {
    projection: Mat3,
}

impl DrawPipeline {
    pub fn new(viewport: Viewport) -> Self {
        Self { projection: Mat3::projection(viewport) }
    }

    #[inline]
    pub fn projection(&self) -> &Mat3 {
        &self.projection
    }

    /// Fills a polygon as a triangle fan.
    ///
    /// Only convex polygons render correctly; concave input is drawn as-is.
    pub fn polygon(
        &self,
        backend: &mut dyn GraphicsBackend,
        transform: &Mat3,
        color: Color,
        mode: DrawMode,
        coords: &[f32],
    ) -> Result<(), GraphicsError> {
        mode.drawable()?;
        validate_polygon(coords)?;

        backend.set_uniforms(&Uniforms {
            transform: *transform,
            projection: self.projection,
            color,
            use_texture: false,
        });
        backend.set_attribute_enabled(Attribute::TexCoord, false);
        backend.upload_vertices(VertexLayout::Position, coords);
        backend.set_attribute_enabled(Attribute::Position, true);
        backend.draw_triangle_fan((coords.len() / 2) as u32);
        Ok(())
    }

    /// Draws a ready image at its native pixel size.
    ///
    /// The final transform is `world ∘ local`, with `world` the current stack
    /// frame.
    pub fn image(
        &self,
        backend: &mut dyn GraphicsBackend,
        world: &Mat3,
        color: Color,
        quad: TexturedQuad,
        placement: &ImageDraw,
    ) {
        let transform = Mat3::compose(world, &image_local_transform(placement));
        let vertices = quad_vertices(quad.width, quad.height);

        backend.set_uniforms(&Uniforms {
            transform,
            projection: self.projection,
            color,
            use_texture: true,
        });
        backend.bind_texture(quad.texture);
        backend.upload_vertices(VertexLayout::PositionTexCoord, bytemuck::cast_slice(&vertices));
        backend.set_attribute_enabled(Attribute::Position, true);
        backend.set_attribute_enabled(Attribute::TexCoord, true);
        backend.draw_triangle_fan(vertices.len() as u32);
        backend.set_attribute_enabled(Attribute::TexCoord, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingBackend, VertexLayout};

    const EPS: f32 = 1e-4;

    fn pipeline() -> DrawPipeline {
        DrawPipeline::new(Viewport::default())
    }

    // ── polygon ───────────────────────────────────────────────────────────

    #[test]
    fn polygon_with_three_points_draws_fan() {
        let (mut backend, rec) = RecordingBackend::new();
        pipeline()
            .polygon(&mut backend, &Mat3::IDENTITY, Color::WHITE, DrawMode::Fill, &[
                0.0, 0.0, 10.0, 0.0, 10.0, 10.0,
            ])
            .unwrap();

        let draws = rec.draws();
        assert_eq!(draws.len(), 1);
        let d = &draws[0];
        assert_eq!(d.vertex_count, 3);
        assert_eq!(d.layout, VertexLayout::Position);
        assert!(!d.uniforms.use_texture);
        assert!(d.position_enabled);
        assert!(!d.texcoord_enabled);
        assert_eq!(d.vertices, vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn polygon_rejects_two_points() {
        let (mut backend, rec) = RecordingBackend::new();
        let err = pipeline()
            .polygon(&mut backend, &Mat3::IDENTITY, Color::WHITE, DrawMode::Fill, &[
                0.0, 0.0, 10.0, 0.0,
            ])
            .unwrap_err();
        assert_eq!(err, GraphicsError::PolygonTooFewPoints(4));
        assert!(rec.draws().is_empty());
    }

    #[test]
    fn polygon_rejects_odd_coordinate_count() {
        let err = validate_polygon(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, GraphicsError::PolygonOddCoordinates(7));
    }

    #[test]
    fn polygon_rejects_line_mode() {
        let (mut backend, rec) = RecordingBackend::new();
        let err = pipeline()
            .polygon(&mut backend, &Mat3::IDENTITY, Color::WHITE, DrawMode::Line, &[
                0.0, 0.0, 10.0, 0.0, 10.0, 10.0,
            ])
            .unwrap_err();
        assert_eq!(err, GraphicsError::UnsupportedMode("line".into()));
        assert!(rec.ops().is_empty());
    }

    #[test]
    fn draw_mode_parse() {
        assert_eq!(DrawMode::parse("fill"), Ok(DrawMode::Fill));
        assert_eq!(DrawMode::parse("line"), Ok(DrawMode::Line));
        assert_eq!(DrawMode::parse("stroke"), Err(GraphicsError::UnsupportedMode("stroke".into())));
        assert_eq!(DrawMode::Fill.drawable(), Ok(DrawMode::Fill));
        assert_eq!(DrawMode::Line.drawable(), Err(GraphicsError::UnsupportedMode("line".into())));
    }

    // ── image ─────────────────────────────────────────────────────────────

    #[test]
    fn image_draw_binds_texture_and_uploads_native_quad() {
        let (mut backend, rec) = RecordingBackend::new();
        let quad = TexturedQuad { texture: TextureId(7), width: 32.0, height: 32.0 };
        pipeline().image(&mut backend, &Mat3::IDENTITY, Color::WHITE, quad, &ImageDraw::at(100.0, 50.0));

        let draws = rec.draws();
        assert_eq!(draws.len(), 1);
        let d = &draws[0];
        assert_eq!(d.texture, TextureId(7));
        assert_eq!(d.layout, VertexLayout::PositionTexCoord);
        assert!(d.uniforms.use_texture);
        assert!(d.texcoord_enabled);
        assert_eq!(
            d.vertices,
            vec![
                0.0, 0.0, 0.0, 0.0, //
                32.0, 0.0, 1.0, 0.0, //
                32.0, 32.0, 1.0, 1.0, //
                0.0, 32.0, 0.0, 1.0,
            ]
        );
        assert!(d.uniforms.transform.approx_eq(&Mat3::from_translation(100.0, 50.0), EPS));

        // Texture coordinates are switched off again after the draw.
        assert!(!rec.attribute_enabled(Attribute::TexCoord));
    }

    #[test]
    fn image_transform_composes_world_then_local() {
        let (mut backend, rec) = RecordingBackend::new();
        let world = Mat3::from_scale(2.0, 2.0);
        let quad = TexturedQuad { texture: TextureId(1), width: 4.0, height: 4.0 };
        pipeline().image(&mut backend, &world, Color::WHITE, quad, &ImageDraw::at(10.0, 0.0));

        let t = rec.draws()[0].uniforms.transform;
        // local (0,0) -> (10,0) -> world (20,0)
        let (x, y) = t.transform_point(0.0, 0.0);
        assert!((x - 20.0).abs() < EPS && y.abs() < EPS);
    }

    #[test]
    fn origin_is_a_pivot_in_source_pixels() {
        let d = ImageDraw { x: 50.0, y: 50.0, sx: 2.0, sy: 2.0, ox: 16.0, oy: 16.0, ..ImageDraw::default() };
        let m = image_local_transform(&d);
        // The origin pixel lands exactly on (x, y), whatever the scale.
        let (px, py) = m.transform_point(16.0, 16.0);
        assert!((px - 50.0).abs() < EPS && (py - 50.0).abs() < EPS);
        // A corner is scaled away from the pivot.
        let (cx, cy) = m.transform_point(0.0, 0.0);
        assert!((cx - 18.0).abs() < EPS && (cy - 18.0).abs() < EPS);
    }

    #[test]
    fn rotation_turns_around_position() {
        let d = ImageDraw { x: 10.0, y: 10.0, angle: std::f32::consts::FRAC_PI_2, ..ImageDraw::default() };
        let (x, y) = image_local_transform(&d).transform_point(5.0, 0.0);
        assert!((x - 10.0).abs() < EPS && (y - 15.0).abs() < EPS);
    }

    #[test]
    fn uniforms_carry_projection_and_color() {
        let (mut backend, rec) = RecordingBackend::new();
        let p = pipeline();
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        p.polygon(&mut backend, &Mat3::IDENTITY, red, DrawMode::Fill, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0])
            .unwrap();
        let u = rec.draws()[0].uniforms;
        assert_eq!(u.color, red);
        assert_eq!(u.projection, *p.projection());
    }
}
