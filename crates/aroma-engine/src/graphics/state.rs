use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};

use crate::image::{
    load_channel, ImageId, ImageRecord, ImageState, ImageTable, LoadOutcome, LoadRequest,
    TextureLoader,
};
use crate::math::{Mat3, Viewport};
use crate::paint::Color;
use crate::render::{DrawMode, DrawPipeline, GraphicsBackend, ImageDraw, TexturedQuad};
use crate::transform::TransformStack;

use super::GraphicsError;

/// Single-threaded shared handle to the engine context.
pub type SharedGraphics = Rc<RefCell<Graphics>>;

/// Queues images for destruction from places that cannot borrow
/// [`Graphics`], such as a script runtime's finalizers.
///
/// Queued ids are destroyed at the next tick boundary or `new_image` call.
#[derive(Debug, Clone)]
pub struct ImageReleaser {
    tx: Sender<ImageId>,
}

impl ImageReleaser {
    pub fn release(&self, id: ImageId) {
        // The context is gone: nothing left to release into.
        let _ = self.tx.send(id);
    }
}

pub struct Graphics {
    viewport: Viewport,
    background: Color,
    color: Color,
    stack: TransformStack,

    images: ImageTable,
    pipeline: DrawPipeline,
    backend: Box<dyn GraphicsBackend>,
    loader: Box<dyn TextureLoader>,

    release_tx: Sender<ImageId>,
    release_rx: Receiver<ImageId>,
}

impl Graphics {
    pub fn new(
        viewport: Viewport,
        backend: Box<dyn GraphicsBackend>,
        loader: Box<dyn TextureLoader>,
    ) -> Self {
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        Self {
            viewport,
            background: Color::BLACK,
            color: Color::WHITE,
            stack: TransformStack::new(),
            images: ImageTable::new(),
            pipeline: DrawPipeline::new(viewport),
            backend,
            loader,
            release_tx,
            release_rx,
        }
    }

    pub fn into_shared(self) -> SharedGraphics {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ── colors ────────────────────────────────────────────────────────────

    pub fn set_background_color(&mut self, color: Color) {
        self.background = color;
    }

    pub fn background_color(&self) -> Color {
        self.background
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    // ── transform stack ───────────────────────────────────────────────────

    pub fn push(&mut self) -> Result<(), GraphicsError> {
        self.stack.push()
    }

    pub fn pop(&mut self) -> Result<(), GraphicsError> {
        self.stack.pop()
    }

    /// Resets the current frame to identity; the depth is unchanged.
    pub fn origin(&mut self) {
        *self.stack.current_mut() = Mat3::IDENTITY;
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.stack.translate(tx, ty);
    }

    pub fn rotate(&mut self, angle: f32) {
        self.stack.rotate(angle);
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.stack.scale(sx, sy);
    }

    pub fn transform(&self) -> &Mat3 {
        self.stack.current()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Fills a convex polygon given as flat `x, y` pairs.
    pub fn polygon(&mut self, mode: DrawMode, coords: &[f32]) -> Result<(), GraphicsError> {
        self.pipeline
            .polygon(self.backend.as_mut(), self.stack.current(), self.color, mode, coords)
    }

    /// Draws an image if it is ready. Pending, failed and destroyed images
    /// draw nothing. Returns whether a draw was issued.
    pub fn draw_image(&mut self, id: ImageId, placement: &ImageDraw) -> bool {
        let Some(record) = self.images.get(id).filter(|r| r.is_ready()) else {
            return false;
        };
        let quad = TexturedQuad {
            texture: record.texture,
            width: record.width as f32,
            height: record.height as f32,
        };
        self.pipeline
            .image(self.backend.as_mut(), self.stack.current(), self.color, quad, placement);
        true
    }

    // ── images ────────────────────────────────────────────────────────────

    /// Creates a pending image and asks the loader for it. Never blocks.
    pub fn new_image(&mut self, path: impl Into<String>) -> ImageId {
        self.drain_releases();

        let path = path.into();
        let (reply, rx) = load_channel();
        let token = self.images.insert(path.clone(), rx);
        log::debug!("requesting image '{path}' as {token:?}");
        self.loader.request_load(LoadRequest { token, path, reply });
        token
    }

    /// Applies a completion directly, bypassing the reply channel.
    ///
    /// The loader's own answer for this image, if one still comes, is
    /// dropped at the next [`pump_loads`](Self::pump_loads); a texture it
    /// carries that differs from `outcome`'s goes back to the loader.
    pub fn complete_load(&mut self, token: ImageId, outcome: LoadOutcome) -> bool {
        self.images.complete(token, outcome)
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.get(id)
    }

    pub fn image_state(&self, id: ImageId) -> Option<ImageState> {
        self.images.state(id)
    }

    pub fn image_width(&self, id: ImageId) -> u32 {
        self.images.width(id)
    }

    pub fn image_height(&self, id: ImageId) -> u32 {
        self.images.height(id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Destroys an image record; a bound texture goes back to the loader.
    pub fn release_image(&mut self, id: ImageId) {
        let Some(record) = self.images.remove(id) else { return };
        if record.is_ready() {
            log::debug!("releasing texture {} of '{}'", record.texture.0, record.path);
            self.loader.release_texture(record.texture);
        }
    }

    pub fn releaser(&self) -> ImageReleaser {
        ImageReleaser { tx: self.release_tx.clone() }
    }

    /// Destroys every image queued through an [`ImageReleaser`].
    pub fn drain_releases(&mut self) -> usize {
        let queued: Vec<ImageId> = self.release_rx.try_iter().collect();
        for &id in &queued {
            self.release_image(id);
        }
        queued.len()
    }

    /// Delivers finished loads. Called once per tick before any callback.
    ///
    /// Returns the number of images that left `Pending`.
    pub fn pump_loads(&mut self) -> usize {
        self.drain_releases();
        self.loader.pump();
        let changed = self.images.poll();
        for texture in self.images.take_stray_textures() {
            self.loader.release_texture(texture);
        }
        changed
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Clears to the background color and resets the transform stack.
    pub fn begin_frame(&mut self) {
        self.backend.clear(self.background);
        self.stack.reset();
    }

    pub fn end_frame(&mut self) {
        self.backend.finish_frame();
    }

    pub fn device_lost(&self) -> bool {
        self.backend.device_lost()
    }
}

impl std::fmt::Debug for Graphics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphics")
            .field("viewport", &self.viewport)
            .field("background", &self.background)
            .field("color", &self.color)
            .field("stack_depth", &self.stack.depth())
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ManualLoader, ManualLoaderHandle, TextureId};
    use crate::render::{Recording, RecordingBackend, VertexLayout};

    fn graphics() -> (Graphics, Recording, ManualLoaderHandle) {
        let (backend, rec) = RecordingBackend::new();
        let (loader, handle) = ManualLoader::new();
        let g = Graphics::new(Viewport::default(), Box::new(backend), Box::new(loader));
        (g, rec, handle)
    }

    // ── state ─────────────────────────────────────────────────────────────

    #[test]
    fn defaults() {
        let (g, _, _) = graphics();
        assert_eq!(g.background_color(), Color::BLACK);
        assert_eq!(g.color(), Color::WHITE);
        assert_eq!(g.stack_depth(), 1);
        assert_eq!(g.viewport(), Viewport::new(800.0, 600.0));
    }

    #[test]
    fn begin_frame_clears_and_resets_stack() {
        let (mut g, rec, _) = graphics();
        g.set_background_color(Color::new(0.2, 0.3, 0.4, 1.0));
        g.push().unwrap();
        g.translate(5.0, 5.0);

        g.begin_frame();
        assert_eq!(g.stack_depth(), 1);
        assert_eq!(*g.transform(), Mat3::IDENTITY);
        assert_eq!(rec.clears(), vec![Color::new(0.2, 0.3, 0.4, 1.0)]);

        g.end_frame();
        assert_eq!(rec.frames(), 1);
    }

    #[test]
    fn origin_resets_top_only() {
        let (mut g, _, _) = graphics();
        g.translate(1.0, 2.0);
        g.push().unwrap();
        g.scale(3.0, 3.0);
        g.origin();
        assert_eq!(*g.transform(), Mat3::IDENTITY);
        g.pop().unwrap();
        assert_eq!(*g.transform(), Mat3::from_translation(1.0, 2.0));
    }

    #[test]
    fn stack_errors_are_recoverable() {
        let (mut g, _, _) = graphics();
        assert_eq!(g.pop(), Err(GraphicsError::StackUnderflow));
        for _ in 1..crate::transform::MAX_DEPTH {
            g.push().unwrap();
        }
        assert!(matches!(g.push(), Err(GraphicsError::StackOverflow { .. })));
        assert!(g.pop().is_ok());
    }

    // ── polygons ──────────────────────────────────────────────────────────

    #[test]
    fn polygon_uses_current_color_and_transform() {
        let (mut g, rec, _) = graphics();
        let c = Color::from_channels(&[255.0, 128.0, 0.0]).unwrap();
        g.set_color(c);
        g.translate(10.0, 20.0);
        g.polygon(DrawMode::Fill, &[0.0, 0.0, 10.0, 0.0, 10.0, 10.0]).unwrap();

        let d = &rec.draws()[0];
        assert_eq!(d.uniforms.color, c);
        assert_eq!(d.uniforms.transform, Mat3::from_translation(10.0, 20.0));
    }

    #[test]
    fn polygon_arity_and_mode_errors() {
        let (mut g, rec, _) = graphics();
        assert!(g.polygon(DrawMode::Fill, &[0.0, 0.0, 10.0, 0.0, 10.0, 10.0]).is_ok());
        assert_eq!(
            g.polygon(DrawMode::Fill, &[0.0, 0.0, 10.0, 0.0]),
            Err(GraphicsError::PolygonTooFewPoints(4))
        );
        assert_eq!(
            DrawMode::parse("stroke"),
            Err(GraphicsError::UnsupportedMode("stroke".into()))
        );
        assert_eq!(rec.draws().len(), 1);
    }

    // ── images ────────────────────────────────────────────────────────────

    #[test]
    fn pending_image_reports_zero_size_and_does_not_draw() {
        let (mut g, rec, loader) = graphics();
        let id = g.new_image("hero.png");

        assert_eq!(loader.pending_paths(), vec!["hero.png".to_string()]);
        assert_eq!(g.image_state(id), Some(ImageState::Pending));
        assert_eq!((g.image_width(id), g.image_height(id)), (0, 0));

        assert!(!g.draw_image(id, &ImageDraw::at(10.0, 10.0)));
        assert!(rec.draws().is_empty());
    }

    #[test]
    fn completed_image_draws_bound_texture_quad() {
        let (mut g, rec, loader) = graphics();
        let id = g.new_image("hero.png");
        assert!(loader.complete("hero.png", LoadOutcome::loaded(TextureId(7), 32, 32)));
        assert_eq!(g.pump_loads(), 1);

        assert_eq!((g.image_width(id), g.image_height(id)), (32, 32));
        assert!(g.draw_image(id, &ImageDraw::at(100.0, 50.0)));

        let d = &rec.draws()[0];
        assert_eq!(d.texture, TextureId(7));
        assert_eq!(d.layout, VertexLayout::PositionTexCoord);
        let corners: Vec<(f32, f32)> = d.vertices.chunks(4).map(|v| (v[0], v[1])).collect();
        assert_eq!(corners, vec![(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)]);
        assert_eq!(d.uniforms.transform, Mat3::from_translation(100.0, 50.0));
    }

    #[test]
    fn direct_completion_bypasses_channel() {
        let (mut g, rec, _) = graphics();
        let id = g.new_image("a.png");
        assert!(g.complete_load(id, LoadOutcome::loaded(TextureId(7), 32, 32)));
        assert!(g.draw_image(id, &ImageDraw::at(100.0, 50.0)));
        assert_eq!(rec.draws()[0].texture, TextureId(7));
    }

    #[test]
    fn loader_answer_after_direct_completion_keeps_the_texture() {
        let (mut g, rec, loader) = graphics();
        let id = g.new_image("a.png");
        let outcome = LoadOutcome::loaded(TextureId(7), 32, 32);
        assert!(g.complete_load(id, outcome));

        assert!(loader.complete("a.png", outcome));
        g.pump_loads();

        assert!(loader.released().is_empty());
        assert_eq!(g.image_state(id), Some(ImageState::Ready));
        assert!(g.draw_image(id, &ImageDraw::at(0.0, 0.0)));
        assert_eq!(rec.draws()[0].texture, TextureId(7));
    }

    #[test]
    fn unused_late_texture_goes_back_to_the_loader() {
        let (mut g, _, loader) = graphics();
        let id = g.new_image("a.png");
        g.complete_load(id, LoadOutcome::loaded(TextureId(7), 32, 32));

        loader.complete("a.png", LoadOutcome::loaded(TextureId(8), 32, 32));
        g.pump_loads();

        assert_eq!(loader.released(), vec![TextureId(8)]);
        assert_eq!(g.image(id).unwrap().texture, TextureId(7));
    }

    #[test]
    fn failed_image_stays_zero_sized_and_silent() {
        let (mut g, rec, loader) = graphics();
        let id = g.new_image("missing.png");
        loader.complete("missing.png", LoadOutcome::failed());
        g.pump_loads();

        assert_eq!(g.image_state(id), Some(ImageState::Failed));
        assert_eq!((g.image_width(id), g.image_height(id)), (0, 0));
        assert!(!g.draw_image(id, &ImageDraw::default()));
        assert!(rec.draws().is_empty());
    }

    #[test]
    fn releasing_ready_image_returns_texture() {
        let (mut g, _, loader) = graphics();
        let id = g.new_image("a.png");
        loader.complete("a.png", LoadOutcome::loaded(TextureId(3), 8, 8));
        g.pump_loads();

        g.releaser().release(id);
        assert_eq!(g.drain_releases(), 1);
        assert_eq!(loader.released(), vec![TextureId(3)]);
        assert_eq!(g.image_state(id), None);
        assert_eq!(g.image_count(), 0);
    }

    #[test]
    fn releasing_pending_image_needs_no_release_call() {
        let (mut g, _, loader) = graphics();
        let id = g.new_image("slow.png");
        g.release_image(id);
        assert!(loader.released().is_empty());

        // The late answer finds no requester; the loader frees its texture.
        loader.complete("slow.png", LoadOutcome::loaded(TextureId(9), 4, 4));
        assert_eq!(g.pump_loads(), 0);
        assert_eq!(loader.released(), vec![TextureId(9)]);
    }

    #[test]
    fn releases_are_drained_before_new_images() {
        let (mut g, _, _) = graphics();
        let first = g.new_image("a.png");
        g.releaser().release(first);
        let second = g.new_image("b.png");
        assert_eq!(g.image_count(), 1);
        assert_ne!(first, second);
        assert_eq!(g.image_state(first), None);
    }
}
