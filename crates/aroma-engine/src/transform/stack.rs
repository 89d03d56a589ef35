use crate::graphics::GraphicsError;
use crate::math::Mat3;

/// Maximum number of frames, base frame included.
pub const MAX_DEPTH: usize = 32;

/// Bounded stack of transforms.
///
/// Invariants:
/// - depth is always `>= 1`; slot 0 is the frame root and cannot be popped
/// - a failed `push`/`pop` leaves every slot and the depth untouched
///
/// All coordinate mutations (`translate`, `rotate`, `scale`) apply to the top
/// frame in place.
#[derive(Debug, Clone)]
pub struct TransformStack {
    slots: [Mat3; MAX_DEPTH],
    top: usize,
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            slots: [Mat3::IDENTITY; MAX_DEPTH],
            top: 0,
        }
    }

    /// Number of live frames (`1..=MAX_DEPTH`).
    #[inline]
    pub fn depth(&self) -> usize {
        self.top + 1
    }

    #[inline]
    pub fn current(&self) -> &Mat3 {
        &self.slots[self.top]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut Mat3 {
        &mut self.slots[self.top]
    }

    /// Duplicates the top frame.
    pub fn push(&mut self) -> Result<(), GraphicsError> {
        if self.top + 1 >= MAX_DEPTH {
            return Err(GraphicsError::StackOverflow { max: MAX_DEPTH });
        }
        self.slots[self.top + 1] = self.slots[self.top];
        self.top += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<(), GraphicsError> {
        if self.top == 0 {
            return Err(GraphicsError::StackUnderflow);
        }
        self.top -= 1;
        Ok(())
    }

    /// Drops every frame but the root and sets the root to identity.
    ///
    /// Called once per frame before the draw callback runs.
    pub fn reset(&mut self) {
        self.top = 0;
        self.slots[0] = Mat3::IDENTITY;
    }

    #[inline]
    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.current_mut().translate(tx, ty);
    }

    #[inline]
    pub fn rotate(&mut self, angle: f32) {
        self.current_mut().rotate(angle);
    }

    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.current_mut().scale(sx, sy);
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}
