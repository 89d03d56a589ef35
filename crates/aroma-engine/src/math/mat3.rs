use core::ops::Mul;

use super::Viewport;

/// 3×3 homogeneous transform, column-major.
///
/// Layout of `m`:
///
/// ```text
/// | m[0] m[3] m[6] |
/// | m[1] m[4] m[7] |
/// | m[2] m[5] m[8] |
/// ```
///
/// Every constructor and mutator keeps the bottom row at `[0, 0, 1]`, so the
/// value always describes an affine map. Nothing checks this at runtime.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    pub m: [f32; 9],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub const fn from_translation(tx: f32, ty: f32) -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, tx, ty, 1.0],
        }
    }

    #[inline]
    pub fn from_rotation(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0],
        }
    }

    #[inline]
    pub const fn from_scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Screen-to-clip projection for a canvas of the given size.
    ///
    /// Maps `(0, 0)` to the top-left clip corner `(-1, 1)` and
    /// `(width, height)` to `(1, -1)`.
    pub fn projection(viewport: Viewport) -> Self {
        let w = viewport.width.max(1.0);
        let h = viewport.height.max(1.0);
        Self {
            m: [2.0 / w, 0.0, 0.0, 0.0, -2.0 / h, 0.0, -1.0, 1.0, 1.0],
        }
    }

    /// Returns `a ∘ b`: the map that applies `b` first, then `a`.
    pub fn compose(a: &Mat3, b: &Mat3) -> Mat3 {
        let mut out = [0.0f32; 9];
        for col in 0..3 {
            for row in 0..3 {
                out[col * 3 + row] = a.m[row] * b.m[col * 3]
                    + a.m[3 + row] * b.m[col * 3 + 1]
                    + a.m[6 + row] * b.m[col * 3 + 2];
            }
        }
        Mat3 { m: out }
    }

    /// Post-multiplies a translation: the offset is applied in the local frame
    /// before whatever `self` already represented.
    #[inline]
    pub fn translate(&mut self, tx: f32, ty: f32) {
        *self = Mat3::compose(self, &Mat3::from_translation(tx, ty));
    }

    /// Post-multiplies a rotation by `angle` radians.
    ///
    /// The basis columns become `(cos, sin)` and `(-sin, cos)`. With +Y pointing
    /// down on screen, positive angles rotate clockwise.
    #[inline]
    pub fn rotate(&mut self, angle: f32) {
        *self = Mat3::compose(self, &Mat3::from_rotation(angle));
    }

    /// Post-multiplies a non-uniform scale.
    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        *self = Mat3::compose(self, &Mat3::from_scale(sx, sy));
    }

    /// Transforms a point (w = 1).
    #[inline]
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.m[0] * x + self.m[3] * y + self.m[6],
            self.m[1] * x + self.m[4] * y + self.m[7],
        )
    }

    #[inline]
    pub fn to_cols_array(&self) -> [f32; 9] {
        self.m
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Mat3, eps: f32) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat3 {
    type Output = Mat3;
    #[inline]
    fn mul(self, rhs: Mat3) -> Mat3 {
        Mat3::compose(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_point(got: (f32, f32), want: (f32, f32)) {
        assert!(
            (got.0 - want.0).abs() < 1e-4 && (got.1 - want.1).abs() < 1e-4,
            "got {got:?}, want {want:?}"
        );
    }

    // ── compose ───────────────────────────────────────────────────────────

    #[test]
    fn identity_is_neutral() {
        let t = Mat3::from_translation(3.0, 4.0);
        assert_eq!(Mat3::compose(&Mat3::IDENTITY, &t), t);
        assert_eq!(Mat3::compose(&t, &Mat3::IDENTITY), t);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        // scale, then translate: (1, 1) -> (2, 2) -> (12, 2)
        let m = Mat3::from_translation(10.0, 0.0) * Mat3::from_scale(2.0, 2.0);
        assert_point(m.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    // ── in-place mutators ─────────────────────────────────────────────────

    #[test]
    fn translate_rotate0_scale1_is_pure_translation() {
        let mut m = Mat3::identity();
        m.translate(7.5, -3.0);
        m.rotate(0.0);
        m.scale(1.0, 1.0);
        let want = Mat3 { m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 7.5, -3.0, 1.0] };
        assert!(m.approx_eq(&want, EPS), "{m:?}");
    }

    #[test]
    fn chained_calls_apply_in_local_frame() {
        // translate then scale: the scale happens inside the translated frame.
        let mut m = Mat3::identity();
        m.translate(100.0, 50.0);
        m.scale(2.0, 2.0);
        assert_point(m.transform_point(10.0, 10.0), (120.0, 70.0));
    }

    #[test]
    fn positive_rotation_maps_x_axis_onto_y_axis() {
        let mut m = Mat3::identity();
        m.rotate(std::f32::consts::FRAC_PI_2);
        // +X goes to +Y, which is "down" on screen: clockwise.
        assert_point(m.transform_point(1.0, 0.0), (0.0, 1.0));
    }

    #[test]
    fn bottom_row_stays_affine() {
        let mut m = Mat3::identity();
        m.translate(3.0, 4.0);
        m.rotate(0.7);
        m.scale(-2.0, 0.5);
        assert_eq!([m.m[2], m.m[5], m.m[8]], [0.0, 0.0, 1.0]);
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn projection_maps_canvas_corners_to_clip_space() {
        let p = Mat3::projection(Viewport::new(800.0, 600.0));
        assert_point(p.transform_point(0.0, 0.0), (-1.0, 1.0));
        assert_point(p.transform_point(800.0, 600.0), (1.0, -1.0));
        assert_point(p.transform_point(400.0, 300.0), (0.0, 0.0));
    }
}
