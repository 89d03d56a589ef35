use crate::graphics::GraphicsError;

/// Straight-alpha RGBA color, channels in `[0, 1]`.
///
/// Values are passed to the shader as-is; no sRGB conversion happens anywhere
/// in the pipeline.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses 3 or 4 numeric channels with range auto-detection.
    ///
    /// If any channel (alpha included) exceeds `1.0`, the whole tuple is read
    /// as `0`–`255` and every channel is divided by 255. The decision is made
    /// once for the tuple, never per channel. A missing alpha is opaque in
    /// either range.
    pub fn from_channels(channels: &[f64]) -> Result<Self, GraphicsError> {
        let (r, g, b, a) = match *channels {
            [r, g, b] => (r, g, b, None),
            [r, g, b, a] => (r, g, b, Some(a)),
            _ => return Err(GraphicsError::ColorChannels(channels.len())),
        };

        let bytes = r > 1.0 || g > 1.0 || b > 1.0 || a.is_some_and(|a| a > 1.0);
        let scale = if bytes { 255.0 } else { 1.0 };
        let a = a.unwrap_or(scale);

        Ok(Self::new(
            (r / scale) as f32,
            (g / scale) as f32,
            (b / scale) as f32,
            (a / scale) as f32,
        ))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(self, other: Color, eps: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}
