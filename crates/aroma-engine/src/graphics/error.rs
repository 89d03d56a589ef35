use thiserror::Error;

/// Recoverable misuse of the drawing API.
///
/// Every variant is reported synchronously to the caller; none of them leave
/// engine state half-modified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphicsError {
    #[error("stack overflow (max depth {max})")]
    StackOverflow { max: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("unsupported draw mode '{0}' (only 'fill' is supported)")]
    UnsupportedMode(String),

    #[error("need at least 3 coordinate pairs, got {0} numbers")]
    PolygonTooFewPoints(usize),

    #[error("coordinates must come in pairs, got {0} numbers")]
    PolygonOddCoordinates(usize),

    #[error("expected 3 or 4 color channels, got {0}")]
    ColorChannels(usize),
}
