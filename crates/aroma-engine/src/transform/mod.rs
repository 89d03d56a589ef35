//! Nested coordinate frames.

mod stack;

pub use stack::{MAX_DEPTH, TransformStack};
