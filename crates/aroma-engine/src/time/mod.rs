//! Time subsystem.
//!
//! Frame timing without coupling to the runtime: the caller supplies the
//! timestamps, so ticks are testable.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
