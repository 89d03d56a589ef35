//! GPU device, surface and texture management.
//!
//! `Gpu` owns the wgpu instance objects and the swapchain. `TextureStore` is
//! the file-backed texture loader; it shares a `TextureRegistry` with the
//! wgpu backend.

mod gpu;
mod textures;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceStatus};
pub use textures::{TextureEntry, TextureRegistry, TextureStore};
