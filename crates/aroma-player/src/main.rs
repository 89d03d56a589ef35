mod cli;

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use aroma_engine::core::FrameLoop;
use aroma_engine::device::{Gpu, GpuInit, TextureRegistry, TextureStore};
use aroma_engine::graphics::Graphics;
use aroma_engine::logging::init_logging;
use aroma_engine::math::Viewport;
use aroma_engine::render::WgpuBackend;
use aroma_engine::window::Runtime;
use aroma_lua::LuaHost;
use clap::Parser;

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.logging());

    let (config, script) = args.enter_script_dir()?;
    let viewport = config.viewport();
    log::info!("running {} ({}x{})", args.script.display(), viewport.width, viewport.height);

    Runtime::run(config, GpuInit::default(), move |gpu| boot(gpu, viewport, &script))
}

/// Wires the GPU into a graphics context, runs the main chunk and calls
/// `love.load`. A failing main chunk is fatal; a failing `love.load` is only
/// reported.
fn boot(gpu: Gpu, viewport: Viewport, script: &Path) -> Result<FrameLoop<LuaHost>> {
    let registry = TextureRegistry::new(gpu.device());
    let store = TextureStore::new(gpu.device().clone(), gpu.queue().clone(), registry.clone())?;
    let backend = WgpuBackend::new(gpu, registry);

    let graphics = Graphics::new(viewport, Box::new(backend), Box::new(store)).into_shared();
    let host = LuaHost::new(graphics.clone())?;
    host.exec_file(script)?;

    let mut frame_loop = FrameLoop::new(graphics, host);
    if let Err(err) = frame_loop.start(Instant::now()) {
        log::warn!("continuing after load failure: {err}");
    }
    Ok(frame_loop)
}
