use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl};
use crate::device::{Gpu, GpuInit};
use crate::math::Viewport;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub size: LogicalSize<f64>,
    /// The draw surface has a fixed size; resizing only makes sense for
    /// hosts that handle it themselves.
    pub resizable: bool,
}

impl RuntimeConfig {
    /// Logical drawing area matching the window size.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.size.width as f32, self.size.height as f32)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "aroma".to_string(),
            size: LogicalSize::new(800.0, 600.0),
            resizable: false,
        }
    }
}

/// Entry point for the runtime.
///
/// Opens one window, creates the GPU context once the platform allows it,
/// builds the app from it and then drives [`App::on_frame`] on every redraw.
pub struct Runtime;

impl Runtime {
    /// Runs until the window closes or the app exits.
    ///
    /// `factory` runs once, after the GPU context exists. A GPU or factory
    /// failure stops the loop and is returned.
    pub fn run<A, F>(config: RuntimeConfig, gpu_init: GpuInit, factory: F) -> Result<()>
    where
        A: App + 'static,
        F: FnOnce(Gpu) -> Result<A> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            gpu_init,
            factory: Some(factory),
            app: None,
            window: None,
            error: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct AppState<A, F> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    factory: Option<F>,
    app: Option<A>,
    window: Option<Arc<Window>>,
    error: Option<anyhow::Error>,
}

impl<A, F> AppState<A, F>
where
    A: App + 'static,
    F: FnOnce(Gpu) -> Result<A>,
{
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.size)
            .with_resizable(self.config.resizable);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let gpu = pollster::block_on(Gpu::new(window.clone(), self.gpu_init.clone()))
            .context("GPU initialization failed")?;

        let factory = self.factory.take().context("app factory already used")?;
        let app = factory(gpu)?;

        window.request_redraw();
        self.window = Some(window);
        self.app = Some(app);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl<A, F> ApplicationHandler for AppState<A, F>
where
    A: App + 'static,
    F: FnOnce(Gpu) -> Result<A>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the frame loop ticks once per redraw.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(app) = self.app.as_mut() else { return };

        let control = match event {
            WindowEvent::CloseRequested => app.on_close_requested(),
            WindowEvent::RedrawRequested => app.on_frame(Instant::now()),
            _ => AppControl::Continue,
        };

        if control == AppControl::Exit {
            log::info!("exiting");
            // Drop the app before the window so GPU resources go first.
            self.app = None;
            self.window = None;
            event_loop.exit();
        }
    }
}
